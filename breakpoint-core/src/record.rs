// Breakpoint records
//
// Plain-data snapshot of one breakpoint, enough to recreate it in a later
// session. Conditions and monitors are kept as their text.

use crate::breakpoint::Breakpoint;
use crate::spec::BreakpointSpec;
use crate::types::SuspendPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointRecord {
    pub spec: BreakpointSpec,
    pub enabled: bool,
    #[serde(default)]
    pub skip_count: u32,
    #[serde(default)]
    pub expire_count: u32,
    #[serde(default)]
    pub delete_on_expire: bool,
    #[serde(default)]
    pub suspend_policy: SuspendPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_filters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_filters: Option<String>,
    pub group_path: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub monitors: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl BreakpointRecord {
    pub fn capture(bp: &Breakpoint, group_path: String) -> Self {
        Self {
            spec: bp.spec().clone(),
            enabled: bp.is_enabled(),
            skip_count: bp.skip_count(),
            expire_count: bp.expire_count(),
            delete_on_expire: bp.deletes_on_expire(),
            suspend_policy: bp.suspend_policy(),
            class_filters: bp.class_filters().map(|f| f.to_string()),
            thread_filters: bp.thread_filters().map(|f| f.to_string()),
            group_path,
            conditions: bp.conditions().iter().map(|c| c.describe()).collect(),
            monitors: bp.monitors().iter().map(|m| m.describe()).collect(),
            properties: bp.properties().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    #[test]
    fn test_capture_and_json_layout() {
        let spec = parse("com.example.Foo.bar(int)", None).unwrap();
        let mut bp = Breakpoint::new(4, spec, 0, false, SuspendPolicy::All);
        bp.set_skip_count(2);
        bp.set_thread_filters(Some("main")).unwrap();
        bp.set_property("origin", json!("ui"));

        let record = BreakpointRecord::capture(&bp, "Default/net".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["spec"]["kind"], "method");
        assert_eq!(value["spec"]["method_name"], "bar");
        assert_eq!(value["enabled"], false);
        assert_eq!(value["skip_count"], 2);
        assert_eq!(value["thread_filters"], "main");
        assert_eq!(value["group_path"], "Default/net");
        assert_eq!(value["properties"]["origin"], "ui");
        assert!(value.get("class_filters").is_none());

        let back: BreakpointRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_minimal_record_uses_defaults() {
        let record: BreakpointRecord = serde_json::from_value(json!({
            "spec": {"kind": "uncaught_exception"},
            "enabled": true,
            "group_path": "Default"
        }))
        .unwrap();
        assert_eq!(record.suspend_policy, SuspendPolicy::All);
        assert_eq!(record.expire_count, 0);
        assert!(record.conditions.is_empty());
    }
}
