// Breakpoint entity
//
// One breakpoint: identity, configuration, counters and resolution state.
// The manager wraps each entity in its own lock; methods here assume the
// caller holds it.

use crate::condition::{Condition, Monitor};
use crate::error::{BreakpointError, BreakpointResult};
use crate::filters::FilterList;
use crate::resolver::ResolvedTarget;
use crate::spec::{BreakpointKind, BreakpointSpec};
use crate::types::{BreakpointId, GroupId, RequestId, SuspendPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointState {
    Unresolved,
    ResolvedEnabled,
    ResolvedDisabled,
    Expired,
    Destroyed,
}

impl fmt::Display for BreakpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BreakpointState::Unresolved => "unresolved",
            BreakpointState::ResolvedEnabled => "enabled",
            BreakpointState::ResolvedDisabled => "disabled",
            BreakpointState::Expired => "expired",
            BreakpointState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// The event request armed for a resolved breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub request_id: RequestId,
    pub target: ResolvedTarget,
    /// Filters or suspend policy changed since the request was created.
    pub stale: bool,
}

#[derive(Debug)]
pub struct Breakpoint {
    id: BreakpointId,
    spec: BreakpointSpec,
    group: GroupId,
    enabled: bool,
    binding: Option<Binding>,
    skip_count: u32,
    stop_count: u32,
    expire_count: u32,
    expired: bool,
    delete_on_expire: bool,
    destroyed: bool,
    suspend_policy: SuspendPolicy,
    class_filters: Option<FilterList>,
    thread_filters: Option<FilterList>,
    conditions: Vec<Arc<dyn Condition>>,
    monitors: Vec<Arc<dyn Monitor>>,
    properties: HashMap<String, serde_json::Value>,
}

impl Breakpoint {
    pub fn new(
        id: BreakpointId,
        spec: BreakpointSpec,
        group: GroupId,
        enabled: bool,
        suspend_policy: SuspendPolicy,
    ) -> Self {
        Self {
            id,
            spec,
            group,
            enabled,
            binding: None,
            skip_count: 0,
            stop_count: 0,
            expire_count: 0,
            expired: false,
            delete_on_expire: false,
            destroyed: false,
            suspend_policy,
            class_filters: None,
            thread_filters: None,
            conditions: Vec::new(),
            monitors: Vec::new(),
            properties: HashMap::new(),
        }
    }

    pub fn id(&self) -> BreakpointId {
        self.id
    }

    pub fn spec(&self) -> &BreakpointSpec {
        &self.spec
    }

    pub fn kind(&self) -> BreakpointKind {
        self.spec.kind()
    }

    /// Owning group; always set.
    pub fn group(&self) -> GroupId {
        self.group
    }

    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.group = group;
    }

    pub fn state(&self) -> BreakpointState {
        if self.destroyed {
            BreakpointState::Destroyed
        } else if self.expired {
            BreakpointState::Expired
        } else if self.binding.is_none() {
            BreakpointState::Unresolved
        } else if self.enabled {
            BreakpointState::ResolvedEnabled
        } else {
            BreakpointState::ResolvedDisabled
        }
    }

    /// The breakpoint's own flag; see the manager for group-aware enablement.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.is_some()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub(crate) fn bind(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    pub(crate) fn unbind(&mut self) -> Option<Binding> {
        self.binding.take()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Mark destroyed and hand back the registration to release.
    pub(crate) fn mark_destroyed(&mut self) -> Option<Binding> {
        self.destroyed = true;
        self.binding.take()
    }

    pub fn skip_count(&self) -> u32 {
        self.skip_count
    }

    pub fn set_skip_count(&mut self, skip_count: u32) {
        self.skip_count = skip_count;
    }

    pub fn expire_count(&self) -> u32 {
        self.expire_count
    }

    /// Zero means never expire.
    pub fn set_expire_count(&mut self, expire_count: u32) {
        self.expire_count = expire_count;
    }

    /// Hits seen since the last reset.
    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }

    pub(crate) fn record_hit(&mut self) -> u32 {
        self.stop_count = self.stop_count.saturating_add(1);
        self.stop_count
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }

    pub(crate) fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub fn deletes_on_expire(&self) -> bool {
        self.delete_on_expire
    }

    pub fn set_delete_on_expire(&mut self, delete: bool) {
        self.delete_on_expire = delete;
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_count > 0 && self.stop_count < self.skip_count
    }

    pub fn suspend_policy(&self) -> SuspendPolicy {
        self.suspend_policy
    }

    pub fn set_suspend_policy(&mut self, policy: SuspendPolicy) -> BreakpointResult<()> {
        self.ensure_disabled()?;
        self.suspend_policy = policy;
        self.mark_stale();
        Ok(())
    }

    pub fn class_filters(&self) -> Option<&FilterList> {
        self.class_filters.as_ref()
    }

    /// Replace the class filters; `None` or a blank string clears them.
    pub fn set_class_filters(&mut self, filters: Option<&str>) -> BreakpointResult<()> {
        self.ensure_disabled()?;
        self.class_filters = parse_filters(filters)?;
        self.mark_stale();
        Ok(())
    }

    pub fn thread_filters(&self) -> Option<&FilterList> {
        self.thread_filters.as_ref()
    }

    pub fn set_thread_filters(&mut self, filters: Option<&str>) -> BreakpointResult<()> {
        self.ensure_disabled()?;
        self.thread_filters = parse_filters(filters)?;
        self.mark_stale();
        Ok(())
    }

    fn ensure_disabled(&self) -> BreakpointResult<()> {
        if self.enabled {
            Err(BreakpointError::MustBeDisabled(self.id))
        } else {
            Ok(())
        }
    }

    fn mark_stale(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            binding.stale = true;
        }
    }

    pub fn add_condition(&mut self, condition: Arc<dyn Condition>) {
        self.conditions.push(condition);
    }

    pub fn remove_condition_at(&mut self, index: usize) -> Option<Arc<dyn Condition>> {
        if index < self.conditions.len() {
            Some(self.conditions.remove(index))
        } else {
            None
        }
    }

    pub fn conditions(&self) -> &[Arc<dyn Condition>] {
        &self.conditions
    }

    pub fn add_monitor(&mut self, monitor: Arc<dyn Monitor>) {
        self.monitors.push(monitor);
    }

    /// Remove the first monitor whose description equals `text`.
    pub fn remove_monitor_by_description(&mut self, text: &str) -> bool {
        match self.monitors.iter().position(|m| m.describe() == text) {
            Some(idx) => {
                self.monitors.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn monitors(&self) -> &[Arc<dyn Monitor>] {
        &self.monitors
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<serde_json::Value> {
        self.properties.remove(key)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Clear hit counters and expiry for a new session. Enablement is untouched.
    pub fn reset(&mut self) {
        self.stop_count = 0;
        self.expired = false;
    }

    pub fn describe(&self, terse: bool) -> String {
        if terse {
            return self.spec.to_string();
        }

        let mut out = format!("#{} {} [{}]", self.id, self.spec, self.state());
        if self.skip_count > 0 {
            out.push_str(&format!(" skip={}", self.skip_count));
        }
        if self.expire_count > 0 {
            out.push_str(&format!(" expire={}", self.expire_count));
        }
        if self.stop_count > 0 {
            out.push_str(&format!(" hits={}", self.stop_count));
        }
        if let Some(filters) = &self.class_filters {
            out.push_str(&format!(" classes={}", filters));
        }
        if let Some(filters) = &self.thread_filters {
            out.push_str(&format!(" threads={}", filters));
        }
        out
    }
}

fn parse_filters(filters: Option<&str>) -> BreakpointResult<Option<FilterList>> {
    match filters.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => FilterList::parse(text).map(Some),
    }
}
