// Manager configuration

use crate::error::{BreakpointError, BreakpointResult};
use crate::types::SuspendPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Enabled flag given to new breakpoints.
    pub default_enabled: bool,
    pub default_suspend_policy: SuspendPolicy,
    /// Try to resolve a breakpoint as soon as it is created.
    pub resolve_on_create: bool,
    /// Capacity of the dispatcher's outgoing hit-report channel.
    pub report_buffer: usize,
    /// Capacity of the dispatcher's incoming event channel.
    pub event_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_enabled: true,
            default_suspend_policy: SuspendPolicy::All,
            resolve_on_create: true,
            report_buffer: 256,
            event_buffer: 32,
        }
    }
}

impl ManagerConfig {
    pub fn from_json(text: &str) -> BreakpointResult<Self> {
        let config: ManagerConfig =
            serde_json::from_str(text).map_err(|e| BreakpointError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BreakpointResult<()> {
        if self.report_buffer == 0 {
            return Err(BreakpointError::InvalidConfig("report_buffer must be positive".to_string()));
        }
        if self.event_buffer == 0 {
            return Err(BreakpointError::InvalidConfig("event_buffer must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ManagerConfig::from_json(r#"{"default_suspend_policy": "event_thread"}"#).unwrap();
        assert_eq!(config.default_suspend_policy, SuspendPolicy::EventThread);
        assert!(config.default_enabled);
        assert_eq!(config.report_buffer, 256);
    }

    #[test]
    fn test_zero_buffers_rejected() {
        assert!(matches!(
            ManagerConfig::from_json(r#"{"event_buffer": 0}"#),
            Err(BreakpointError::InvalidConfig(_))
        ));
        assert!(ManagerConfig::from_json("not json").is_err());
    }
}
