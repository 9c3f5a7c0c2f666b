// Target event vocabulary
//
// Events are delivered one at a time from the target: structural changes that
// may let pending breakpoints resolve, and candidate hits routed by the
// request id the target was handed at registration.

use crate::types::{ClassHandle, Location, RequestId, ThreadId};
use serde::{Deserialize, Serialize};

/// Snapshot of the stopped target handed to conditions and monitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetState {
    pub thread: Option<ThreadId>,
    pub thread_name: Option<String>,
    pub location: Option<Location>,
    pub class_name: Option<String>,
}

impl TargetState {
    pub fn at(thread: ThreadId, location: Location) -> Self {
        Self {
            thread: Some(thread),
            location: Some(location),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TargetEvent {
    VmStart,
    VmDeath,
    ThreadStart {
        thread: ThreadId,
        name: String,
    },
    ThreadDeath {
        thread: ThreadId,
        name: String,
    },
    ClassPrepare {
        class: ClassHandle,
    },
    ClassUnload {
        class_name: String,
    },
    Hit {
        request_id: RequestId,
        state: TargetState,
    },
}

impl TargetEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TargetEvent::VmStart => "VMStart",
            TargetEvent::VmDeath => "VMDeath",
            TargetEvent::ThreadStart { .. } => "ThreadStart",
            TargetEvent::ThreadDeath { .. } => "ThreadDeath",
            TargetEvent::ClassPrepare { .. } => "ClassPrepare",
            TargetEvent::ClassUnload { .. } => "ClassUnload",
            TargetEvent::Hit { .. } => "Hit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = TargetEvent::ClassUnload {
            class_name: "a.B".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ClassUnload");
        assert_eq!(json["class_name"], "a.B");
        assert_eq!(event.name(), "ClassUnload");
    }

    #[test]
    fn test_hit_tagging() {
        let event = TargetEvent::Hit {
            request_id: 3,
            state: TargetState::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Hit");
        assert_eq!(json["request_id"], 3);
        assert_eq!(event.name(), "Hit");
    }
}
