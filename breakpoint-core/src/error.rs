// Breakpoint error taxonomy
//
// Every failure is scoped to one spec or one breakpoint; none of them leave
// the subsystem itself in a bad state.

use crate::types::{BreakpointId, GroupId, RequestId};
use thiserror::Error;

pub type BreakpointResult<T> = Result<T, BreakpointError>;

#[derive(Debug, Error)]
pub enum BreakpointError {
    #[error("Malformed breakpoint spec: {0}")]
    Parse(String),

    #[error("Invalid line number: {0}")]
    InvalidLineNumber(String),

    #[error("No current location; specify a class or file explicitly")]
    AmbiguousLocation,

    #[error("{class}.{method} matches {candidates} overloads; specify parameter types")]
    AmbiguousOverload {
        class: String,
        method: String,
        candidates: usize,
    },

    #[error("Malformed class name: {0}")]
    MalformedClassName(String),

    #[error("Malformed member name: {0}")]
    MalformedMemberName(String),

    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    #[error("No such breakpoint: {0}")]
    UnknownBreakpoint(BreakpointId),

    #[error("No such breakpoint group: {0}")]
    UnknownGroup(GroupId),

    #[error("Breakpoint {0} must be disabled before changing its filters or suspend policy")]
    MustBeDisabled(BreakpointId),

    #[error("Moving group {0} there would create a cycle")]
    GroupCycle(GroupId),

    #[error("The default group cannot be removed or moved")]
    RootGroup,

    #[error("No constructor registered for breakpoint kind {0}")]
    UnsupportedKind(String),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Event dispatcher has shut down")]
    DispatcherClosed,
}

/// Failures reported by the target introspection collaborator.
#[derive(Debug, Clone, Error)]
pub enum TargetError {
    #[error("Target VM disconnected")]
    VmDisconnected,

    #[error("Invalid event request {0}")]
    InvalidRequest(RequestId),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Error)]
#[error("Condition '{expression}' failed to evaluate: {reason}")]
pub struct ConditionError {
    pub expression: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error)]
#[error("Monitor '{monitor}' failed: {reason}")]
pub struct MonitorError {
    pub monitor: String,
    pub reason: String,
}
