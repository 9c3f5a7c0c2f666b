// Target introspection interface
//
// What the breakpoint core needs from the debuggee connection. Lookups are
// synchronous and answer from the target's current state; "not loaded yet" is
// an empty answer, not an error.

use crate::error::TargetError;
use crate::filters::FilterList;
use crate::resolver::ResolvedTarget;
use crate::spec::BreakpointKind;
use crate::threads::ThreadGroupNode;
use crate::types::{ClassHandle, CurrentLocation, FieldHandle, Location, MethodInfo, RequestId, SuspendPolicy};

/// Everything the target needs to arm an event request for one breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequestSpec {
    pub kind: BreakpointKind,
    pub target: ResolvedTarget,
    pub suspend_policy: SuspendPolicy,
    pub class_filters: Option<FilterList>,
    pub thread_filters: Option<FilterList>,
    pub enabled: bool,
}

pub trait Target: Send + Sync {
    /// Location of the current thread's top frame, if the target is stopped.
    fn current_location(&self) -> Option<CurrentLocation>;

    /// Find a loaded class by its dotted name.
    fn resolve_class(&self, name: &str) -> Option<ClassHandle>;

    /// Loaded classes compiled from a file named `source_name` ("Foo.java"),
    /// each paired with its source path relative to the source root
    /// ("com/example/Foo.java").
    fn classes_by_source_name(&self, source_name: &str) -> Vec<(ClassHandle, String)>;

    /// First code location for `line` within the class, if it has code there.
    fn resolve_location(&self, class: &ClassHandle, line: u32) -> Option<Location>;

    fn methods(&self, class: &ClassHandle) -> Vec<MethodInfo>;

    fn field(&self, class: &ClassHandle, name: &str) -> Option<FieldHandle>;

    /// Arm an event request and return its id.
    fn create_request(&self, request: &EventRequestSpec) -> Result<RequestId, TargetError>;

    fn set_request_enabled(&self, request_id: RequestId, enabled: bool) -> Result<(), TargetError>;

    fn clear_request(&self, request_id: RequestId) -> Result<(), TargetError>;

    /// Top-level thread groups, for listings.
    fn thread_groups(&self) -> Vec<ThreadGroupNode>;
}
