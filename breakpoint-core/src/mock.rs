// In-memory target
//
// Deterministic stand-in for a debuggee: classes are "loaded" by hand, event
// requests are recorded, and hits are produced for armed requests at a given
// location.

use crate::error::TargetError;
use crate::events::{TargetEvent, TargetState};
use crate::resolver::ResolvedTarget;
use crate::target::{EventRequestSpec, Target};
use crate::threads::ThreadGroupNode;
use crate::types::{
    ClassHandle, CurrentLocation, FieldHandle, Location, MethodId, MethodInfo, ReferenceTypeId, RequestId,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct MockClass {
    handle: ClassHandle,
    source_path: String,
    lines: BTreeMap<u32, u64>,
    methods: Vec<MethodInfo>,
    fields: Vec<FieldHandle>,
}

#[derive(Debug, Clone)]
pub struct MockRequest {
    pub spec: EventRequestSpec,
    pub enabled: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_type_id: ReferenceTypeId,
    next_member_id: MethodId,
    next_request_id: RequestId,
    classes: Vec<MockClass>,
    requests: BTreeMap<RequestId, MockRequest>,
    created: usize,
    cleared: Vec<RequestId>,
    current: Option<CurrentLocation>,
    thread_groups: Vec<ThreadGroupNode>,
    disconnected: bool,
}

/// Deterministic, in-memory target test double.
#[derive(Debug, Default)]
pub struct MockTarget {
    state: Mutex<MockState>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a class compiled from `source_path` ("com/example/Foo.java").
    pub fn load_class(&self, name: &str, source_path: &str) -> ClassHandle {
        let mut state = self.state.lock();
        state.next_type_id += 1;
        let handle = ClassHandle {
            type_id: 0x100 + state.next_type_id,
            name: name.to_string(),
        };
        state.classes.push(MockClass {
            handle: handle.clone(),
            source_path: source_path.to_string(),
            lines: BTreeMap::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        });
        handle
    }

    pub fn unload_class(&self, name: &str) -> Option<ClassHandle> {
        let mut state = self.state.lock();
        let idx = state.classes.iter().position(|c| c.handle.name == name)?;
        Some(state.classes.remove(idx).handle)
    }

    /// Give `line` code starting at bytecode `index`.
    pub fn add_line(&self, class: &ClassHandle, line: u32, index: u64) {
        let mut state = self.state.lock();
        if let Some(c) = state.classes.iter_mut().find(|c| c.handle == *class) {
            c.lines.insert(line, index);
        }
    }

    pub fn add_method(&self, class: &ClassHandle, name: &str, parameter_types: &[&str]) -> MethodInfo {
        let mut state = self.state.lock();
        state.next_member_id += 1;
        let method_id = 0x1000 + state.next_member_id;
        let method = MethodInfo {
            method_id,
            name: name.to_string(),
            parameter_types: parameter_types.iter().map(|t| t.to_string()).collect(),
            location: Location {
                type_tag: 1,
                class_id: class.type_id,
                method_id,
                index: 0,
            },
        };
        if let Some(c) = state.classes.iter_mut().find(|c| c.handle == *class) {
            c.methods.push(method.clone());
        }
        method
    }

    pub fn add_field(&self, class: &ClassHandle, name: &str) -> FieldHandle {
        let mut state = self.state.lock();
        state.next_member_id += 1;
        let field = FieldHandle {
            field_id: 0x1000 + state.next_member_id,
            name: name.to_string(),
        };
        if let Some(c) = state.classes.iter_mut().find(|c| c.handle == *class) {
            c.fields.push(field.clone());
        }
        field
    }

    pub fn set_current_location(&self, location: Option<CurrentLocation>) {
        self.state.lock().current = location;
    }

    pub fn set_thread_groups(&self, groups: Vec<ThreadGroupNode>) {
        self.state.lock().thread_groups = groups;
    }

    /// Make every request operation fail as if the VM went away.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// Number of requests ever created.
    pub fn requests_created(&self) -> usize {
        self.state.lock().created
    }

    pub fn active_requests(&self) -> Vec<RequestId> {
        self.state.lock().requests.keys().copied().collect()
    }

    pub fn request(&self, request_id: RequestId) -> Option<MockRequest> {
        self.state.lock().requests.get(&request_id).cloned()
    }

    pub fn cleared_requests(&self) -> Vec<RequestId> {
        self.state.lock().cleared.clone()
    }

    /// Hit events for every enabled request bound to `location`, the way
    /// the VM would report a thread reaching it.
    pub fn hits_at(&self, location: &Location, state: &TargetState) -> Vec<TargetEvent> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(_, r)| r.enabled)
            .filter(|(_, r)| match &r.spec.target {
                ResolvedTarget::Location { location: at, .. } => at == location,
                ResolvedTarget::Method { method, .. } => method.location == *location,
                _ => false,
            })
            .map(|(&request_id, _)| TargetEvent::Hit {
                request_id,
                state: TargetState {
                    location: Some(location.clone()),
                    ..state.clone()
                },
            })
            .collect()
    }

    fn find_class<T>(&self, class: &ClassHandle, f: impl FnOnce(&MockClass) -> T) -> Option<T> {
        let state = self.state.lock();
        state.classes.iter().find(|c| c.handle == *class).map(f)
    }
}

impl Target for MockTarget {
    fn current_location(&self) -> Option<CurrentLocation> {
        self.state.lock().current.clone()
    }

    fn resolve_class(&self, name: &str) -> Option<ClassHandle> {
        let state = self.state.lock();
        state
            .classes
            .iter()
            .find(|c| c.handle.name == name)
            .map(|c| c.handle.clone())
    }

    fn classes_by_source_name(&self, source_name: &str) -> Vec<(ClassHandle, String)> {
        let state = self.state.lock();
        state
            .classes
            .iter()
            .filter(|c| c.source_path.rsplit('/').next() == Some(source_name))
            .map(|c| (c.handle.clone(), c.source_path.clone()))
            .collect()
    }

    fn resolve_location(&self, class: &ClassHandle, line: u32) -> Option<Location> {
        self.find_class(class, |c| {
            c.lines.get(&line).map(|&index| Location {
                type_tag: 1,
                class_id: c.handle.type_id,
                method_id: c.methods.first().map(|m| m.method_id).unwrap_or(0),
                index,
            })
        })
        .flatten()
    }

    fn methods(&self, class: &ClassHandle) -> Vec<MethodInfo> {
        self.find_class(class, |c| c.methods.clone()).unwrap_or_default()
    }

    fn field(&self, class: &ClassHandle, name: &str) -> Option<FieldHandle> {
        self.find_class(class, |c| c.fields.iter().find(|f| f.name == name).cloned())
            .flatten()
    }

    fn create_request(&self, request: &EventRequestSpec) -> Result<RequestId, TargetError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TargetError::VmDisconnected);
        }
        state.next_request_id += 1;
        state.created += 1;
        let request_id = state.next_request_id;
        state.requests.insert(
            request_id,
            MockRequest {
                spec: request.clone(),
                enabled: request.enabled,
            },
        );
        Ok(request_id)
    }

    fn set_request_enabled(&self, request_id: RequestId, enabled: bool) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TargetError::VmDisconnected);
        }
        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(TargetError::InvalidRequest(request_id))?;
        request.enabled = enabled;
        Ok(())
    }

    fn clear_request(&self, request_id: RequestId) -> Result<(), TargetError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TargetError::VmDisconnected);
        }
        state
            .requests
            .remove(&request_id)
            .ok_or(TargetError::InvalidRequest(request_id))?;
        state.cleared.push(request_id);
        Ok(())
    }

    fn thread_groups(&self) -> Vec<ThreadGroupNode> {
        self.state.lock().thread_groups.clone()
    }
}
