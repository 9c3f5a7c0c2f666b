// Breakpoint subsystem type definitions
//
// Identifiers and handles shared between the breakpoint core and the target
// introspection layer

use serde::{Deserialize, Serialize};
use std::fmt;

// Breakpoints and groups are addressed by stable ids in their arenas
pub type BreakpointId = u32;
pub type GroupId = u32;

// Registration handle returned by the target for an armed event request
pub type RequestId = i32;

// Object IDs are 8 bytes on the target side
pub type ObjectId = u64;
pub type ThreadId = ObjectId;
pub type ThreadGroupId = ObjectId;

pub type ReferenceTypeId = u64;
pub type MethodId = u64;
pub type FieldId = u64;

// Location identifies a code position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub type_tag: u8, // 1=class, 2=interface, 3=array
    pub class_id: ReferenceTypeId,
    pub method_id: MethodId,
    pub index: u64, // bytecode index (PC)
}

/// A loaded class in the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassHandle {
    pub type_id: ReferenceTypeId,
    /// Fully-qualified, dotted class name.
    pub name: String,
}

/// Method information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub method_id: MethodId,
    pub name: String,
    /// Parameter type names, fully qualified ("int", "java.lang.String").
    pub parameter_types: Vec<String>,
    /// Location of the first executable instruction.
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldHandle {
    pub field_id: FieldId,
    pub name: String,
}

/// Where the user currently is, used to fill in shorthand specs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentLocation {
    /// Source path relative to a source root, e.g. "com/example/Foo.java".
    pub source_path: String,
    pub line: u32,
    pub class_name: String,
}

/// Suspend policy for events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SuspendPolicy {
    None = 0,
    EventThread = 1,
    #[default]
    All = 2,
}

impl fmt::Display for SuspendPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuspendPolicy::None => "none",
            SuspendPolicy::EventThread => "thread",
            SuspendPolicy::All => "all",
        };
        f.write_str(name)
    }
}
