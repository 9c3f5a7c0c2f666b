// Breakpoint subsystem for an interactive Java debugger
//
// Turns breakpoint specs typed by a user into breakpoint entities and keeps
// them in step with a running target:
// - Spec parsing (line, method and shorthand forms)
// - Breakpoint lifecycle and groups
// - Resolution against loaded classes, retried on class load
// - Hit evaluation with skip/expire counts, conditions and monitors
// - Event dispatch from the target

pub mod types;
pub mod error;
pub mod spec;
pub mod parser;
pub mod filters;
pub mod condition;
pub mod breakpoint;
pub mod group;
pub mod factory;
pub mod resolver;
pub mod hit;
pub mod manager;
pub mod events;
pub mod dispatcher;
pub mod target;
pub mod mock;
pub mod record;
pub mod threads;
pub mod config;

pub use breakpoint::{Breakpoint, BreakpointState};
pub use config::ManagerConfig;
pub use dispatcher::{spawn_dispatcher, DispatchOutcome, DispatcherHandle};
pub use error::{BreakpointError, BreakpointResult, TargetError};
pub use factory::BreakpointFactory;
pub use hit::{HitReport, StopDecision};
pub use manager::BreakpointManager;
pub use parser::parse;
pub use spec::{BreakpointKind, BreakpointSpec};
pub use target::Target;
pub use types::SuspendPolicy;
