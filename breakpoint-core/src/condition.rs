// Conditions and monitors
//
// Both are capabilities supplied from outside the core. A condition gates the
// stop decision; a monitor runs after the decision to stop has been made.

use crate::error::{ConditionError, MonitorError};
use crate::events::TargetState;
use std::fmt;
use std::sync::Arc;

pub trait Condition: Send + Sync + fmt::Debug {
    fn is_satisfied(&self, state: &TargetState) -> Result<bool, ConditionError>;

    /// Expression text, used for listings and records.
    fn describe(&self) -> String;
}

pub trait Monitor: Send + Sync + fmt::Debug {
    fn perform(&self, state: &TargetState) -> Result<(), MonitorError>;

    /// Action text, used for listings, removal by text, and records.
    fn describe(&self) -> String;
}

/// Evaluates boolean expressions against the stopped target.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, state: &TargetState) -> Result<bool, String>;
}

/// Runs debugger commands on behalf of command monitors.
pub trait CommandSink: Send + Sync {
    fn execute(&self, command: &str, state: &TargetState) -> Result<(), String>;
}

pub struct ExpressionCondition {
    expression: String,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl ExpressionCondition {
    pub fn new(expression: impl Into<String>, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            expression: expression.into(),
            evaluator,
        }
    }
}

impl fmt::Debug for ExpressionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionCondition")
            .field("expression", &self.expression)
            .finish()
    }
}

impl Condition for ExpressionCondition {
    fn is_satisfied(&self, state: &TargetState) -> Result<bool, ConditionError> {
        self.evaluator
            .evaluate(&self.expression, state)
            .map_err(|reason| ConditionError {
                expression: self.expression.clone(),
                reason,
            })
    }

    fn describe(&self) -> String {
        self.expression.clone()
    }
}

pub struct CommandMonitor {
    command: String,
    sink: Arc<dyn CommandSink>,
}

impl CommandMonitor {
    pub fn new(command: impl Into<String>, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            command: command.into(),
            sink,
        }
    }
}

impl fmt::Debug for CommandMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMonitor")
            .field("command", &self.command)
            .finish()
    }
}

impl Monitor for CommandMonitor {
    fn perform(&self, state: &TargetState) -> Result<(), MonitorError> {
        self.sink
            .execute(&self.command, state)
            .map_err(|reason| MonitorError {
                monitor: self.command.clone(),
                reason,
            })
    }

    fn describe(&self) -> String {
        self.command.clone()
    }
}
