// Breakpoint factory
//
// Maps each breakpoint kind to the function that builds its entity. The
// registry is filled when the factory is built; kinds are never looked up by
// name at runtime.

use crate::breakpoint::Breakpoint;
use crate::condition::{CommandMonitor, CommandSink, Condition, ExpressionCondition, ExpressionEvaluator, Monitor};
use crate::config::ManagerConfig;
use crate::error::{BreakpointError, BreakpointResult};
use crate::filters::{FilterList, NamePattern};
use crate::spec::{
    validate_class_name, validate_member_name, BreakpointKind, BreakpointSpec, LineSpec, MethodSpec, ParameterFilter,
    SourceUrl,
};
use crate::types::{BreakpointId, GroupId, Location, SuspendPolicy};
use std::collections::HashMap;
use std::sync::Arc;

pub type Constructor = fn(BreakpointId, BreakpointSpec, GroupId, &ManagerConfig) -> Breakpoint;

fn construct_default(id: BreakpointId, spec: BreakpointSpec, group: GroupId, config: &ManagerConfig) -> Breakpoint {
    Breakpoint::new(id, spec, group, config.default_enabled, config.default_suspend_policy)
}

// Tracing reports entries and exits without suspending anything.
fn construct_trace(id: BreakpointId, spec: BreakpointSpec, group: GroupId, config: &ManagerConfig) -> Breakpoint {
    Breakpoint::new(id, spec, group, config.default_enabled, SuspendPolicy::None)
}

pub struct BreakpointFactory {
    constructors: HashMap<BreakpointKind, Constructor>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    command_sink: Option<Arc<dyn CommandSink>>,
}

impl Default for BreakpointFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BreakpointFactory {
    /// A factory with an empty registry.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            evaluator: None,
            command_sink: None,
        }
    }

    /// A factory with a constructor for every kind.
    pub fn with_defaults() -> Self {
        let mut factory = Self::empty();
        for kind in BreakpointKind::ALL {
            let ctor: Constructor = match kind {
                BreakpointKind::Trace => construct_trace,
                _ => construct_default,
            };
            factory.register(kind, ctor);
        }
        factory
    }

    /// Install a constructor, returning the one it replaced.
    pub fn register(&mut self, kind: BreakpointKind, ctor: Constructor) -> Option<Constructor> {
        self.constructors.insert(kind, ctor)
    }

    pub fn is_registered(&self, kind: BreakpointKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_command_sink(mut self, sink: Arc<dyn CommandSink>) -> Self {
        self.command_sink = Some(sink);
        self
    }

    pub fn create(
        &self,
        id: BreakpointId,
        spec: BreakpointSpec,
        group: GroupId,
        config: &ManagerConfig,
    ) -> BreakpointResult<Breakpoint> {
        let kind = spec.kind();
        let ctor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| BreakpointError::UnsupportedKind(kind.to_string()))?;
        Ok(ctor(id, spec, group, config))
    }

    pub fn create_condition(&self, expression: &str) -> BreakpointResult<Arc<dyn Condition>> {
        let evaluator = self
            .evaluator
            .clone()
            .ok_or_else(|| BreakpointError::InvalidConfig("no expression evaluator configured".to_string()))?;
        Ok(Arc::new(ExpressionCondition::new(expression, evaluator)))
    }

    pub fn create_monitor(&self, command: &str) -> BreakpointResult<Arc<dyn Monitor>> {
        let sink = self
            .command_sink
            .clone()
            .ok_or_else(|| BreakpointError::InvalidConfig("no command sink configured".to_string()))?;
        Ok(Arc::new(CommandMonitor::new(command, sink)))
    }

    pub fn line_spec(source_path: &str, package: Option<&str>, line: u32) -> BreakpointResult<BreakpointSpec> {
        let url = SourceUrl::from_path(source_path)?;
        Ok(BreakpointSpec::Line(LineSpec::new(url, package, line)?))
    }

    /// `parameters: None` places no constraint on the overload.
    pub fn method_spec(class_name: &str, method_name: &str, parameters: Option<Vec<String>>) -> BreakpointResult<BreakpointSpec> {
        let filter = match parameters {
            Some(types) => ParameterFilter::Exact(types),
            None => ParameterFilter::Any,
        };
        Ok(BreakpointSpec::Method(MethodSpec::new(class_name, method_name, filter)?))
    }

    pub fn class_spec(filter: &str, stop_on_prepare: bool, stop_on_unload: bool) -> BreakpointResult<BreakpointSpec> {
        FilterList::parse(filter)?;
        Ok(BreakpointSpec::ClassPattern {
            filter: filter.trim().to_string(),
            stop_on_prepare,
            stop_on_unload,
        })
    }

    pub fn thread_spec(filter: Option<&str>, stop_on_start: bool, stop_on_death: bool) -> BreakpointResult<BreakpointSpec> {
        Ok(BreakpointSpec::ThreadLifecycle {
            filter: checked_filter(filter)?,
            stop_on_start,
            stop_on_death,
        })
    }

    pub fn watch_spec(class_name: &str, field_name: &str, on_access: bool, on_modify: bool) -> BreakpointResult<BreakpointSpec> {
        validate_class_name(class_name)?;
        validate_member_name(field_name)?;
        Ok(BreakpointSpec::FieldWatch {
            class_name: class_name.to_string(),
            field_name: field_name.to_string(),
            on_access,
            on_modify,
        })
    }

    pub fn exception_spec(class_name: &str, caught: bool, uncaught: bool) -> BreakpointResult<BreakpointSpec> {
        validate_class_name(class_name)?;
        Ok(BreakpointSpec::ExceptionCatch {
            class_name: class_name.to_string(),
            caught,
            uncaught,
        })
    }

    pub fn uncaught_spec() -> BreakpointSpec {
        BreakpointSpec::UncaughtException
    }

    pub fn trace_spec(
        class_filter: Option<&str>,
        thread_filter: Option<&str>,
        on_enter: bool,
        on_exit: bool,
    ) -> BreakpointResult<BreakpointSpec> {
        Ok(BreakpointSpec::Trace {
            class_filter: checked_filter(class_filter)?,
            thread_filter: checked_filter(thread_filter)?,
            on_enter,
            on_exit,
        })
    }

    pub fn location_spec(location: Location) -> BreakpointSpec {
        BreakpointSpec::ExplicitLocation { location }
    }
}

fn checked_filter(filter: Option<&str>) -> BreakpointResult<Option<String>> {
    match filter.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => {
            NamePattern::parse(text)?;
            Ok(Some(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TargetState;

    struct Always;

    impl ExpressionEvaluator for Always {
        fn evaluate(&self, _expression: &str, _state: &TargetState) -> Result<bool, String> {
            Ok(true)
        }
    }

    #[test]
    fn test_defaults_cover_every_kind() {
        let factory = BreakpointFactory::with_defaults();
        for kind in BreakpointKind::ALL {
            assert!(factory.is_registered(kind), "{}", kind);
        }
    }

    #[test]
    fn test_unregistered_kind_fails() {
        let factory = BreakpointFactory::empty();
        let err = factory
            .create(1, BreakpointSpec::UncaughtException, 0, &ManagerConfig::default())
            .unwrap_err();
        assert!(matches!(err, BreakpointError::UnsupportedKind(k) if k == "uncaught_exception"));
    }

    #[test]
    fn test_registered_constructor_is_used() {
        fn disabled(id: BreakpointId, spec: BreakpointSpec, group: GroupId, _: &ManagerConfig) -> Breakpoint {
            Breakpoint::new(id, spec, group, false, SuspendPolicy::EventThread)
        }

        let mut factory = BreakpointFactory::with_defaults();
        assert!(factory.register(BreakpointKind::Line, disabled).is_some());

        let spec = BreakpointFactory::line_spec("a/B.java", None, 3).unwrap();
        let bp = factory.create(9, spec, 0, &ManagerConfig::default()).unwrap();
        assert!(!bp.is_enabled());
        assert_eq!(bp.suspend_policy(), SuspendPolicy::EventThread);
    }

    #[test]
    fn test_trace_does_not_suspend() {
        let factory = BreakpointFactory::with_defaults();
        let spec = BreakpointFactory::trace_spec(Some("com.example.*"), None, true, true).unwrap();
        let bp = factory.create(1, spec, 0, &ManagerConfig::default()).unwrap();
        assert_eq!(bp.suspend_policy(), SuspendPolicy::None);
    }

    #[test]
    fn test_spec_builders_validate_names() {
        assert!(matches!(
            BreakpointFactory::watch_spec("a.B", "9lives", false, true),
            Err(BreakpointError::MalformedMemberName(_))
        ));
        assert!(matches!(
            BreakpointFactory::exception_spec("java..IOException", true, false),
            Err(BreakpointError::MalformedClassName(_))
        ));
        assert!(matches!(
            BreakpointFactory::class_spec("com.*.Foo", true, false),
            Err(BreakpointError::MalformedFilter(_))
        ));
        assert!(BreakpointFactory::thread_spec(Some("worker-*"), true, true).is_ok());
    }

    #[test]
    fn test_line_spec_with_package() {
        match BreakpointFactory::line_spec("com/example/Foo.java", Some("com.example"), 5).unwrap() {
            BreakpointSpec::Line(line) => assert_eq!(line.class_pattern, "com.example.*"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_condition_needs_evaluator() {
        let bare = BreakpointFactory::with_defaults();
        assert!(bare.create_condition("x > 1").is_err());
        assert!(bare.create_monitor("where").is_err());

        let factory = BreakpointFactory::with_defaults().with_evaluator(Arc::new(Always));
        let cond = factory.create_condition("x > 1").unwrap();
        assert_eq!(cond.describe(), "x > 1");
    }
}
