// Breakpoint resolution
//
// Binds a spec to something concrete in the target: a code location, a
// method, a field, an exception class, or nothing at all for kinds that are
// pure filters. A spec whose class is not loaded yet resolves to `None`; the
// manager retries it on the next structural event.

use crate::error::{BreakpointError, BreakpointResult};
use crate::filters::NamePattern;
use crate::spec::{BreakpointSpec, LineSpec, MethodSpec, ParameterFilter};
use crate::target::Target;
use crate::types::{ClassHandle, FieldHandle, Location, MethodInfo, RequestId};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedTarget {
    Location {
        class: Option<ClassHandle>,
        location: Location,
    },
    Method {
        class: ClassHandle,
        method: MethodInfo,
    },
    Field {
        class: ClassHandle,
        field: FieldHandle,
    },
    Exception {
        class: Option<ClassHandle>,
    },
    /// Class, thread and trace breakpoints bind to filters only.
    Filter,
}

impl ResolvedTarget {
    /// Name of the class whose unloading invalidates this binding.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ResolvedTarget::Location { class, .. } | ResolvedTarget::Exception { class } => {
                class.as_ref().map(|c| c.name.as_str())
            }
            ResolvedTarget::Method { class, .. } | ResolvedTarget::Field { class, .. } => {
                Some(class.name.as_str())
            }
            ResolvedTarget::Filter => None,
        }
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Newly bound; the request was armed under this id.
    Resolved(RequestId),
    /// Nothing to do, the breakpoint was bound before.
    AlreadyResolved,
    /// The target has nothing matching yet.
    Pending,
}

/// Look the spec up in the target.
pub fn resolve_spec(spec: &BreakpointSpec, target: &dyn Target) -> BreakpointResult<Option<ResolvedTarget>> {
    match spec {
        BreakpointSpec::Line(line) => Ok(resolve_line(line, target)),
        BreakpointSpec::Method(method) => resolve_method(method, target),
        BreakpointSpec::FieldWatch { class_name, field_name, .. } => Ok(target
            .resolve_class(class_name)
            .and_then(|class| {
                target
                    .field(&class, field_name)
                    .map(|field| ResolvedTarget::Field { class, field })
            })),
        BreakpointSpec::ExceptionCatch { class_name, .. } => Ok(target
            .resolve_class(class_name)
            .map(|class| ResolvedTarget::Exception { class: Some(class) })),
        BreakpointSpec::UncaughtException => Ok(Some(ResolvedTarget::Exception { class: None })),
        BreakpointSpec::ExplicitLocation { location } => Ok(Some(ResolvedTarget::Location {
            class: None,
            location: location.clone(),
        })),
        BreakpointSpec::ClassPattern { .. } | BreakpointSpec::ThreadLifecycle { .. } | BreakpointSpec::Trace { .. } => {
            Ok(Some(ResolvedTarget::Filter))
        }
    }
}

fn resolve_line(spec: &LineSpec, target: &dyn Target) -> Option<ResolvedTarget> {
    let pattern = NamePattern::parse(&spec.class_pattern).unwrap_or(NamePattern::Any);

    target
        .classes_by_source_name(&spec.source_name)
        .into_iter()
        .filter(|(class, source_path)| pattern.matches(&class.name) && source_matches(spec.url.path(), source_path))
        .find_map(|(class, _)| {
            let location = target.resolve_location(&class, spec.line)?;
            debug!("Line {} of {} has code in {}", spec.line, spec.url, class.name);
            Some(ResolvedTarget::Location {
                class: Some(class),
                location,
            })
        })
}

/// The key path matches when it names the same file, allowing the key to
/// carry extra leading directories ("src/main/java/com/example/Foo.java").
pub fn source_matches(key_path: &str, source_path: &str) -> bool {
    key_path == source_path
        || key_path
            .strip_suffix(source_path)
            .map(|head| head.ends_with('/'))
            .unwrap_or(false)
}

fn resolve_method(spec: &MethodSpec, target: &dyn Target) -> BreakpointResult<Option<ResolvedTarget>> {
    let class = match target.resolve_class(&spec.class_name) {
        Some(class) => class,
        None => return Ok(None),
    };

    let methods = target.methods(&class);
    let method = select_overload(&methods, &spec.method_name, &spec.parameters).map_err(|candidates| {
        BreakpointError::AmbiguousOverload {
            class: spec.class_name.clone(),
            method: spec.method_name.clone(),
            candidates,
        }
    })?;

    Ok(method.map(|method| ResolvedTarget::Method {
        class,
        method: method.clone(),
    }))
}

/// Pick the one method matching `name` and `filter`.
///
/// `Err(n)` when `n > 1` overloads survive the filter.
pub fn select_overload<'a>(
    methods: &'a [MethodInfo],
    name: &str,
    filter: &ParameterFilter,
) -> Result<Option<&'a MethodInfo>, usize> {
    let candidates: Vec<&MethodInfo> = methods
        .iter()
        .filter(|m| m.name == name)
        .filter(|m| match filter {
            ParameterFilter::Any => true,
            ParameterFilter::Exact(types) => parameters_match(types, &m.parameter_types),
        })
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(candidates[0])),
        n => Err(n),
    }
}

fn parameters_match(requested: &[String], actual: &[String]) -> bool {
    requested.len() == actual.len() && requested.iter().zip(actual).all(|(r, a)| type_matches(r, a))
}

/// "String" matches "java.lang.String"; qualified names must match exactly.
fn type_matches(requested: &str, actual: &str) -> bool {
    requested == actual
        || (!requested.contains('.')
            && actual
                .strip_suffix(requested)
                .map(|head| head.ends_with('.') || head.ends_with('$'))
                .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTarget;
    use crate::parser::parse;

    fn method(id: u64, name: &str, params: &[&str]) -> MethodInfo {
        MethodInfo {
            method_id: id,
            name: name.to_string(),
            parameter_types: params.iter().map(|p| p.to_string()).collect(),
            location: Location {
                type_tag: 1,
                class_id: 1,
                method_id: id,
                index: 0,
            },
        }
    }

    fn overloads() -> Vec<MethodInfo> {
        vec![
            method(1, "bar", &[]),
            method(2, "bar", &["int"]),
            method(3, "bar", &["int", "java.lang.String"]),
            method(4, "baz", &["long"]),
        ]
    }

    #[test]
    fn test_omitted_list_requires_unique_name() {
        let methods = overloads();
        assert_eq!(select_overload(&methods, "bar", &ParameterFilter::Any), Err(3));
        let baz = select_overload(&methods, "baz", &ParameterFilter::Any).unwrap().unwrap();
        assert_eq!(baz.method_id, 4);
        assert_eq!(select_overload(&methods, "qux", &ParameterFilter::Any), Ok(None));
    }

    #[test]
    fn test_empty_list_means_zero_parameters() {
        let methods = overloads();
        let none = select_overload(&methods, "bar", &ParameterFilter::Exact(vec![])).unwrap().unwrap();
        assert_eq!(none.method_id, 1);
        assert_eq!(select_overload(&methods, "baz", &ParameterFilter::Exact(vec![])), Ok(None));
    }

    #[test]
    fn test_explicit_list_matches_simple_and_qualified_names() {
        let methods = overloads();
        let simple = ParameterFilter::Exact(vec!["int".into(), "String".into()]);
        assert_eq!(select_overload(&methods, "bar", &simple).unwrap().unwrap().method_id, 3);

        let qualified = ParameterFilter::Exact(vec!["int".into(), "java.lang.String".into()]);
        assert_eq!(select_overload(&methods, "bar", &qualified).unwrap().unwrap().method_id, 3);

        let wrong = ParameterFilter::Exact(vec!["int".into(), "other.String".into()]);
        assert_eq!(select_overload(&methods, "bar", &wrong), Ok(None));
    }

    #[test]
    fn test_explicit_list_can_still_be_ambiguous() {
        let methods = vec![
            method(1, "put", &["a.Key"]),
            method(2, "put", &["b.Key"]),
        ];
        let filter = ParameterFilter::Exact(vec!["Key".into()]);
        assert_eq!(select_overload(&methods, "put", &filter), Err(2));
    }

    #[test]
    fn test_source_matching() {
        assert!(source_matches("com/example/Foo.java", "com/example/Foo.java"));
        assert!(source_matches("src/main/java/com/example/Foo.java", "com/example/Foo.java"));
        assert!(!source_matches("xcom/example/Foo.java", "com/example/Foo.java"));
        assert!(!source_matches("other/Foo.java", "com/example/Foo.java"));
    }

    #[test]
    fn test_line_resolution_against_mock() {
        let target = MockTarget::new();
        let spec = parse("com.example.Foo:12", None).unwrap();
        assert!(resolve_spec(&spec, &target).unwrap().is_none());

        let class = target.load_class("com.example.Foo", "com/example/Foo.java");
        target.add_line(&class, 12, 40);
        match resolve_spec(&spec, &target).unwrap() {
            Some(ResolvedTarget::Location { class: Some(c), location }) => {
                assert_eq!(c, class);
                assert_eq!(location.index, 40);
            }
            other => panic!("unexpected resolution {:?}", other),
        }

        let no_code = parse("com.example.Foo:13", None).unwrap();
        assert!(resolve_spec(&no_code, &target).unwrap().is_none());
    }

    #[test]
    fn test_method_resolution_reports_ambiguity() {
        let target = MockTarget::new();
        let class = target.load_class("a.Foo", "a/Foo.java");
        target.add_method(&class, "bar", &[]);
        target.add_method(&class, "bar", &["int"]);

        let spec = parse("a.Foo.bar", None).unwrap();
        assert!(matches!(
            resolve_spec(&spec, &target),
            Err(BreakpointError::AmbiguousOverload { candidates: 2, .. })
        ));

        let exact = parse("a.Foo.bar()", None).unwrap();
        assert!(matches!(
            resolve_spec(&exact, &target).unwrap(),
            Some(ResolvedTarget::Method { .. })
        ));
    }

    #[test]
    fn test_filter_kinds_resolve_immediately() {
        let target = MockTarget::new();
        let spec = BreakpointSpec::ThreadLifecycle {
            filter: None,
            stop_on_start: true,
            stop_on_death: false,
        };
        assert_eq!(resolve_spec(&spec, &target).unwrap(), Some(ResolvedTarget::Filter));
        assert_eq!(
            resolve_spec(&BreakpointSpec::UncaughtException, &target).unwrap(),
            Some(ResolvedTarget::Exception { class: None })
        );
    }
}
