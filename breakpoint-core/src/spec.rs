// Breakpoint specifications
//
// A spec is the immutable description of what a breakpoint binds to. It is
// produced once (by the text parser or a factory constructor) and never
// mutated afterwards.

use crate::error::{BreakpointError, BreakpointResult};
use crate::types::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

const URL_PREFIX: &str = "file:///";

/// The kinds of breakpoint the subsystem knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointKind {
    Line,
    Method,
    ClassPattern,
    ThreadLifecycle,
    FieldWatch,
    ExceptionCatch,
    UncaughtException,
    Trace,
    ExplicitLocation,
}

impl BreakpointKind {
    pub const ALL: [BreakpointKind; 9] = [
        BreakpointKind::Line,
        BreakpointKind::Method,
        BreakpointKind::ClassPattern,
        BreakpointKind::ThreadLifecycle,
        BreakpointKind::FieldWatch,
        BreakpointKind::ExceptionCatch,
        BreakpointKind::UncaughtException,
        BreakpointKind::Trace,
        BreakpointKind::ExplicitLocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BreakpointKind::Line => "line",
            BreakpointKind::Method => "method",
            BreakpointKind::ClassPattern => "class_pattern",
            BreakpointKind::ThreadLifecycle => "thread_lifecycle",
            BreakpointKind::FieldWatch => "field_watch",
            BreakpointKind::ExceptionCatch => "exception_catch",
            BreakpointKind::UncaughtException => "uncaught_exception",
            BreakpointKind::Trace => "trace",
            BreakpointKind::ExplicitLocation => "explicit_location",
        }
    }
}

impl fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque matching key for a source file.
///
/// Looks like a `file:` URL but is never dereferenced; only its path is
/// compared against the source-name metadata of loaded classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Build the key from a slash- or backslash-separated source path.
    pub fn from_path(path: &str) -> BreakpointResult<Self> {
        let normalized = path.replace('\\', "/");
        let trimmed = normalized.trim_start_matches("./").trim_start_matches('/');

        if trimmed.is_empty() || trimmed.ends_with('/') {
            return Err(BreakpointError::MalformedClassName(path.to_string()));
        }
        if trimmed.chars().any(|c| c.is_control() || c == '?' || c == '#') {
            return Err(BreakpointError::MalformedClassName(path.to_string()));
        }
        if trimmed.split('/').any(|segment| segment.is_empty()) {
            return Err(BreakpointError::MalformedClassName(path.to_string()));
        }

        Ok(Self(format!("{}{}", URL_PREFIX, trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path portion, e.g. "com/example/Foo.java".
    pub fn path(&self) -> &str {
        &self.0[URL_PREFIX.len()..]
    }

    /// Final path segment, e.g. "Foo.java".
    pub fn file_name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }
}

impl TryFrom<String> for SourceUrl {
    type Error = BreakpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.strip_prefix(URL_PREFIX) {
            Some(path) => Self::from_path(path),
            None => Self::from_path(&value),
        }
    }
}

impl From<SourceUrl> for String {
    fn from(url: SourceUrl) -> Self {
        url.0
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameter constraint of a method spec.
///
/// `Any` comes from a spec with no parenthesized list at all; `Exact(vec![])`
/// comes from `()` and only matches zero-parameter methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterFilter {
    Any,
    Exact(Vec<String>),
}

impl ParameterFilter {
    /// The explicit parameter types; empty for both `Any` and `Exact([])`.
    pub fn types(&self) -> &[String] {
        match self {
            ParameterFilter::Any => &[],
            ParameterFilter::Exact(types) => types,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    pub url: SourceUrl,
    pub package: Option<String>,
    /// Class filter derived from the package: "*" or "pkg.*".
    pub class_pattern: String,
    pub source_name: String,
    pub line: u32,
}

impl LineSpec {
    pub fn new(url: SourceUrl, package: Option<&str>, line: u32) -> BreakpointResult<Self> {
        let package = package.filter(|p| !p.is_empty());
        if let Some(pkg) = package {
            validate_class_name(pkg)?;
        }
        let class_pattern = match package {
            Some(pkg) => format!("{}.*", pkg),
            None => "*".to_string(),
        };
        let source_name = url.file_name().to_string();
        Ok(Self {
            url,
            package: package.map(str::to_string),
            class_pattern,
            source_name,
            line,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub class_name: String,
    pub method_name: String,
    pub parameters: ParameterFilter,
}

impl MethodSpec {
    pub fn new(class_name: &str, method_name: &str, parameters: ParameterFilter) -> BreakpointResult<Self> {
        validate_class_name(class_name)?;
        validate_member_name(method_name)?;
        Ok(Self {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            parameters,
        })
    }

    pub fn parameters(&self) -> &[String] {
        self.parameters.types()
    }
}

/// Parsed, validated description of what a breakpoint should bind to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakpointSpec {
    Line(LineSpec),
    Method(MethodSpec),
    ClassPattern {
        filter: String,
        stop_on_prepare: bool,
        stop_on_unload: bool,
    },
    ThreadLifecycle {
        filter: Option<String>,
        stop_on_start: bool,
        stop_on_death: bool,
    },
    FieldWatch {
        class_name: String,
        field_name: String,
        on_access: bool,
        on_modify: bool,
    },
    ExceptionCatch {
        class_name: String,
        caught: bool,
        uncaught: bool,
    },
    UncaughtException,
    Trace {
        class_filter: Option<String>,
        thread_filter: Option<String>,
        on_enter: bool,
        on_exit: bool,
    },
    ExplicitLocation {
        location: Location,
    },
}

impl BreakpointSpec {
    pub fn kind(&self) -> BreakpointKind {
        match self {
            BreakpointSpec::Line(_) => BreakpointKind::Line,
            BreakpointSpec::Method(_) => BreakpointKind::Method,
            BreakpointSpec::ClassPattern { .. } => BreakpointKind::ClassPattern,
            BreakpointSpec::ThreadLifecycle { .. } => BreakpointKind::ThreadLifecycle,
            BreakpointSpec::FieldWatch { .. } => BreakpointKind::FieldWatch,
            BreakpointSpec::ExceptionCatch { .. } => BreakpointKind::ExceptionCatch,
            BreakpointSpec::UncaughtException => BreakpointKind::UncaughtException,
            BreakpointSpec::Trace { .. } => BreakpointKind::Trace,
            BreakpointSpec::ExplicitLocation { .. } => BreakpointKind::ExplicitLocation,
        }
    }

    /// Name of the class this spec must find in the target before it can
    /// resolve, if any.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            BreakpointSpec::Method(m) => Some(&m.class_name),
            BreakpointSpec::FieldWatch { class_name, .. } => Some(class_name),
            BreakpointSpec::ExceptionCatch { class_name, .. } => Some(class_name),
            _ => None,
        }
    }
}

impl fmt::Display for BreakpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointSpec::Line(l) => write!(f, "{}:{}", l.url.path(), l.line),
            BreakpointSpec::Method(m) => {
                write!(f, "{}.{}", m.class_name, m.method_name)?;
                match &m.parameters {
                    ParameterFilter::Any => Ok(()),
                    ParameterFilter::Exact(types) => write!(f, "({})", types.join(", ")),
                }
            }
            BreakpointSpec::ClassPattern { filter, stop_on_prepare, stop_on_unload } => {
                write!(f, "class {}", filter)?;
                write_flags(f, &[("prepare", *stop_on_prepare), ("unload", *stop_on_unload)])
            }
            BreakpointSpec::ThreadLifecycle { filter, stop_on_start, stop_on_death } => {
                write!(f, "thread {}", filter.as_deref().unwrap_or("*"))?;
                write_flags(f, &[("start", *stop_on_start), ("death", *stop_on_death)])
            }
            BreakpointSpec::FieldWatch { class_name, field_name, on_access, on_modify } => {
                write!(f, "watch {}.{}", class_name, field_name)?;
                write_flags(f, &[("access", *on_access), ("modify", *on_modify)])
            }
            BreakpointSpec::ExceptionCatch { class_name, caught, uncaught } => {
                write!(f, "catch {}", class_name)?;
                write_flags(f, &[("caught", *caught), ("uncaught", *uncaught)])
            }
            BreakpointSpec::UncaughtException => f.write_str("uncaught exceptions"),
            BreakpointSpec::Trace { class_filter, thread_filter, on_enter, on_exit } => {
                write!(
                    f,
                    "trace {} in {}",
                    class_filter.as_deref().unwrap_or("*"),
                    thread_filter.as_deref().unwrap_or("*")
                )?;
                write_flags(f, &[("enter", *on_enter), ("exit", *on_exit)])
            }
            BreakpointSpec::ExplicitLocation { location } => write!(
                f,
                "location class={:x} method={:x} index={}",
                location.class_id, location.method_id, location.index
            ),
        }
    }
}

fn write_flags(f: &mut fmt::Formatter<'_>, flags: &[(&str, bool)]) -> fmt::Result {
    let set: Vec<&str> = flags.iter().filter(|(_, on)| *on).map(|(name, _)| *name).collect();
    if set.is_empty() {
        Ok(())
    } else {
        write!(f, " [{}]", set.join(","))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Dotted class names: every segment must be a Java identifier.
pub fn validate_class_name(name: &str) -> BreakpointResult<()> {
    if !name.is_empty() && name.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(BreakpointError::MalformedClassName(name.to_string()))
    }
}

pub fn validate_member_name(name: &str) -> BreakpointResult<()> {
    if name == "<init>" || name == "<clinit>" || is_identifier(name) {
        Ok(())
    } else {
        Err(BreakpointError::MalformedMemberName(name.to_string()))
    }
}

/// Convert a class name to the path of the source file declaring it.
/// Nested classes map to their outermost class's file.
pub fn class_name_to_source_path(class_name: &str) -> BreakpointResult<String> {
    validate_class_name(class_name)?;
    let outer = match class_name.find('$') {
        Some(idx) if idx > 0 => &class_name[..idx],
        _ => class_name,
    };
    Ok(format!("{}.java", outer.replace('.', "/")))
}
