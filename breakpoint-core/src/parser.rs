// Breakpoint spec parser
//
// Turns the text a user types after "break" into a typed spec. Accepted forms:
//   <line>                       line in the current file
//   <class-or-file>:<line>       line in a named class or source file
//   [<class>(:|.)]<method>[(<arg-list>)]
//
// The method syntax is a little broader than the documented
// `[<class>:]<method>([<arg-list>])` for jdb compatibility: a dot may separate
// class and method, and the parentheses may be left off entirely.

use crate::error::{BreakpointError, BreakpointResult};
use crate::spec::{class_name_to_source_path, BreakpointSpec, LineSpec, MethodSpec, ParameterFilter, SourceUrl};
use crate::types::CurrentLocation;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BARE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

static QUALIFIED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+:[0-9]+$").expect("valid regex"));

static METHOD_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        // group 1: optional class name
        r"^(?:([^(]+)[:.])?",
        // group 2: required method name
        r"([^()]+)",
        // group 3: optional parenthesized arg list, possibly empty
        r"(?:\(([^()]*)\))?$",
    ))
    .expect("valid regex")
});

/// Parse a raw breakpoint spec.
///
/// `current` supplies the file (for a bare line number) or the class (for a
/// bare method name); without it those shorthand forms fail with
/// [`BreakpointError::AmbiguousLocation`].
pub fn parse(raw: &str, current: Option<&CurrentLocation>) -> BreakpointResult<BreakpointSpec> {
    let spec = raw.trim();

    if BARE_LINE.is_match(spec) || QUALIFIED_LINE.is_match(spec) {
        parse_line(spec, current)
    } else {
        parse_method(spec, current)
    }
}

fn parse_line(spec: &str, current: Option<&CurrentLocation>) -> BreakpointResult<BreakpointSpec> {
    let (prefix, number) = match spec.rfind(':') {
        Some(idx) => (Some(&spec[..idx]), &spec[idx + 1..]),
        None => (None, spec),
    };

    let line: u32 = number
        .parse()
        .map_err(|_| BreakpointError::InvalidLineNumber(number.to_string()))?;

    let path = match prefix {
        None => {
            let loc = current.ok_or(BreakpointError::AmbiguousLocation)?;
            loc.source_path.clone()
        }
        Some(prefix) if prefix.contains('/') || prefix.contains('\\') => prefix.to_string(),
        Some(class_name) => class_name_to_source_path(class_name)?,
    };

    let url = SourceUrl::from_path(&path)?;
    debug!("Parsed line spec {} -> {}:{}", spec, url, line);

    Ok(BreakpointSpec::Line(LineSpec::new(url, None, line)?))
}

fn parse_method(spec: &str, current: Option<&CurrentLocation>) -> BreakpointResult<BreakpointSpec> {
    let caps = METHOD_BREAK
        .captures(spec)
        .ok_or_else(|| BreakpointError::Parse(spec.to_string()))?;

    let class_name = match caps.get(1) {
        Some(m) => m.as_str().to_string(),
        None => {
            let loc = current.ok_or(BreakpointError::AmbiguousLocation)?;
            loc.class_name.clone()
        }
    };

    // group 2 is not optional, so a successful match always has it
    let method = caps
        .get(2)
        .map(|m| m.as_str())
        .ok_or_else(|| BreakpointError::Parse(spec.to_string()))?;

    let parameters = match caps.get(3) {
        Some(args) => ParameterFilter::Exact(split_arg_list(spec, args.as_str())?),
        None => ParameterFilter::Any,
    };

    debug!("Parsed method spec {} -> {}.{} {:?}", spec, class_name, method, parameters);

    Ok(BreakpointSpec::Method(MethodSpec::new(&class_name, method, parameters)?))
}

// Every comma must separate two non-empty types.
fn split_arg_list(spec: &str, args: &str) -> BreakpointResult<Vec<String>> {
    if args.trim().is_empty() {
        return Ok(Vec::new());
    }
    args.split(',')
        .map(str::trim)
        .map(|arg| {
            if arg.is_empty() {
                Err(BreakpointError::Parse(spec.to_string()))
            } else {
                Ok(arg.to_string())
            }
        })
        .collect()
}
