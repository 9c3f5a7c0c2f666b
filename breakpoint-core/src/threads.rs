// Thread-group traversal
//
// The target reports its threads as a tree of groups. Listings walk it
// preorder; lookups select threads by group id or by a pattern over group
// names and ids.

use crate::error::{BreakpointError, BreakpointResult};
use crate::types::{ThreadGroupId, ThreadId};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub id: ThreadId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadGroupNode {
    pub id: ThreadGroupId,
    pub name: String,
    /// Class of the group object, when it is a subclass of ThreadGroup.
    pub class_name: Option<String>,
    pub groups: Vec<ThreadGroupNode>,
    pub threads: Vec<ThreadEntry>,
}

/// Preorder walk over a forest of groups, yielding each group with its depth.
pub fn iter_groups(roots: &[ThreadGroupNode]) -> impl Iterator<Item = (usize, &ThreadGroupNode)> {
    let mut stack: Vec<(usize, &ThreadGroupNode)> = roots.iter().rev().map(|g| (0, g)).collect();
    std::iter::from_fn(move || {
        let (depth, group) = stack.pop()?;
        stack.extend(group.groups.iter().rev().map(|g| (depth + 1, g)));
        Some((depth, group))
    })
}

/// Threads of the groups selected by `query`.
///
/// A numeric query selects the group with that id. Anything else is a
/// case-insensitive regular expression searched for in each group's name,
/// then in its id.
pub fn find_threads<'a>(roots: &'a [ThreadGroupNode], query: &str) -> BreakpointResult<Vec<&'a ThreadEntry>> {
    if let Ok(id) = query.parse::<ThreadGroupId>() {
        return Ok(iter_groups(roots)
            .find(|(_, g)| g.id == id)
            .map(|(_, g)| g.threads.iter().collect())
            .unwrap_or_default());
    }

    let pattern = RegexBuilder::new(query)
        .case_insensitive(true)
        .build()
        .map_err(|e| BreakpointError::MalformedFilter(format!("{}: {}", query, e)))?;

    Ok(iter_groups(roots)
        .filter(|(_, g)| pattern.is_match(&g.name) || pattern.is_match(&g.id.to_string()))
        .flat_map(|(_, g)| g.threads.iter())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: ThreadId, name: &str) -> ThreadEntry {
        ThreadEntry {
            id,
            name: name.to_string(),
        }
    }

    fn group(id: ThreadGroupId, name: &str, groups: Vec<ThreadGroupNode>, threads: Vec<ThreadEntry>) -> ThreadGroupNode {
        ThreadGroupNode {
            id,
            name: name.to_string(),
            class_name: None,
            groups,
            threads,
        }
    }

    fn tree() -> Vec<ThreadGroupNode> {
        vec![group(
            1,
            "system",
            vec![
                group(2, "main", vec![], vec![thread(10, "main"), thread(11, "worker-1")]),
                group(3, "InnocuousThreadGroup", vec![], vec![thread(12, "cleaner")]),
            ],
            vec![thread(13, "Reference Handler")],
        )]
    }

    #[test]
    fn test_preorder_with_depth() {
        let roots = tree();
        let order: Vec<(usize, &str)> = iter_groups(&roots).map(|(d, g)| (d, g.name.as_str())).collect();
        assert_eq!(order, vec![(0, "system"), (1, "main"), (1, "InnocuousThreadGroup")]);
    }

    #[test]
    fn test_find_by_id() {
        let roots = tree();
        let names: Vec<&str> = find_threads(&roots, "2").unwrap().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["main", "worker-1"]);
        assert!(find_threads(&roots, "99").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_pattern() {
        let roots = tree();
        let found = find_threads(&roots, "INNOCUOUS").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 12);

        let all = find_threads(&roots, "^s").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Reference Handler");
    }

    #[test]
    fn test_bad_pattern() {
        let roots = tree();
        assert!(matches!(
            find_threads(&roots, "(unclosed"),
            Err(BreakpointError::MalformedFilter(_))
        ));
    }
}
