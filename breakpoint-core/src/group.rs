// Breakpoint groups
//
// Groups form a tree rooted at the default group. Each group lists its member
// breakpoint ids; each breakpoint records its owning group id, so the
// relation is kept in two id-keyed halves rather than as references.

use crate::error::{BreakpointError, BreakpointResult};
use crate::types::{BreakpointId, GroupId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const ROOT_GROUP: GroupId = 0;
pub const ROOT_GROUP_NAME: &str = "Default";

#[derive(Debug, Clone, Serialize)]
pub struct BreakpointGroup {
    id: GroupId,
    name: String,
    enabled: bool,
    parent: Option<GroupId>,
    children: Vec<GroupId>,
    members: BTreeSet<BreakpointId>,
}

impl BreakpointGroup {
    fn new(id: GroupId, name: &str, parent: Option<GroupId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            enabled: true,
            parent,
            children: Vec::new(),
            members: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    pub fn members(&self) -> impl Iterator<Item = BreakpointId> + '_ {
        self.members.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct GroupTree {
    groups: HashMap<GroupId, BreakpointGroup>,
    next_id: GroupId,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(ROOT_GROUP, BreakpointGroup::new(ROOT_GROUP, ROOT_GROUP_NAME, None));
        Self {
            groups,
            next_id: ROOT_GROUP + 1,
        }
    }

    pub fn get(&self, id: GroupId) -> Option<&BreakpointGroup> {
        self.groups.get(&id)
    }

    fn get_mut(&mut self, id: GroupId) -> BreakpointResult<&mut BreakpointGroup> {
        self.groups.get_mut(&id).ok_or(BreakpointError::UnknownGroup(id))
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn create_group(&mut self, name: &str, parent: GroupId) -> BreakpointResult<GroupId> {
        let id = self.next_id;
        self.get_mut(parent)?.children.push(id);
        self.groups.insert(id, BreakpointGroup::new(id, name, Some(parent)));
        self.next_id += 1;
        Ok(id)
    }

    /// Reparent `group` under `new_parent`.
    pub fn move_group(&mut self, group: GroupId, new_parent: GroupId) -> BreakpointResult<()> {
        if group == ROOT_GROUP {
            return Err(BreakpointError::RootGroup);
        }
        if !self.contains(group) {
            return Err(BreakpointError::UnknownGroup(group));
        }
        if !self.contains(new_parent) {
            return Err(BreakpointError::UnknownGroup(new_parent));
        }
        if self.ancestors(new_parent).any(|g| g == group) {
            return Err(BreakpointError::GroupCycle(group));
        }

        let old_parent = self.get_mut(group)?.parent.replace(new_parent);
        if let Some(old) = old_parent {
            self.get_mut(old)?.children.retain(|&c| c != group);
        }
        self.get_mut(new_parent)?.children.push(group);
        Ok(())
    }

    /// Move a breakpoint's membership from `from` (if any) to `to`.
    pub fn move_member(
        &mut self,
        bp: BreakpointId,
        from: Option<GroupId>,
        to: GroupId,
    ) -> BreakpointResult<()> {
        if !self.contains(to) {
            return Err(BreakpointError::UnknownGroup(to));
        }
        if let Some(from) = from {
            if let Some(group) = self.groups.get_mut(&from) {
                group.members.remove(&bp);
            }
        }
        self.get_mut(to)?.members.insert(bp);
        Ok(())
    }

    pub fn remove_member(&mut self, group: GroupId, bp: BreakpointId) -> bool {
        self.groups
            .get_mut(&group)
            .map(|g| g.members.remove(&bp))
            .unwrap_or(false)
    }

    pub fn set_enabled(&mut self, group: GroupId, enabled: bool) -> BreakpointResult<()> {
        self.get_mut(group)?.enabled = enabled;
        Ok(())
    }

    /// `group` itself followed by each ancestor up to the root.
    pub fn ancestors(&self, group: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        std::iter::successors(Some(group), move |id| self.groups.get(id).and_then(|g| g.parent))
            .filter(move |id| self.groups.contains_key(id))
    }

    /// True when the group and every ancestor are enabled.
    pub fn is_chain_enabled(&self, group: GroupId) -> bool {
        self.contains(group)
            && self
                .ancestors(group)
                .all(|id| self.groups.get(&id).map(|g| g.enabled).unwrap_or(false))
    }

    /// Slash-separated names from the root, e.g. "Default/server/io".
    pub fn path(&self, group: GroupId) -> Option<String> {
        if !self.contains(group) {
            return None;
        }
        let mut names: Vec<&str> = self
            .ancestors(group)
            .filter_map(|id| self.groups.get(&id).map(|g| g.name.as_str()))
            .collect();
        names.reverse();
        Some(names.join("/"))
    }

    /// Find the group at `path`, creating missing groups along the way.
    /// A leading root name is optional.
    pub fn ensure_path(&mut self, path: &str) -> BreakpointResult<GroupId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&ROOT_GROUP_NAME) {
            segments.next();
        }

        let mut current = ROOT_GROUP;
        for name in segments {
            current = match self.child_named(current, name) {
                Some(id) => id,
                None => self.create_group(name, current)?,
            };
        }
        Ok(current)
    }

    fn child_named(&self, parent: GroupId, name: &str) -> Option<GroupId> {
        self.groups.get(&parent).and_then(|p| {
            p.children
                .iter()
                .copied()
                .find(|c| self.groups.get(c).map(|g| g.name == name).unwrap_or(false))
        })
    }

    /// `group` and all of its descendants, parents before children.
    pub fn subtree(&self, group: GroupId) -> Vec<GroupId> {
        let mut out = Vec::new();
        let mut stack = vec![group];
        while let Some(id) = stack.pop() {
            if let Some(g) = self.groups.get(&id) {
                out.push(id);
                stack.extend(g.children.iter().rev().copied());
            }
        }
        out
    }

    /// Remove a group and its descendants, returning the member breakpoints
    /// that were left without a group.
    pub fn remove_group(&mut self, group: GroupId) -> BreakpointResult<Vec<BreakpointId>> {
        if group == ROOT_GROUP {
            return Err(BreakpointError::RootGroup);
        }
        if !self.contains(group) {
            return Err(BreakpointError::UnknownGroup(group));
        }

        let doomed = self.subtree(group);
        if let Some(parent) = self.groups.get(&group).and_then(|g| g.parent) {
            self.get_mut(parent)?.children.retain(|&c| c != group);
        }

        let mut orphans = Vec::new();
        for id in doomed {
            if let Some(g) = self.groups.remove(&id) {
                orphans.extend(g.members);
            }
        }
        Ok(orphans)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreakpointGroup> {
        self.groups.values()
    }
}
