// Breakpoint manager
//
// Owns every breakpoint and group, and the map from target request ids back
// to breakpoints. Breakpoints live in an arena keyed by id, each behind its
// own lock so that one entity's hit evaluation or resolution never blocks
// another's.
//
// Lock order: a breakpoint entity, then the group tree, then the breakpoint
// arena, then the request map. The group tree and the arena are only held
// briefly and never while waiting on an entity, so a slow hit evaluation or
// target call on one breakpoint never stalls another's.

use crate::breakpoint::{Binding, Breakpoint, BreakpointState};
use crate::condition::{Condition, Monitor};
use crate::config::ManagerConfig;
use crate::error::{BreakpointError, BreakpointResult};
use crate::events::{TargetEvent, TargetState};
use crate::factory::BreakpointFactory;
use crate::group::{BreakpointGroup, GroupTree, ROOT_GROUP};
use crate::hit::{self, HitReport};
use crate::parser;
use crate::record::BreakpointRecord;
use crate::resolver::{resolve_spec, Resolution, ResolvedTarget};
use crate::spec::BreakpointSpec;
use crate::target::{EventRequestSpec, Target};
use crate::threads::{self, ThreadEntry, ThreadGroupNode};
use crate::types::{BreakpointId, GroupId, RequestId, SuspendPolicy};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Entry = Arc<Mutex<Breakpoint>>;

pub struct BreakpointManager {
    target: Arc<dyn Target>,
    factory: BreakpointFactory,
    config: ManagerConfig,
    groups: RwLock<GroupTree>,
    breakpoints: RwLock<HashMap<BreakpointId, Entry>>,
    requests: RwLock<HashMap<RequestId, BreakpointId>>,
    next_id: AtomicU32,
}

impl BreakpointManager {
    pub fn new(target: Arc<dyn Target>) -> Self {
        Self::with_factory(target, BreakpointFactory::with_defaults(), ManagerConfig::default())
    }

    pub fn with_factory(target: Arc<dyn Target>, factory: BreakpointFactory, config: ManagerConfig) -> Self {
        Self {
            target,
            factory,
            config,
            groups: RwLock::new(GroupTree::new()),
            breakpoints: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn factory(&self) -> &BreakpointFactory {
        &self.factory
    }

    fn entry(&self, id: BreakpointId) -> BreakpointResult<Entry> {
        self.breakpoints
            .read()
            .get(&id)
            .cloned()
            .ok_or(BreakpointError::UnknownBreakpoint(id))
    }

    fn entries(&self) -> Vec<(BreakpointId, Entry)> {
        let mut entries: Vec<(BreakpointId, Entry)> = self
            .breakpoints
            .read()
            .iter()
            .map(|(&id, entry)| (id, entry.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Live breakpoint ids in creation order.
    pub fn ids(&self) -> Vec<BreakpointId> {
        self.entries().into_iter().map(|(id, _)| id).collect()
    }

    /// Parse `raw` against the target's current location and create a
    /// breakpoint for it in the default group.
    pub fn create(&self, raw: &str) -> BreakpointResult<BreakpointId> {
        self.create_in_group(raw, ROOT_GROUP)
    }

    pub fn create_in_group(&self, raw: &str, group: GroupId) -> BreakpointResult<BreakpointId> {
        let current = self.target.current_location();
        let spec = parser::parse(raw, current.as_ref())?;
        self.create_from_spec(spec, group)
    }

    pub fn create_from_spec(&self, spec: BreakpointSpec, group: GroupId) -> BreakpointResult<BreakpointId> {
        let id = self.insert(spec, group, |_| Ok(()))?;
        self.resolve_new(id)?;
        Ok(id)
    }

    fn insert(
        &self,
        spec: BreakpointSpec,
        group: GroupId,
        configure: impl FnOnce(&mut Breakpoint) -> BreakpointResult<()>,
    ) -> BreakpointResult<BreakpointId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut bp = self.factory.create(id, spec, group, &self.config)?;
        configure(&mut bp)?;
        let summary = bp.describe(true);

        // membership and arena entry appear together, so a concurrent
        // remove_group either sees both or rejects the group
        let mut groups = self.groups.write();
        if !groups.contains(group) {
            return Err(BreakpointError::UnknownGroup(group));
        }
        groups.move_member(id, None, group)?;
        self.breakpoints.write().insert(id, Arc::new(Mutex::new(bp)));
        drop(groups);
        info!("Created breakpoint {}: {}", id, summary);
        Ok(id)
    }

    // An ambiguous method is a user error at creation time; anything else
    // leaves the breakpoint pending.
    fn resolve_new(&self, id: BreakpointId) -> BreakpointResult<()> {
        if !self.config.resolve_on_create {
            return Ok(());
        }
        match self.resolve(id) {
            Ok(_) => Ok(()),
            Err(e @ BreakpointError::AmbiguousOverload { .. }) => {
                self.destroy(id);
                Err(e)
            }
            Err(e) => {
                warn!("Breakpoint {} left unresolved: {}", id, e);
                Ok(())
            }
        }
    }

    /// Bind the breakpoint to the target and arm its request.
    ///
    /// Idempotent: a resolved breakpoint is left alone and no second request
    /// is created.
    pub fn resolve(&self, id: BreakpointId) -> BreakpointResult<Resolution> {
        let entry = self.entry(id)?;
        let mut bp = entry.lock();
        if bp.is_destroyed() {
            return Err(BreakpointError::UnknownBreakpoint(id));
        }
        if bp.is_resolved() {
            return Ok(Resolution::AlreadyResolved);
        }

        let resolved = match resolve_spec(bp.spec(), self.target.as_ref())? {
            Some(resolved) => resolved,
            None => {
                debug!("Breakpoint {} pending: {}", id, bp.spec());
                return Ok(Resolution::Pending);
            }
        };

        let request_id = self.target.create_request(&request_spec(&bp, resolved.clone()))?;
        bp.bind(Binding {
            request_id,
            target: resolved,
            stale: false,
        });
        self.requests.write().insert(request_id, id);
        info!("Resolved breakpoint {} as request {}", id, request_id);
        Ok(Resolution::Resolved(request_id))
    }

    /// Try every unbound breakpoint, returning the ones that failed.
    ///
    /// Expired and disabled breakpoints are bound too; their requests are
    /// created disarmed.
    pub fn resolve_all(&self) -> Vec<(BreakpointId, BreakpointError)> {
        let mut failures = Vec::new();
        for (id, entry) in self.entries() {
            let unbound = {
                let bp = entry.lock();
                !bp.is_resolved() && !bp.is_destroyed()
            };
            if !unbound {
                continue;
            }
            if let Err(e) = self.resolve(id) {
                warn!("Breakpoint {} failed to resolve: {}", id, e);
                failures.push((id, e));
            }
        }
        failures
    }

    /// React to a change in what the target has loaded.
    pub fn on_structural_change(&self, event: &TargetEvent) -> Vec<(BreakpointId, BreakpointError)> {
        match event {
            TargetEvent::VmStart => self.resolve_all(),
            TargetEvent::ClassPrepare { class } => {
                debug!("Class prepared: {}", class.name);
                self.resolve_all()
            }
            TargetEvent::ClassUnload { class_name } => {
                self.unresolve_where(|target| target.class_name() == Some(class_name.as_str()), true);
                Vec::new()
            }
            TargetEvent::VmDeath => {
                self.unresolve_where(|_| true, false);
                Vec::new()
            }
            TargetEvent::ThreadStart { .. } | TargetEvent::ThreadDeath { .. } => self.resolve_all(),
            TargetEvent::Hit { request_id, .. } => {
                warn!("Hit for request {} delivered as a structural change", request_id);
                Vec::new()
            }
        }
    }

    fn unresolve_where(&self, matches: impl Fn(&ResolvedTarget) -> bool, clear: bool) {
        for (id, entry) in self.entries() {
            let mut bp = entry.lock();
            let bound = bp.binding().map(|b| matches(&b.target)).unwrap_or(false);
            if !bound {
                continue;
            }
            if let Some(binding) = bp.unbind() {
                self.requests.write().remove(&binding.request_id);
                if clear {
                    if let Err(e) = self.target.clear_request(binding.request_id) {
                        debug!("Request {} already gone: {}", binding.request_id, e);
                    }
                }
                info!("Breakpoint {} unresolved", id);
            }
        }
    }

    /// Route one candidate hit to its breakpoint and decide whether to stop.
    ///
    /// A request id with no live breakpoint behind it continues quietly.
    pub fn on_candidate_hit(&self, request_id: RequestId, state: &TargetState) -> HitReport {
        let id = match self.requests.read().get(&request_id).copied() {
            Some(id) => id,
            None => {
                debug!("No breakpoint for request {}", request_id);
                return HitReport::unrouted(request_id);
            }
        };
        let entry = match self.entry(id) {
            Ok(entry) => entry,
            Err(_) => return HitReport::unrouted(request_id),
        };

        let (mut bp, chain_enabled) = self.lock_with_group(&entry, GroupTree::is_chain_enabled);
        let outcome = hit::evaluate(&mut bp, chain_enabled, state);
        let destroy = outcome.expired_now && bp.deletes_on_expire();
        if outcome.expired_now && !destroy {
            if let Err(e) = self.target.set_request_enabled(request_id, false) {
                warn!("Failed to disable request {} after expiry: {}", request_id, e);
            }
        }

        let report = HitReport {
            breakpoint: Some(id),
            request_id,
            decision: outcome.decision,
            suspend_policy: bp.suspend_policy(),
            stop_count: bp.stop_count(),
            expired: bp.has_expired(),
            destroyed: destroy,
            condition_failures: outcome.condition_failures.iter().map(|e| e.to_string()).collect(),
            monitor_failures: outcome.monitor_failures.iter().map(|e| e.to_string()).collect(),
        };
        drop(bp);

        if destroy {
            self.destroy(id);
        }
        report
    }

    // Lock an entity together with something read from its group. The group
    // tree is read without holding the entity, then checked against the
    // entity's group; a breakpoint moved in between is read again.
    fn lock_with_group<'a, T>(
        &self,
        entry: &'a Entry,
        read: impl Fn(&GroupTree, GroupId) -> T,
    ) -> (MutexGuard<'a, Breakpoint>, T) {
        loop {
            let group = entry.lock().group();
            let value = read(&*self.groups.read(), group);
            let bp = entry.lock();
            if bp.group() == group {
                return (bp, value);
            }
        }
    }

    /// Destroy a breakpoint: release its request and leave its group.
    ///
    /// Returns false when there was nothing to destroy. Safe to call while a
    /// hit for the same breakpoint is being evaluated; that evaluation
    /// finishes first.
    pub fn destroy(&self, id: BreakpointId) -> bool {
        let entry = match self.breakpoints.write().remove(&id) {
            Some(entry) => entry,
            None => return false,
        };

        // waits out an in-flight hit; a destroyed entity can no longer move
        // between groups, so its group is final once read here
        let mut bp = entry.lock();
        let group = bp.group();
        if let Some(binding) = bp.mark_destroyed() {
            self.requests.write().remove(&binding.request_id);
            if let Err(e) = self.target.clear_request(binding.request_id) {
                warn!("Failed to clear request {}: {}", binding.request_id, e);
            }
        }
        drop(bp);

        self.groups.write().remove_member(group, id);
        info!("Destroyed breakpoint {}", id);
        true
    }

    pub fn with_breakpoint<T>(&self, id: BreakpointId, f: impl FnOnce(&Breakpoint) -> T) -> BreakpointResult<T> {
        let entry = self.entry(id)?;
        let bp = entry.lock();
        Ok(f(&bp))
    }

    fn update<T>(
        &self,
        id: BreakpointId,
        f: impl FnOnce(&mut Breakpoint) -> BreakpointResult<T>,
    ) -> BreakpointResult<T> {
        let entry = self.entry(id)?;
        let mut bp = entry.lock();
        if bp.is_destroyed() {
            return Err(BreakpointError::UnknownBreakpoint(id));
        }
        f(&mut bp)
    }

    pub fn state(&self, id: BreakpointId) -> BreakpointResult<BreakpointState> {
        self.with_breakpoint(id, |bp| bp.state())
    }

    pub fn describe(&self, id: BreakpointId, terse: bool) -> BreakpointResult<String> {
        self.with_breakpoint(id, |bp| bp.describe(terse))
    }

    /// Toggle the breakpoint's own flag and forward it to its request.
    ///
    /// Enabling a request whose filters or suspend policy changed replaces
    /// it with a fresh one.
    pub fn set_enabled(&self, id: BreakpointId, enabled: bool) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.set_enabled(enabled);
            let (request_id, stale) = match bp.binding() {
                Some(binding) => (binding.request_id, binding.stale),
                None => return Ok(()),
            };

            if enabled && stale {
                self.refresh_request(bp)
            } else {
                self.target
                    .set_request_enabled(request_id, enabled && !bp.has_expired())
                    .map_err(Into::into)
            }
        })
    }

    fn refresh_request(&self, bp: &mut Breakpoint) -> BreakpointResult<()> {
        let old = match bp.unbind() {
            Some(binding) => binding,
            None => return Ok(()),
        };
        self.requests.write().remove(&old.request_id);
        if let Err(e) = self.target.clear_request(old.request_id) {
            debug!("Request {} already gone: {}", old.request_id, e);
        }

        let request_id = self.target.create_request(&request_spec(bp, old.target.clone()))?;
        bp.bind(Binding {
            request_id,
            target: old.target,
            stale: false,
        });
        self.requests.write().insert(request_id, bp.id());
        debug!(
            "Breakpoint {} request {} replaced by {}",
            bp.id(),
            old.request_id,
            request_id
        );
        Ok(())
    }

    pub fn set_skip_count(&self, id: BreakpointId, skip_count: u32) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.set_skip_count(skip_count);
            Ok(())
        })
    }

    pub fn set_expire_count(&self, id: BreakpointId, expire_count: u32) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.set_expire_count(expire_count);
            Ok(())
        })
    }

    pub fn set_delete_on_expire(&self, id: BreakpointId, delete: bool) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.set_delete_on_expire(delete);
            Ok(())
        })
    }

    pub fn set_suspend_policy(&self, id: BreakpointId, policy: SuspendPolicy) -> BreakpointResult<()> {
        self.update(id, |bp| bp.set_suspend_policy(policy))
    }

    pub fn set_class_filters(&self, id: BreakpointId, filters: Option<&str>) -> BreakpointResult<()> {
        self.update(id, |bp| bp.set_class_filters(filters))
    }

    pub fn set_thread_filters(&self, id: BreakpointId, filters: Option<&str>) -> BreakpointResult<()> {
        self.update(id, |bp| bp.set_thread_filters(filters))
    }

    pub fn add_condition(&self, id: BreakpointId, condition: Arc<dyn Condition>) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.add_condition(condition);
            Ok(())
        })
    }

    /// Attach a condition built by the factory's expression evaluator.
    pub fn add_expression_condition(&self, id: BreakpointId, expression: &str) -> BreakpointResult<()> {
        let condition = self.factory.create_condition(expression)?;
        self.add_condition(id, condition)
    }

    pub fn remove_condition(&self, id: BreakpointId, index: usize) -> BreakpointResult<bool> {
        self.update(id, |bp| Ok(bp.remove_condition_at(index).is_some()))
    }

    pub fn add_monitor(&self, id: BreakpointId, monitor: Arc<dyn Monitor>) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.add_monitor(monitor);
            Ok(())
        })
    }

    /// Attach a monitor that runs `command` through the factory's command sink.
    pub fn add_command_monitor(&self, id: BreakpointId, command: &str) -> BreakpointResult<()> {
        let monitor = self.factory.create_monitor(command)?;
        self.add_monitor(id, monitor)
    }

    pub fn remove_monitor(&self, id: BreakpointId, description: &str) -> BreakpointResult<bool> {
        self.update(id, |bp| Ok(bp.remove_monitor_by_description(description)))
    }

    pub fn set_property(&self, id: BreakpointId, key: &str, value: serde_json::Value) -> BreakpointResult<()> {
        self.update(id, |bp| {
            bp.set_property(key, value);
            Ok(())
        })
    }

    pub fn remove_property(&self, id: BreakpointId, key: &str) -> BreakpointResult<Option<serde_json::Value>> {
        self.update(id, |bp| Ok(bp.remove_property(key)))
    }

    /// Clear counters and expiry. An expired request is re-armed if the
    /// breakpoint is still enabled, and an unbound breakpoint is resolved
    /// again in case its class loaded while it was expired.
    pub fn reset(&self, id: BreakpointId) -> BreakpointResult<()> {
        let bound = self.update(id, |bp| {
            let was_expired = bp.has_expired();
            bp.reset();
            match bp.binding() {
                Some(binding) => {
                    if was_expired && bp.is_enabled() {
                        self.target.set_request_enabled(binding.request_id, true)?;
                    }
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        if !bound {
            if let Err(e) = self.resolve(id) {
                warn!("Breakpoint {} left unresolved after reset: {}", id, e);
            }
        }
        Ok(())
    }

    /// Reset every breakpoint, e.g. when a new debuggee session starts.
    pub fn reset_all(&self) {
        for id in self.ids() {
            if let Err(e) = self.reset(id) {
                warn!("Failed to reset breakpoint {}: {}", id, e);
            }
        }
    }

    pub fn create_group(&self, name: &str, parent: GroupId) -> BreakpointResult<GroupId> {
        let id = self.groups.write().create_group(name, parent)?;
        debug!("Created group {} '{}' under {}", id, name, parent);
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Option<BreakpointGroup> {
        self.groups.read().get(id).cloned()
    }

    /// Every group, ordered by id.
    pub fn groups(&self) -> Vec<BreakpointGroup> {
        let mut groups: Vec<BreakpointGroup> = self.groups.read().iter().cloned().collect();
        groups.sort_by_key(|group| group.id());
        groups
    }

    pub fn group_path(&self, id: GroupId) -> Option<String> {
        self.groups.read().path(id)
    }

    pub fn move_group(&self, group: GroupId, new_parent: GroupId) -> BreakpointResult<()> {
        self.groups.write().move_group(group, new_parent)
    }

    pub fn set_group_enabled(&self, group: GroupId, enabled: bool) -> BreakpointResult<()> {
        self.groups.write().set_enabled(group, enabled)?;
        info!("Group {} {}", group, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub fn move_breakpoint(&self, id: BreakpointId, group: GroupId) -> BreakpointResult<()> {
        self.update(id, |bp| {
            self.groups.write().move_member(id, Some(bp.group()), group)?;
            bp.set_group(group);
            Ok(())
        })
    }

    /// Own flag AND every ancestor group's flag.
    pub fn is_effectively_enabled(&self, id: BreakpointId) -> BreakpointResult<bool> {
        let entry = self.entry(id)?;
        let (bp, chain_enabled) = self.lock_with_group(&entry, GroupTree::is_chain_enabled);
        Ok(bp.is_enabled() && chain_enabled)
    }

    /// Remove a group with its subgroups, destroying every breakpoint in them.
    pub fn remove_group(&self, group: GroupId) -> BreakpointResult<Vec<BreakpointId>> {
        let orphans = self.groups.write().remove_group(group)?;
        for &id in &orphans {
            self.destroy(id);
        }
        info!("Removed group {} and {} breakpoints", group, orphans.len());
        Ok(orphans)
    }

    pub fn records(&self) -> Vec<BreakpointRecord> {
        self.entries()
            .into_iter()
            .filter_map(|(_, entry)| {
                let (bp, path) = self.lock_with_group(&entry, GroupTree::path);
                if bp.is_destroyed() {
                    return None;
                }
                Some(BreakpointRecord::capture(&bp, path.unwrap_or_default()))
            })
            .collect()
    }

    /// Recreate a breakpoint from a record, creating its group path as needed.
    pub fn restore(&self, record: &BreakpointRecord) -> BreakpointResult<BreakpointId> {
        let conditions = record
            .conditions
            .iter()
            .map(|expr| self.factory.create_condition(expr))
            .collect::<BreakpointResult<Vec<_>>>()?;
        let monitors = record
            .monitors
            .iter()
            .map(|cmd| self.factory.create_monitor(cmd))
            .collect::<BreakpointResult<Vec<_>>>()?;
        let group = self.groups.write().ensure_path(&record.group_path)?;

        let id = self.insert(record.spec.clone(), group, |bp| {
            bp.set_enabled(false);
            bp.set_suspend_policy(record.suspend_policy)?;
            bp.set_class_filters(record.class_filters.as_deref())?;
            bp.set_thread_filters(record.thread_filters.as_deref())?;
            bp.set_skip_count(record.skip_count);
            bp.set_expire_count(record.expire_count);
            bp.set_delete_on_expire(record.delete_on_expire);
            conditions.into_iter().for_each(|c| bp.add_condition(c));
            monitors.into_iter().for_each(|m| bp.add_monitor(m));
            for (key, value) in &record.properties {
                bp.set_property(key.clone(), value.clone());
            }
            bp.set_enabled(record.enabled);
            Ok(())
        })?;
        self.resolve_new(id)?;
        Ok(id)
    }

    pub fn thread_groups(&self) -> Vec<ThreadGroupNode> {
        self.target.thread_groups()
    }

    /// Threads in the groups selected by `query`; see [`threads::find_threads`].
    pub fn find_threads(&self, query: &str) -> BreakpointResult<Vec<ThreadEntry>> {
        let roots = self.target.thread_groups();
        Ok(threads::find_threads(&roots, query)?.into_iter().cloned().collect())
    }
}

fn request_spec(bp: &Breakpoint, target: ResolvedTarget) -> EventRequestSpec {
    EventRequestSpec {
        kind: bp.kind(),
        target,
        suspend_policy: bp.suspend_policy(),
        class_filters: bp.class_filters().cloned(),
        thread_filters: bp.thread_filters().cloned(),
        enabled: bp.is_enabled() && !bp.has_expired(),
    }
}
