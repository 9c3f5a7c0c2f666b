// Hit evaluation
//
// Decides whether a candidate hit suspends the target. The caller holds the
// breakpoint's lock for the whole evaluation and passes the group chain's
// enablement as read from one snapshot of the group tree.

use crate::breakpoint::Breakpoint;
use crate::error::{ConditionError, MonitorError};
use crate::events::TargetState;
use crate::types::{BreakpointId, RequestId, SuspendPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopDecision {
    Stop,
    Continue,
}

impl StopDecision {
    pub fn is_stop(self) -> bool {
        self == StopDecision::Stop
    }
}

#[derive(Debug, Clone)]
pub struct HitOutcome {
    pub decision: StopDecision,
    /// This hit was the last one before expiry.
    pub expired_now: bool,
    pub condition_failures: Vec<ConditionError>,
    pub monitor_failures: Vec<MonitorError>,
}

impl HitOutcome {
    fn proceed() -> Self {
        Self {
            decision: StopDecision::Continue,
            expired_now: false,
            condition_failures: Vec::new(),
            monitor_failures: Vec::new(),
        }
    }
}

/// What the subsystem reports back for one candidate hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitReport {
    /// `None` when the request id maps to no live breakpoint.
    pub breakpoint: Option<BreakpointId>,
    pub request_id: RequestId,
    pub decision: StopDecision,
    pub suspend_policy: SuspendPolicy,
    pub stop_count: u32,
    pub expired: bool,
    /// Expired with delete-on-expire set.
    pub destroyed: bool,
    pub condition_failures: Vec<String>,
    pub monitor_failures: Vec<String>,
}

impl HitReport {
    pub fn unrouted(request_id: RequestId) -> Self {
        Self {
            breakpoint: None,
            request_id,
            decision: StopDecision::Continue,
            suspend_policy: SuspendPolicy::None,
            stop_count: 0,
            expired: false,
            destroyed: false,
            condition_failures: Vec::new(),
            monitor_failures: Vec::new(),
        }
    }
}

/// Evaluate one candidate hit against `bp`.
///
/// Counters are left alone when the breakpoint is not effectively enabled.
/// Skipped hits and hits vetoed by a condition still count. Only a condition
/// that evaluates to false vetoes the stop: one that fails to evaluate counts
/// as satisfied and its error is reported, so a broken expression stops
/// rather than silently never firing. Monitor failures are collected and
/// never change the decision.
pub fn evaluate(bp: &mut Breakpoint, chain_enabled: bool, state: &TargetState) -> HitOutcome {
    if bp.is_destroyed() || bp.has_expired() || !bp.is_enabled() || !chain_enabled {
        debug!("Breakpoint {} inactive, continuing", bp.id());
        return HitOutcome::proceed();
    }

    let count = bp.record_hit();
    let skip = bp.skip_count();
    if skip > 0 && count <= skip {
        debug!("Breakpoint {} skipping hit {} of {}", bp.id(), count, skip);
        return HitOutcome::proceed();
    }

    let mut outcome = HitOutcome::proceed();
    for condition in bp.conditions() {
        match condition.is_satisfied(state) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Breakpoint {} condition '{}' is false", bp.id(), condition.describe());
                return outcome;
            }
            Err(e) => {
                warn!("Breakpoint {}: {}", bp.id(), e);
                outcome.condition_failures.push(e);
            }
        }
    }

    let expire = bp.expire_count();
    if expire > 0 && count >= skip.saturating_add(expire) {
        bp.mark_expired();
        outcome.expired_now = true;
        info!("Breakpoint {} expired after {} hits", bp.id(), count);
    }

    for monitor in bp.monitors() {
        if let Err(e) = monitor.perform(state) {
            warn!("Breakpoint {}: {}", bp.id(), e);
            outcome.monitor_failures.push(e);
        }
    }

    outcome.decision = StopDecision::Stop;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::BreakpointState;
    use crate::condition::{Condition, Monitor};
    use crate::parser::parse;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fixed {
        result: Result<bool, ()>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(result: Result<bool, ()>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Condition for Fixed {
        fn is_satisfied(&self, _state: &TargetState) -> Result<bool, ConditionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.map_err(|_| ConditionError {
                expression: "broken".to_string(),
                reason: "no such variable".to_string(),
            })
        }

        fn describe(&self) -> String {
            format!("{:?}", self.result)
        }
    }

    #[derive(Debug)]
    struct Log {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Monitor for Log {
        fn perform(&self, _state: &TargetState) -> Result<(), MonitorError> {
            self.log.lock().push(self.name);
            if self.fail {
                return Err(MonitorError {
                    monitor: self.name.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }

        fn describe(&self) -> String {
            self.name.to_string()
        }
    }

    fn breakpoint() -> Breakpoint {
        let spec = parse("a.Foo:3", None).unwrap();
        Breakpoint::new(1, spec, 0, true, SuspendPolicy::All)
    }

    fn hit(bp: &mut Breakpoint) -> StopDecision {
        evaluate(bp, true, &TargetState::default()).decision
    }

    #[test]
    fn test_skip_then_expire() {
        let mut bp = breakpoint();
        bp.set_skip_count(2);
        bp.set_expire_count(2);

        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(hit(&mut bp), StopDecision::Stop);
        assert!(!bp.has_expired());

        let fourth = evaluate(&mut bp, true, &TargetState::default());
        assert_eq!(fourth.decision, StopDecision::Stop);
        assert!(fourth.expired_now);
        assert!(bp.has_expired());

        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(bp.state(), BreakpointState::Expired);
        assert_eq!(bp.stop_count(), 4);
    }

    #[test]
    fn test_inactive_does_not_count() {
        let mut bp = breakpoint();
        assert_eq!(evaluate(&mut bp, false, &TargetState::default()).decision, StopDecision::Continue);
        bp.set_enabled(false);
        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(bp.stop_count(), 0);

        bp.set_enabled(true);
        bp.mark_destroyed();
        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(bp.stop_count(), 0);
    }

    #[test]
    fn test_condition_short_circuit() {
        let mut bp = breakpoint();
        let first = Fixed::new(Ok(false));
        let second = Fixed::new(Ok(true));
        let log = Arc::new(Mutex::new(Vec::new()));
        bp.add_condition(first.clone());
        bp.add_condition(second.clone());
        bp.add_monitor(Arc::new(Log {
            name: "m",
            fail: false,
            log: log.clone(),
        }));

        assert_eq!(hit(&mut bp), StopDecision::Continue);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert!(log.lock().is_empty());
        assert_eq!(bp.stop_count(), 1);
    }

    #[test]
    fn test_condition_error_counts_as_satisfied_unlike_false() {
        let mut bp = breakpoint();
        bp.add_condition(Fixed::new(Err(())));
        let outcome = evaluate(&mut bp, true, &TargetState::default());
        assert_eq!(outcome.decision, StopDecision::Stop);
        assert_eq!(outcome.condition_failures.len(), 1);
        assert_eq!(outcome.condition_failures[0].expression, "broken");

        bp.add_condition(Fixed::new(Ok(false)));
        let outcome = evaluate(&mut bp, true, &TargetState::default());
        assert_eq!(outcome.decision, StopDecision::Continue);
        assert_eq!(outcome.condition_failures.len(), 1);
    }

    #[test]
    fn test_monitors_run_in_order_and_never_veto() {
        let mut bp = breakpoint();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, fail) in [("first", true), ("second", false)] {
            bp.add_monitor(Arc::new(Log {
                name,
                fail,
                log: log.clone(),
            }));
        }

        let outcome = evaluate(&mut bp, true, &TargetState::default());
        assert_eq!(outcome.decision, StopDecision::Stop);
        assert_eq!(outcome.monitor_failures.len(), 1);
        assert_eq!(log.lock().as_slice(), ["first", "second"]);
    }

    #[test]
    fn test_expire_without_skip() {
        let mut bp = breakpoint();
        bp.set_expire_count(1);
        let outcome = evaluate(&mut bp, true, &TargetState::default());
        assert!(outcome.decision.is_stop());
        assert!(outcome.expired_now);
        assert_eq!(hit(&mut bp), StopDecision::Continue);

        bp.reset();
        assert_eq!(hit(&mut bp), StopDecision::Stop);
    }
}
