// Target event dispatcher
//
// Serializes target events into the manager one at a time. Callers hand an
// event to the dispatcher task and wait for its outcome; every hit report is
// also published on a bounded channel for listeners such as a UI.

use crate::error::{BreakpointError, BreakpointResult};
use crate::events::TargetEvent;
use crate::hit::HitReport;
use crate::manager::BreakpointManager;
use crate::types::BreakpointId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// What processing one event produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    Hit(HitReport),
    /// Breakpoints that failed to resolve after a structural change.
    Structural(Vec<(BreakpointId, BreakpointError)>),
}

struct DeliverRequest {
    event: TargetEvent,
    reply_tx: oneshot::Sender<DispatchOutcome>,
}

/// Handle to the dispatcher task
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    event_tx: mpsc::Sender<DeliverRequest>,
    shutdown_tx: mpsc::Sender<()>,
}

impl DispatcherHandle {
    /// Queue an event and wait until the manager has processed it
    pub async fn deliver(&self, event: TargetEvent) -> BreakpointResult<DispatchOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.event_tx
            .send(DeliverRequest { event, reply_tx })
            .await
            .map_err(|_| BreakpointError::DispatcherClosed)?;

        reply_rx.await.map_err(|_| BreakpointError::DispatcherClosed)
    }

    /// Stop the task; events still queued are dropped unanswered
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Dispatcher already stopped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Start the dispatcher task for `manager`
pub fn spawn_dispatcher(manager: Arc<BreakpointManager>) -> (DispatcherHandle, mpsc::Receiver<HitReport>) {
    let (event_tx, event_rx) = mpsc::channel(manager.config().event_buffer.max(1));
    let (report_tx, report_rx) = mpsc::channel(manager.config().report_buffer.max(1));
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    tokio::spawn(dispatcher_task(manager, event_rx, report_tx, shutdown_rx));

    (DispatcherHandle { event_tx, shutdown_tx }, report_rx)
}

async fn dispatcher_task(
    manager: Arc<BreakpointManager>,
    mut event_rx: mpsc::Receiver<DeliverRequest>,
    report_tx: mpsc::Sender<HitReport>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!("Dispatcher started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                break;
            }

            request = event_rx.recv() => {
                let Some(DeliverRequest { event, reply_tx }) = request else {
                    break;
                };
                debug!("Dispatching {}", event.name());

                let outcome = match &event {
                    TargetEvent::Hit { request_id, state } => {
                        let report = manager.on_candidate_hit(*request_id, state);
                        publish(&report_tx, report.clone());
                        DispatchOutcome::Hit(report)
                    }
                    structural => DispatchOutcome::Structural(manager.on_structural_change(structural)),
                };

                if reply_tx.send(outcome).is_err() {
                    debug!("Caller stopped waiting for {}", event.name());
                }
            }
        }
    }

    info!("Dispatcher shutting down");
}

fn publish(report_tx: &mpsc::Sender<HitReport>, report: HitReport) {
    match report_tx.try_send(report) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(report)) => {
            error!(
                "Hit report channel full! Dropping report for request {}",
                report.request_id
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            warn!("Hit report receiver dropped, reports will be discarded");
        }
    }
}
