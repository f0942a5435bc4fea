//! Background status poller.
//!
//! Each session runs one poller task that samples the tag status source at
//! a fixed interval and feeds every successful sample through the session's
//! transition table. A failed sample is logged and skipped; the session
//! state stays as it was.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use vtag_hardware::StatusSource;

use crate::shared::SessionShared;

/// How a poller task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Loop observed the stop request and returned.
    Stopped,
    /// Task was aborted before returning.
    Cancelled,
    /// Task panicked.
    Panic,
}

/// Handle to a running poller task.
#[derive(Debug)]
pub(crate) struct StatusPoller {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl StatusPoller {
    /// Spawn the poller on `runtime`.
    ///
    /// The loop stops once the session's stop token is cancelled.
    pub(crate) fn spawn(
        runtime: &Handle,
        source: Arc<dyn StatusSource>,
        shared: Arc<SessionShared>,
        interval: Duration,
    ) -> Self {
        let token = shared.stop_token().clone();
        let task = runtime.spawn(Self::run(source, shared, interval, token.clone()));

        debug!(
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Status poller started"
        );
        Self { token, task }
    }

    async fn run(
        source: Arc<dyn StatusSource>,
        shared: Arc<SessionShared>,
        interval: Duration,
        token: CancellationToken,
    ) {
        loop {
            if token.is_cancelled() {
                break;
            }

            match source.sample_status() {
                Ok(status) => {
                    trace!(%status, "Sampled tag status");
                    shared.handle_status(status);
                }
                Err(e) => {
                    warn!(error = %e, "Tag status sample failed, state unchanged");
                }
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!("Status poller exiting");
    }

    /// Request a stop and wait for the loop to finish.
    ///
    /// No sample is handled after this returns.
    pub(crate) async fn stop(self) {
        self.token.cancel();
        let termination = Self::classify_task_result(self.task.await);
        Self::log_termination(termination);
    }

    /// Request a stop and abort the task without waiting.
    ///
    /// Used from synchronous teardown. The task may still finish the sample
    /// it is taking, but it never starts another one. Pair with
    /// [`SessionShared::stop`] so that sample is not handled.
    pub(crate) fn abort(self) {
        self.token.cancel();
        self.task.abort();
    }

    fn classify_task_result(result: Result<(), JoinError>) -> TaskTermination {
        match result {
            Ok(()) => TaskTermination::Stopped,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }

    fn log_termination(termination: TaskTermination) {
        match termination {
            TaskTermination::Stopped | TaskTermination::Cancelled => {
                debug!(?termination, "Status poller stopped");
            }
            TaskTermination::Panic => warn!("Status poller panicked"),
        }
    }
}
