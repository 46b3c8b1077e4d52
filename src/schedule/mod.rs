//! Cancelable delayed tasks.
//!
//! A `ScheduledTask` owns at most one pending timer. Scheduling again replaces
//! the previous timer, and dropping the owner cancels it.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct ScheduledTask {
    pending: Option<Pending>,
}

struct Pending {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `job` after `delay` unless canceled first. Replaces any pending job.
    pub fn schedule<F>(&mut self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_after(async {}, delay, job);
    }

    /// Like `schedule`, but the delay only starts once `ready` completes.
    /// Canceling while `ready` is still running drops it without running `job`.
    pub fn schedule_after<R, F>(&mut self, ready: R, delay: Duration, job: F)
    where
        R: Future<Output = ()> + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let wait = async move {
                ready.await;
                tokio::time::sleep(delay).await;
            };
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = wait => job.await,
            }
        });

        self.pending = Some(Pending { token, handle });
    }

    /// Cancels the pending job. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                let waiting = !pending.handle.is_finished();
                pending.token.cancel();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
