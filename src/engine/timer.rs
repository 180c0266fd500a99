use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::debug;

/// Disposer for a scheduled task. Dropping it aborts the task; `cancel` also waits for it.
pub struct TimerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub async fn cancel(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        debug!(timer = self.name, "timer cancelled");
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fires `tick` immediately and then every `period`. Each tick runs as its own task, so a
/// slow tick never delays the schedule; overlapping work must be guarded by the callee.
pub fn every<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> TimerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_millis(1));
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            tokio::spawn(tick());
        }
    });

    TimerHandle { name, task }
}

/// Runs `fire` once after `delay` unless cancelled first.
pub fn after<F, Fut>(name: &'static str, delay: Duration, fire: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        sleep(delay).await;
        // Detached so the callback may drop this handle without aborting itself.
        tokio::spawn(fire());
    });

    TimerHandle { name, task }
}
