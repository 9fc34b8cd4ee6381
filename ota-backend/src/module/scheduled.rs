//! Scheduled task manager - owns all periodic background tasks
//!
//! This module manages the refresh loops of the backend:
//! - Facility registry check (hourly)
//! - Station cache refresh (one task per bound market)
//!
//! Every task shares one cancellation token, so shutdown stops them together.

use crate::error::TunerResult;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Scheduled task manager
pub struct ScheduledTaskManager {
    cancel: CancellationToken,
    task_handles: Vec<(String, JoinHandle<()>)>,
}

impl Default for ScheduledTaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduledTaskManager {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task_handles: Vec::new(),
        }
    }

    /// Run `job` every `period`, first run one period from now.
    ///
    /// A failed run is logged and the schedule continues. A run in progress is
    /// never interrupted; cancellation is observed between runs. A zero period
    /// is refused and nothing is scheduled.
    pub fn spawn_periodic<F, Fut>(&mut self, name: impl Into<String>, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TunerResult<()>> + Send + 'static,
    {
        let name = name.into();
        if period.is_zero() {
            tracing::error!("Refusing to schedule task '{}' with a zero interval", name);
            return;
        }
        let token = self.cancel.child_token();
        let task_name = name.clone();

        tracing::info!(
            "Scheduling task '{}' (interval: {:.1} min)",
            name,
            period.as_secs_f64() / 60.0
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!("Running scheduled task '{}'", task_name);
                        if let Err(e) = job().await {
                            tracing::error!("Scheduled task '{}' failed: {}", task_name, e);
                        }
                    }
                }
            }

            tracing::debug!("Scheduled task '{}' stopped", task_name);
        });

        self.task_handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.task_handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_handles.is_empty()
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} scheduled tasks...", self.task_handles.len());

        self.cancel.cancel();

        let (names, handles): (Vec<_>, Vec<_>) = self.task_handles.into_iter().unzip();
        for (name, result) in names.iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                tracing::warn!("Scheduled task '{}' ended abnormally: {}", name, e);
            }
        }

        tracing::info!("All scheduled tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunerError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_period_until_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut tasks = ScheduledTaskManager::new();

        let counter = runs.clone();
        tasks.spawn_periodic("count", PERIOD, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(tasks.len(), 1);

        tokio::time::sleep(PERIOD / 2).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        tasks.shutdown().await;
        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_schedule() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut tasks = ScheduledTaskManager::new();

        let counter = runs.clone();
        tasks.spawn_periodic("flaky", PERIOD, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TunerError::fetch("station list", "connection reset"))
            }
        });

        tokio::time::sleep(PERIOD * 2 + PERIOD / 2).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_not_scheduled() {
        let mut tasks = ScheduledTaskManager::new();
        tasks.spawn_periodic("busy", Duration::ZERO, || async { Ok(()) });

        assert!(tasks.is_empty());
        tasks.shutdown().await;
    }
}
