pub mod announcements;

use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

type JobTask = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct PendingJob {
    name: String,
    period: Duration,
    task: JobTask,
}

/// Fixed-period background jobs, one tokio task each.
///
/// Periods keep millisecond precision. Jobs added before `start` are spawned
/// by it; nothing runs until then.
#[derive(Default)]
pub struct Scheduler {
    pending: Mutex<Vec<PendingJob>>,
    running: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job that fires every `period`, first firing one period after start
    pub fn add_repeated_job<F>(&self, period: Duration, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        if period.is_zero() {
            anyhow::bail!("Job '{}' needs a non-zero period", name);
        }

        self.pending
            .lock()
            .map_err(|_| anyhow::anyhow!("Scheduler state poisoned"))?
            .push(PendingJob {
                name: name.to_string(),
                period,
                task: Box::new(task),
            });

        info!("Scheduled job '{}' every {}ms", name, period.as_millis());
        Ok(())
    }

    /// Spawn every pending job
    pub fn start(&self) -> Result<usize> {
        let pending: Vec<PendingJob> = self
            .pending
            .lock()
            .map_err(|_| anyhow::anyhow!("Scheduler state poisoned"))?
            .drain(..)
            .collect();

        let mut running = self
            .running
            .lock()
            .map_err(|_| anyhow::anyhow!("Scheduler state poisoned"))?;
        let started = pending.len();
        for job in pending {
            running.push(tokio::spawn(run_job(job)));
        }

        info!("Scheduler started {} jobs", started);
        Ok(started)
    }

    /// Stop all running jobs
    pub fn shutdown(&self) {
        if let Ok(mut running) = self.running.lock() {
            for handle in running.drain(..) {
                handle.abort();
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_job(job: PendingJob) {
    let mut ticker = tokio::time::interval_at(Instant::now() + job.period, job.period);
    // A slow send pushes the schedule back instead of firing a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        debug!("Running scheduled job: {}", job.name);
        (job.task)().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl Fn() -> BoxFuture<'static, ()> {
        let counter = counter.clone();
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_periods_are_kept() {
        let fast = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new();
        scheduler
            .add_repeated_job(Duration::from_millis(500), "fast", counting_job(&fast))
            .unwrap();
        scheduler
            .add_repeated_job(Duration::from_millis(1_500), "slow", counting_job(&slow))
            .unwrap();
        assert_eq!(scheduler.start().unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        assert_eq!(fast.load(Ordering::SeqCst), 6);
        assert_eq!(slow.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(slow.load(Ordering::SeqCst), 4);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_runs_before_start_or_after_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new();
        scheduler
            .add_repeated_job(Duration::from_millis(100), "tick", counting_job(&count))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.shutdown();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_period_rejected() {
        let scheduler = Scheduler::new();
        let result = scheduler.add_repeated_job(Duration::ZERO, "never", || async {}.boxed());
        assert!(result.is_err());
    }
}
