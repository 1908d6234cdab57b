//! Pipeline scheduler — two execution lanes over the tokio runtime.
//!
//! ```text
//!   generation lane (concurrent)          commit lane (serialized)
//!   Semaphore(max_workers)                Mutex<()> (FIFO)
//!   spawn_blocking(raster work) ──────►   spawn_blocking(atlas/cache write)
//! ```
//!
//! Raster generation is CPU-bound and pure, so up to `max_workers` jobs run
//! at once on the blocking pool. Everything that touches the atlas, the
//! skyline or the cache maps goes through the commit lane, one job at a
//! time, in the order the jobs were queued. Jobs are never cancelled once
//! started; callers that drop the future still let the job run to the end.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;

use crate::error::PipelineError;

/// Lane counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub generated: u64,
    pub committed: u64,
}

#[derive(Default)]
struct Counters {
    generated: AtomicU64,
    committed: AtomicU64,
}

/// Bounded concurrent lane plus a single-writer lane.
pub struct PipelineScheduler {
    generation: Arc<Semaphore>,
    commit: Arc<Mutex<()>>,
    max_workers: usize,
    counters: Arc<Counters>,
}

impl PipelineScheduler {
    /// `max_workers` is clamped to at least one.
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            generation: Arc::new(Semaphore::new(max_workers)),
            commit: Arc::new(Mutex::new(())),
            max_workers,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Generation slots currently free.
    pub fn idle_workers(&self) -> usize {
        self.generation.available_permits()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            generated: self.counters.generated.load(Ordering::Relaxed),
            committed: self.counters.committed.load(Ordering::Relaxed),
        }
    }

    /// Start `work` on the generation lane and return its handle.
    ///
    /// The job waits for a free slot, then runs on the blocking pool.
    pub fn spawn_generate<F, T>(&self, work: F) -> JoinHandle<Result<T, PipelineError>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let lane = Arc::clone(&self.generation);
        let counters = Arc::clone(&self.counters);
        tokio::spawn(async move {
            let permit = lane.acquire_owned().await?;
            let out = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work()
            })
            .await?;
            counters.generated.fetch_add(1, Ordering::Relaxed);
            Ok::<T, PipelineError>(out)
        })
    }

    /// Run `work` on the generation lane and wait for it.
    pub fn generate<F, T>(&self, work: F) -> impl Future<Output = Result<T, PipelineError>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.spawn_generate(work);
        async move { handle.await? }
    }

    /// Run `work` on the commit lane, exclusive with every other commit.
    pub async fn commit<F, T>(&self, work: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.commit).lock_owned().await;
        let out = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            work()
        })
        .await?;
        self.counters.committed.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }
}

impl Default for PipelineScheduler {
    fn default() -> Self {
        Self::new(default_workers())
    }
}

/// One worker per available core, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

// ===================================================================
// Tests
// ===================================================================
