//! Background worker pool.
//!
//! Long filesystem work (scans, hashing, publish integrators) runs on a
//! small tokio runtime's blocking pool so the calling thread stays free for
//! metadata reads. Jobs are plain closures returning `Result`; the caller
//! joins the returned [`JobHandle`] when it needs the outcome.

pub use crate::concurrency::CancelToken;

use crate::{Error, Result};
use std::io;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

/// Fixed-size pool for blocking jobs.
pub struct WorkerPool {
    runtime: Runtime,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool running at most `threads` jobs at once.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("vogue-worker")
            .build()
            .map_err(Error::Io)?;
        debug!(threads, "Worker pool started");
        Ok(Self { runtime, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Queue a job.
    pub fn spawn<T, F>(&self, job: F) -> JobHandle<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        JobHandle {
            inner: self.runtime.spawn_blocking(job),
            handle: self.runtime.handle().clone(),
        }
    }

    /// Queue a job and wait for it.
    pub fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(job).join()
    }
}

/// Handle to a queued job.
pub struct JobHandle<T> {
    inner: JoinHandle<Result<T>>,
    handle: Handle,
}

impl<T> JobHandle<T> {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Block until the job completes. Must not be called from a pool thread.
    pub fn join(self) -> Result<T> {
        self.handle
            .block_on(self.inner)
            .map_err(|e| Error::Io(io::Error::other(format!("worker job failed: {}", e))))?
    }
}
