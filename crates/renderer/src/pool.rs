//! Fixed-size worker pool with a FIFO job queue.
//!
//! Workers are named OS threads, each owning the receiving end of its own
//! job channel. The pool itself is driven from async code: it never blocks
//! waiting for a worker, completions arrive on a tokio channel and are
//! handed to each job's callback by [`WorkerPool::next_completion`].

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};
use world_common::{JobError, WorldError, WorldResult};

/// Work executed on a pool thread.
pub trait JobHandler: Send + Sync + 'static {
    type Job: Send + 'static;
    type Output: Send + 'static;

    fn handle(&self, job: Self::Job) -> Result<Self::Output, JobError>;
}

/// Called exactly once with the job's result.
pub type Callback<O> = Box<dyn FnOnce(Result<O, JobError>) + Send>;

struct Completion<O> {
    worker: usize,
    result: Result<O, JobError>,
}

struct Worker<J> {
    sender: Option<Sender<J>>,
    handle: Option<JoinHandle<()>>,
}

/// Lifetime counters for a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub enqueued: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct WorkerPool<H: JobHandler> {
    workers: Vec<Worker<H::Job>>,
    /// Idle worker ids, used as a stack.
    free: Vec<usize>,
    busy: HashMap<usize, Callback<H::Output>>,
    queue: VecDeque<(H::Job, Callback<H::Output>)>,
    completions: UnboundedReceiver<Completion<H::Output>>,
    terminated: bool,
    stats: PoolStats,
}

impl<H: JobHandler> WorkerPool<H> {
    /// Spawn `worker_count` threads sharing `handler`.
    pub fn new(handler: H, worker_count: usize) -> WorldResult<Self> {
        if worker_count == 0 {
            return Err(WorldError::config("worker pool needs at least one worker"));
        }

        let handler = Arc::new(handler);
        let (done_tx, completions) = unbounded_channel();

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (job_tx, job_rx) = unbounded();
            let handler = Arc::clone(&handler);
            let done = done_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("tile-worker-{}", id))
                .spawn(move || worker_loop(id, handler, job_rx, done))?;

            workers.push(Worker {
                sender: Some(job_tx),
                handle: Some(handle),
            });
        }

        debug!(workers = worker_count, "worker pool started");

        Ok(Self {
            workers,
            free: (0..worker_count).rev().collect(),
            busy: HashMap::with_capacity(worker_count),
            queue: VecDeque::new(),
            completions,
            terminated: false,
            stats: PoolStats::default(),
        })
    }

    /// Queue a job and dispatch as many queued jobs as there are idle workers.
    pub fn enqueue<F>(&mut self, job: H::Job, on_complete: F) -> WorldResult<()>
    where
        F: FnOnce(Result<H::Output, JobError>) + Send + 'static,
    {
        if self.terminated {
            return Err(WorldError::PoolTerminated);
        }

        self.queue.push_back((job, Box::new(on_complete)));
        self.stats.enqueued += 1;
        self.pump();
        Ok(())
    }

    /// Whether any job is queued or running.
    pub fn is_busy(&self) -> bool {
        !self.queue.is_empty() || !self.busy.is_empty()
    }

    /// Process one completion, waiting for it if necessary.
    ///
    /// Returns `false` when nothing is in flight.
    pub async fn next_completion(&mut self) -> bool {
        if self.busy.is_empty() {
            return false;
        }

        match self.completions.recv().await {
            Some(Completion { worker, result }) => {
                if !self.terminated {
                    self.free.push(worker);
                }
                self.deliver(worker, result);
                self.pump();
                true
            }
            None => {
                // Every worker thread is gone.
                for (worker, callback) in self.busy.drain() {
                    warn!(worker, "worker exited with a job in flight");
                    self.stats.failed += 1;
                    callback(Err(JobError::WorkerLost(worker)));
                }
                false
            }
        }
    }

    /// Process completions until no job is queued or running.
    pub async fn drain(&mut self) {
        while self.next_completion().await {}
    }

    /// Stop accepting work.
    ///
    /// Queued jobs complete with [`JobError::Terminated`]. Running jobs
    /// finish normally and can still be awaited with
    /// [`WorkerPool::next_completion`].
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        let cancelled = self.queue.len();
        for (_, callback) in self.queue.drain(..) {
            self.stats.failed += 1;
            callback(Err(JobError::Terminated));
        }
        for worker in &mut self.workers {
            worker.sender = None;
        }
        self.free.clear();

        info!(
            cancelled,
            in_flight = self.busy.len(),
            "worker pool terminated"
        );
    }

    /// Fail every queued job with [`JobError::Cancelled`] and keep the pool
    /// open. Running jobs are untouched. Returns the number cancelled.
    pub fn cancel_queued(&mut self) -> usize {
        let cancelled = self.queue.len();
        for (_, callback) in self.queue.drain(..) {
            self.stats.failed += 1;
            callback(Err(JobError::Cancelled));
        }
        if cancelled > 0 {
            debug!(cancelled, in_flight = self.busy.len(), "queued jobs cancelled");
        }
        cancelled
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Workers still accepting jobs.
    pub fn worker_count(&self) -> usize {
        self.workers.iter().filter(|w| w.sender.is_some()).count()
    }

    pub fn idle_count(&self) -> usize {
        self.free.len()
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn pump(&mut self) {
        if self.terminated {
            return;
        }

        while !self.queue.is_empty() {
            let Some(worker) = self.free.pop() else {
                break;
            };
            let Some((job, callback)) = self.queue.pop_front() else {
                self.free.push(worker);
                break;
            };

            let Some(sender) = self.workers[worker].sender.as_ref() else {
                self.queue.push_front((job, callback));
                continue;
            };

            match sender.send(job) {
                Ok(()) => {
                    trace!(worker, queued = self.queue.len(), "dispatched job");
                    self.busy.insert(worker, callback);
                    self.stats.dispatched += 1;
                }
                Err(SendError(job)) => {
                    warn!(worker, "worker hung up, retiring it");
                    self.workers[worker].sender = None;
                    self.queue.push_front((job, callback));
                }
            }
        }

        if !self.queue.is_empty() && self.busy.is_empty() && self.worker_count() == 0 {
            warn!(queued = self.queue.len(), "no live workers left");
            for (_, callback) in self.queue.drain(..) {
                self.stats.failed += 1;
                callback(Err(JobError::WorkerLost(0)));
            }
        }
    }

    fn deliver(&mut self, worker: usize, result: Result<H::Output, JobError>) {
        let Some(callback) = self.busy.remove(&worker) else {
            warn!(worker, "completion from a worker with no job in flight");
            return;
        };
        match &result {
            Ok(_) => self.stats.completed += 1,
            Err(err) => {
                debug!(worker, error = %err, "job failed");
                self.stats.failed += 1;
            }
        }
        callback(result);
    }
}

impl<H: JobHandler> Drop for WorkerPool<H> {
    fn drop(&mut self) {
        self.terminate();

        for (id, worker) in self.workers.iter_mut().enumerate() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!(worker = id, "worker thread panicked");
                }
            }
        }

        while let Ok(Completion { worker, result }) = self.completions.try_recv() {
            self.deliver(worker, result);
        }
        for (_, callback) in self.busy.drain() {
            callback(Err(JobError::Terminated));
        }
    }
}

fn worker_loop<H: JobHandler>(
    id: usize,
    handler: Arc<H>,
    jobs: Receiver<H::Job>,
    done: UnboundedSender<Completion<H::Output>>,
) {
    while let Ok(job) = jobs.recv() {
        let result = match catch_unwind(AssertUnwindSafe(|| handler.handle(job))) {
            Ok(result) => result,
            Err(panic) => Err(JobError::Panicked(panic_message(panic.as_ref()))),
        };

        if done.send(Completion { worker: id, result }).is_err() {
            break;
        }
    }
    trace!(worker = id, "worker exiting");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
