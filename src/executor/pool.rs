//! Worker thread pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::debug;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs     : Mutex<VecDeque<Job>>,
    ready    : Condvar,
    shutdown : AtomicBool,
}

/// Fixed set of named worker threads executing jobs in submission order.
pub(crate) struct WorkerPool {
    queue   : Arc<Queue>,
    workers : Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `n` workers (at least one).
    pub fn new(n : usize) -> std::io::Result<WorkerPool> {
        let queue = Arc::new(Queue{
            jobs     : Mutex::new(VecDeque::new()),
            ready    : Condvar::new(),
            shutdown : AtomicBool::new(false) });

        let n = n.max(1);
        let mut pool = WorkerPool{ queue, workers : Vec::with_capacity(n) };
        for id in 0..n {
            let q = pool.queue.clone();
            let handle = thread::Builder::new()
                .name(format!("lpmodel-worker-{}", id))
                .spawn(move || worker_loop(id, q))?;
            pool.workers.push(handle);
        }
        debug!(component = "executor", workers = n, "worker pool started");
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize { self.workers.len() }

    pub fn submit(&self, job : Job) {
        self.queue.jobs.lock().unwrap_or_else(PoisonError::into_inner).push_back(job);
        self.queue.ready.notify_one();
    }

    /// Stop accepting work, let the workers finish all queued jobs, and join them.
    pub fn shutdown(& mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.shutdown.store(true, Ordering::SeqCst);
        self.queue.ready.notify_all();
        for worker in self.workers.drain(..) {
            _ = worker.join();
        }
        debug!(component = "executor", "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(& mut self) {
        self.shutdown();
    }
}

fn worker_loop(id : usize, queue : Arc<Queue>) {
    loop {
        let job = {
            let mut jobs = queue.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            loop {
                if let Some(job) = jobs.pop_front() {
                    break Some(job);
                }
                if queue.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                jobs = queue.ready.wait(jobs).unwrap_or_else(PoisonError::into_inner);
            }
        };

        match job {
            Some(job) => job(),
            None => break
        }
    }
    debug!(component = "executor", worker = id, "worker exiting");
}
