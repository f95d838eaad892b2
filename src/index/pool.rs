//! Bounded worker thread pool for inversion tasks.

use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::Result;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-width pool over a bounded job queue.
///
/// `execute` blocks once the queue is full, which is the engine's only form
/// of ingest backpressure. Dropping the pool closes the queue and joins the
/// workers after a best-effort drain.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `num_threads` workers sharing one bounded queue.
    pub fn new(num_threads: usize) -> Result<ThreadPool> {
        assert!(num_threads > 0, "a pool needs at least one worker");
        let (sender, receiver) = crossbeam_channel::bounded::<Job>(num_threads * 2);
        let mut workers = Vec::with_capacity(num_threads);
        for worker_id in 0..num_threads {
            let receiver: Receiver<Job> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("textindex-worker-{worker_id}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })?;
            workers.push(handle);
        }
        Ok(ThreadPool {
            sender: Some(sender),
            workers,
        })
    }

    /// Enqueues a job, blocking while the queue is at capacity.
    pub fn execute<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.sender
            .as_ref()
            .expect("pool already shut down")
            .send(Box::new(job))
            .expect("all worker threads terminated");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("a pool worker panicked during shutdown");
            }
        }
    }
}
