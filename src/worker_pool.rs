//! Bounded worker pool for independent battle tasks.
//!
//! Tasks go into a FIFO queue guarded by one mutex and a condition
//! variable; results leave through a separate channel, so submission only
//! ever blocks on the queue lock. Workers drain the queue before honouring
//! the stop flag and are always joined, never detached.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::trace;

struct Queue<T> {
    tasks: VecDeque<T>,
    stop: bool,
}

struct Shared<T> {
    queue: Mutex<Queue<T>>,
    available: Condvar,
}

/// Fixed set of workers consuming tasks and pushing results to a channel.
pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `max(1, num_threads)` workers. Each task is passed through
    /// `runner` and the result is sent to `results`; if every receiver is
    /// gone the worker exits.
    pub fn new<R, F>(num_threads: usize, runner: F, results: Sender<R>) -> WorkerPool<T>
    where
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                stop: false,
            }),
            available: Condvar::new(),
        });
        let runner = Arc::new(runner);

        let workers = (0..num_threads.max(1))
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let runner = Arc::clone(&runner);
                let results = results.clone();
                std::thread::spawn(move || {
                    loop {
                        let task = {
                            let mut queue = shared.queue.lock().expect("worker queue poisoned");
                            loop {
                                if let Some(task) = queue.tasks.pop_front() {
                                    break task;
                                }
                                if queue.stop {
                                    trace!(worker, "worker exiting");
                                    return;
                                }
                                queue = shared
                                    .available
                                    .wait(queue)
                                    .expect("worker queue poisoned");
                            }
                        };
                        if results.send(runner(task)).is_err() {
                            return;
                        }
                    }
                })
            })
            .collect();

        WorkerPool { shared, workers }
    }
}

impl<T> WorkerPool<T> {
    /// Enqueue one task. Blocks only on the queue mutex.
    pub fn submit(&self, task: T) {
        let mut queue = self.shared.queue.lock().expect("worker queue poisoned");
        queue.tasks.push_back(task);
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Signal stop and wait for every worker to drain the queue and exit.
    pub fn join(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect("worker queue poisoned");
            queue.stop = true;
        }
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.join();
    }
}
