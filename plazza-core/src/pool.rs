//! Cook Thread Pool
//!
//! Fixed-size pool backing the cooks of one kitchen: a shared task FIFO
//! guarded by a mutex, a condition variable for wake-up, and join-on-stop
//! shutdown. No stealing, no priorities.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use tracing::warn;

type CookTask = Box<dyn FnOnce() + Send + 'static>;

pub struct CookPool {
    inner: Arc<PoolInner>,
    cooks: Vec<thread::JoinHandle<()>>,
}

struct PoolInner {
    state: Mutex<PoolState>,
    wakeup: Condvar,
}

struct PoolState {
    tasks: VecDeque<CookTask>,
    shutdown: bool,
}

impl CookPool {
    pub fn new(size: u32) -> Self {
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let cooks = (0..size)
            .map(|i| {
                let inner = Arc::clone(&inner);
                thread::Builder::new()
                    .name(format!("cook-{i}"))
                    .spawn(move || cook_loop(&inner))
                    .expect("cook thread spawn")
            })
            .collect();

        Self { inner, cooks }
    }

    /// Append a task and wake one idle cook.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state.lock().unwrap();
        state.tasks.push_back(Box::new(task));
        self.inner.wakeup.notify_one();
    }

    /// Tasks queued but not yet picked up.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().unwrap().tasks.len()
    }

    pub fn size(&self) -> usize {
        self.cooks.len()
    }

    /// Flag shutdown, wake everyone, and join. Cooks drain the remaining
    /// FIFO before exiting. Idempotent.
    pub fn stop(&mut self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.shutdown = true;
        }
        self.inner.wakeup.notify_all();
        for cook in self.cooks.drain(..) {
            let _ = cook.join();
        }
    }
}

impl Drop for CookPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn cook_loop(inner: &PoolInner) {
    loop {
        let task = {
            let mut state = inner.state.lock().unwrap();
            while !state.shutdown && state.tasks.is_empty() {
                state = inner.wakeup.wait(state).unwrap();
            }
            if state.shutdown && state.tasks.is_empty() {
                return;
            }
            state.tasks.pop_front()
        };

        // Run outside the lock; a panicking task must not take the pool down.
        if let Some(task) = task {
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                warn!("cook task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn executes_every_task() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut pool = CookPool::new(2);
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn concurrency_is_bounded_by_pool_size() {
        let running = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));
        let mut pool = CookPool::new(2);

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.execute(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.stop();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_drains_the_queue() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut pool = CookPool::new(1);
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                thread::sleep(Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut pool = CookPool::new(2);
        pool.stop();
        pool.stop();
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn a_panicking_task_does_not_kill_the_pool() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut pool = CookPool::new(1);

        pool.execute(|| panic!("burnt pizza"));
        let after = Arc::clone(&counter);
        pool.execute(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });

        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
