//! Bounded-or-unbounded FIFO handing jobs from listener to worker threads.
//!
//! A mutex-guarded `VecDeque` with a not-empty condvar; `pop` blocks until an
//! item is available and delivers each item to exactly one caller, in push
//! order. With a capacity set, `push` blocks on a second not-full condvar,
//! giving listeners backpressure instead of unbounded queue growth.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Thread-safe FIFO with blocking pop.
pub struct JobQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    /// `None` means unbounded.
    capacity: Option<usize>,
}

impl<T> JobQueue<T> {
    /// Create a queue. `capacity = None` never blocks producers.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Append an item and wake one waiting consumer.
    ///
    /// Blocks while the queue is at capacity (bounded queues only).
    pub fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        if let Some(cap) = self.capacity {
            while items.len() >= cap {
                items = self.not_full.wait(items).unwrap();
            }
        }
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Block until an item is available, then take exactly one.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock().unwrap();
        loop {
            match items.pop_front() {
                Some(item) => {
                    if self.capacity.is_some() {
                        self.not_full.notify_one();
                    }
                    return item;
                }
                None => items = self.not_empty.wait(items).unwrap(),
            }
        }
    }

    /// Number of queued items (test hook).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}
