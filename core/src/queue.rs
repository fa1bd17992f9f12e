//! `BoundedQueue<T>` (§4.2): a fixed-capacity FIFO used both as the
//! server's ingress queue and as each connection's outgoing queue.
//!
//! The teacher's own low-level collection crate (`unsafe_collection::
//! bound_queue`) implements a ring buffer over raw slots with unsafe
//! get/read/write primitives. This queue keeps that ring-buffer shape
//! (fixed capacity, FIFO, `push_back`/`pop_front`) but backs it with a
//! safe `VecDeque` guarded by a `Mutex`/`Condvar`, since the spec's worker
//! threads need to block on an empty queue rather than spin (§9, open
//! question: "prefer a blocking dequeue").

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert_ne!(capacity, 0, "BoundedQueue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueue `item` if there is room. Never blocks; returns `false` when
    /// full or closed, in which case `item` is dropped by the caller.
    pub fn try_enqueue(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed || inner.items.len() >= inner.capacity {
            return false;
        }
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    /// Dequeue the oldest item, waiting up to `timeout` (or forever if
    /// `None`) for one to become available. Returns `None` on expiry or
    /// once the queue has been closed and drained.
    pub fn try_dequeue(&self, timeout: Option<Duration>) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = match deadline {
                None => self.not_empty.wait(inner).unwrap(),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    let (guard, result) = self.not_empty.wait_timeout(inner, remaining).unwrap();
                    if result.timed_out() && guard.items.is_empty() {
                        return None;
                    }
                    guard
                }
            };
        }
    }

    /// Approximate current depth, for stats reporting.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    /// Wake all blocked consumers; subsequent dequeues drain whatever is
    /// left, then return `None` forever.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_enqueue_respects_capacity() {
        let q = BoundedQueue::new(2);
        assert!(q.try_enqueue(1));
        assert!(q.try_enqueue(2));
        assert!(!q.try_enqueue(3));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn fifo_order_preserved() {
        let q = BoundedQueue::new(4);
        q.try_enqueue("a");
        q.try_enqueue("b");
        q.try_enqueue("c");
        assert_eq!(q.try_dequeue(None), Some("a"));
        assert_eq!(q.try_dequeue(None), Some("b"));
        assert_eq!(q.try_dequeue(None), Some("c"));
    }

    #[test]
    fn try_dequeue_times_out_on_empty_queue() {
        let q: BoundedQueue<i32> = BoundedQueue::new(1);
        let start = Instant::now();
        assert_eq!(q.try_dequeue(Some(Duration::from_millis(50))), None);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let q = Arc::new(BoundedQueue::<i32>::new(1));
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.try_dequeue(Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn closed_queue_still_drains_existing_items() {
        let q = BoundedQueue::new(2);
        q.try_enqueue(1);
        q.close();
        assert_eq!(q.try_dequeue(None), Some(1));
        assert_eq!(q.try_dequeue(None), None);
        assert!(!q.try_enqueue(2));
    }
}
