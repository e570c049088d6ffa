//! Bounded, thread-safe FIFO of owned packets (spec.md §4.2).
//!
//! Despite the single-producer/single-consumer contract the background
//! pump and foreground loop actually exercise, the queue is built to the
//! stronger multi-producer/multi-consumer contract spec.md §4.2 asks for:
//! a `Mutex` around a `VecDeque` plus a `Condvar` signalled on push.
//! Consumers must not rely on the signal firing (spec.md §4.2) — `pop`
//! never blocks, it just returns `None` when empty.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Default capacity, matching the ≥8192 slot requirement of spec.md §3.
pub const DEFAULT_CAPACITY: usize = 8192;

pub struct PacketQueue {
    inner: Mutex<VecDeque<Vec<u8>>>,
    not_empty: Condvar,
    capacity: usize,
}

impl PacketQueue {
    pub fn new(capacity: usize) -> Self {
        PacketQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Copies `bytes` into a freshly owned packet and enqueues it. One
    /// slot is always held back to disambiguate full from empty (spec.md
    /// §3's `(rear+1) mod N ≠ front` producer gate), so a full queue
    /// reports `size() == capacity - 1`, not `capacity`. Once genuinely
    /// full the packet is silently dropped, per spec.md §4.2 — callers
    /// (the SLIP framer's callback) have no way to observe the drop other
    /// than via [`PacketQueue::size`].
    pub fn push(&self, bytes: &[u8]) {
        let mut guard = self.inner.lock().unwrap();
        if guard.len() < self.capacity - 1 {
            guard.push_back(bytes.to_vec());
            self.not_empty.notify_one();
        }
    }

    /// Pops the oldest packet, or `None` if the queue is empty. Never
    /// blocks.
    pub fn pop(&self) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Current number of queued packets.
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Releases every pending allocation. Packets are plain `Vec<u8>`, so
    /// this is just a clear — `Drop` already guarantees no leak on normal
    /// teardown, this method exists to match the explicit lifecycle of
    /// spec.md §4.2 and to give [`crate::transport::SerialTransport::close`]
    /// an obvious place to call from.
    pub fn destroy(&self) {
        self.inner.lock().unwrap().clear();
    }
}
