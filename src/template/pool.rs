//! Reusable render buffers.
//!
//! # Responsibilities
//! - Hand out byte buffers for template rendering
//! - Take them back when the guard drops, on success and error paths alike
//!
//! # Design Decisions
//! - Bounded free-list behind a `Mutex`; lock held only for push/pop
//! - Oversized buffers are dropped instead of retained
//! - Exhaustion never blocks: an empty free-list allocates a fresh buffer

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Initial capacity of freshly allocated buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Buffers grown beyond this are not returned to the pool.
pub const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// A free-list of byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
}

impl BufferPool {
    /// Create a pool that keeps at most `max_idle` buffers around.
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Take a cleared buffer from the pool.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DEFAULT_BUFFER_CAPACITY));
        PooledBuffer { buffer, pool: self }
    }

    /// Number of buffers currently waiting in the free-list.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buffer.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_idle {
            free.push(buffer);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(64)
    }
}

/// A buffer on loan from a `BufferPool`. Returned on drop.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    buffer: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}
