use std::sync::{Arc, LazyLock};

use crossbeam_queue::ArrayQueue;

const POOL_CAPACITY: usize = 16;
/// Buffers with more capacity than this are freed instead of parked
const MAX_POOLED_BUFFER_LEN: usize = 64 << 20;

pub static GLOBAL_ARENA_POOL: LazyLock<Arc<ArenaPool>> =
    LazyLock::new(|| Arc::new(ArenaPool::default()));

/// A bounded set of reusable arena buffers.
///
/// A pooled `Arena` takes its storage from here and gives it back when dropped,
/// so a stream of equally sized blocks stops hitting the allocator after the
/// first few blocks.
#[derive(Debug)]
pub struct ArenaPool {
    buffers: ArrayQueue<Vec<u8>>,
    max_buffer_len: usize,
}

impl ArenaPool {
    pub fn new(capacity: usize) -> Self {
        Self::with_max_buffer_len(capacity, MAX_POOLED_BUFFER_LEN)
    }

    /// A pool of `capacity` buffers that refuses buffers larger than `max_buffer_len`.
    pub fn with_max_buffer_len(capacity: usize, max_buffer_len: usize) -> Self {
        Self {
            buffers: ArrayQueue::new(capacity),
            max_buffer_len,
        }
    }

    /// Take a zeroed buffer of exactly `len` bytes.
    pub fn get(&self, len: usize) -> Vec<u8> {
        let mut buffer = self.buffers.pop().unwrap_or_default();
        buffer.resize(len, 0);
        buffer
    }

    pub fn put(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > self.max_buffer_len {
            return;
        }
        // Clear buffer but preserve capacity
        buffer.clear();
        // Ignore if pool is full
        let _ = self.buffers.push(buffer);
    }

    /// Number of buffers currently parked in the pool
    pub fn idle(&self) -> usize {
        self.buffers.len()
    }
}

impl Default for ArenaPool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}
