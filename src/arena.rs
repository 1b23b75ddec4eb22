use std::sync::Arc;

use crate::buffer_pool::ArenaPool;

/// A non-owning `(offset, len)` handle into an [`Arena`].
///
/// A view only means something against the arena that handed it out, and only
/// while that arena is alive. It is never allocated or copied on its own.
///
/// SQL NULL is the distinguished zero-length view [`ByteView::NULL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteView {
    offset: usize,
    len: usize,
}

impl ByteView {
    pub const NULL: Self = Self {
        offset: usize::MAX,
        len: 0,
    };

    pub(crate) fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_null(&self) -> bool {
        self.offset == usize::MAX
    }

    /// The view covering `len` bytes starting `start` bytes into this one
    pub(crate) fn slice(&self, start: usize, len: usize) -> Self {
        debug_assert!(start + len <= self.len);
        Self::new(self.offset + start, len)
    }
}

/// A fixed-capacity byte store with sequential allocation only.
///
/// Regions handed out by [`Arena::allocate`] never overlap and are never
/// reused; the whole store is released at once when the arena is dropped.
/// `allocated() + remaining() == capacity()` always holds.
#[derive(Debug)]
pub struct Arena {
    buffer: Vec<u8>,
    allocated: usize,
    pool: Option<Arc<ArenaPool>>,
}

impl Arena {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            allocated: 0,
            pool: None,
        }
    }

    /// An arena whose storage comes from (and returns to) `pool`
    pub fn pooled(pool: &Arc<ArenaPool>, capacity: usize) -> Self {
        Self {
            buffer: pool.get(capacity),
            allocated: 0,
            pool: Some(Arc::clone(pool)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.allocated
    }

    /// Hand out the next `n` unused bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n > self.remaining()`. Callers check capacity first.
    pub fn allocate(&mut self, n: usize) -> ByteView {
        assert!(
            n <= self.remaining(),
            "arena allocation of {n} bytes exceeds the {} remaining",
            self.remaining()
        );
        let view = ByteView::new(self.allocated, n);
        self.allocated += n;
        view
    }

    /// Resolve a view. NULL resolves to an empty slice.
    pub fn get(&self, view: ByteView) -> &[u8] {
        if view.is_null() {
            return &[];
        }
        &self.buffer[view.offset..view.offset + view.len]
    }

    pub fn get_mut(&mut self, view: ByteView) -> &mut [u8] {
        if view.is_null() {
            return &mut [];
        }
        &mut self.buffer[view.offset..view.offset + view.len]
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(std::mem::take(&mut self.buffer));
        }
    }
}
