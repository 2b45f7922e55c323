//! Buffer pool (spec component E): a fixed collection of reusable scratch buffers.
//!
//! Mirrors the reference design's mutex-guarded deque of free indices: buffers
//! are obtained by a front-pop and returned by a back-push, so the pool's
//! reuse order roughly follows FIFO recency rather than always handing back
//! the same hot buffer.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

struct Inner {
    capacity: usize,
    free: Mutex<VecDeque<usize>>,
    slots: Mutex<Vec<Option<Vec<u8>>>>,
}

/// A fixed pool of `num_buffers` byte buffers of `buffer_size` bytes each.
///
/// Cheap to clone: internally reference-counted, so every hash worker thread
/// can hold its own handle to the same underlying pool.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

/// An acquired buffer. Returns its slot to the pool's free list on drop.
pub struct BufferHandle {
    inner: Arc<Inner>,
    index: usize,
    buf: Option<Vec<u8>>,
}

impl BufferPool {
    /// Allocate `num_buffers` buffers, each `buffer_size` bytes.
    #[must_use]
    pub fn new(num_buffers: usize, buffer_size: usize) -> Self {
        assert!(num_buffers > 0, "buffer pool must hold at least one buffer");
        assert!(buffer_size > 0, "buffer size must be non-zero");

        let slots = (0..num_buffers).map(|_| Some(vec![0u8; buffer_size])).collect();
        let free = (0..num_buffers).collect();
        Self {
            inner: Arc::new(Inner {
                capacity: num_buffers,
                free: Mutex::new(free),
                slots: Mutex::new(slots),
            }),
        }
    }

    /// Number of buffers in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of buffers currently free.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Acquire a free buffer, blocking with a short spin-sleep if none is free.
    ///
    /// `max_threads <= num_buffers` is enforced at configuration load time
    /// (§4.E), so in practice this never blocks for long: a worker always
    /// returns its buffer well before the next one is needed.
    #[must_use]
    pub fn acquire(&self) -> BufferHandle {
        loop {
            let popped = self.inner.free.lock().pop_front();
            if let Some(index) = popped {
                let buf = self.inner.slots.lock()[index]
                    .take()
                    .expect("free index must own an unborrowed buffer");
                return BufferHandle {
                    inner: Arc::clone(&self.inner),
                    index,
                    buf: Some(buf),
                };
            }
            std::thread::yield_now();
        }
    }
}

impl BufferHandle {
    /// The scratch buffer itself, for the hash primitive (D) to read into.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf
            .as_mut()
            .expect("buffer present for lifetime of handle")
            .as_mut_slice()
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.inner.slots.lock()[self.index] = Some(buf);
            self.inner.free.lock().push_back(self.index);
        }
    }
}
