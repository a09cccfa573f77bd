use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};

/// Per-thread pool of id buffers used as scratch space by the match operators.
///
/// Buffers are handed out wrapped in a [`PooledBuffer`] that gives them back on
/// drop, so scratch space is released on early returns and error paths alike.
pub struct BufferPool {
    pools: HashMap<usize, BufferQueue>,
}

struct BufferQueue {
    buffers: VecDeque<Vec<u64>>,
}

const MAX_BUFFERS_PER_CLASS: usize = 16;
const MIN_SIZE_CLASS: usize = 64;

thread_local! {
    static POOL: RefCell<BufferPool> = RefCell::new(BufferPool::new());
}

impl BufferPool {
    fn new() -> Self {
        BufferPool { pools: HashMap::new() }
    }

    fn size_class(size: usize) -> usize {
        size.max(MIN_SIZE_CLASS).next_power_of_two()
    }

    fn take(&mut self, size: usize) -> Vec<u64> {
        let size_class = Self::size_class(size);
        if let Some(queue) = self.pools.get_mut(&size_class) {
            if let Some(mut buf) = queue.buffers.pop_front() {
                buf.clear();
                buf.resize(size, 0);
                return buf;
            }
        }
        let mut buf = Vec::with_capacity(size_class);
        buf.resize(size, 0);
        buf
    }

    fn give_back(&mut self, buf: Vec<u64>) {
        let size_class = Self::size_class(buf.capacity());
        if size_class != buf.capacity() {
            return;
        }
        let queue = self
            .pools
            .entry(size_class)
            .or_insert_with(|| BufferQueue { buffers: VecDeque::new() });
        if queue.buffers.len() < MAX_BUFFERS_PER_CLASS {
            queue.buffers.push_back(buf);
        }
    }

    /// Zero-filled scratch buffer of exactly `size` elements.
    pub fn get(size: usize) -> PooledBuffer {
        let buf = POOL.with(|pool| pool.borrow_mut().take(size));
        PooledBuffer { buf }
    }

    /// Scratch buffer initialised with a copy of `values`.
    pub fn copy_of(values: &[u64]) -> PooledBuffer {
        let mut pooled = Self::get(values.len());
        pooled.copy_from_slice(values);
        pooled
    }

    #[cfg(test)]
    fn pooled_count(size: usize) -> usize {
        POOL.with(|pool| {
            pool.borrow()
                .pools
                .get(&Self::size_class(size))
                .map(|q| q.buffers.len())
                .unwrap_or(0)
        })
    }
}

pub struct PooledBuffer {
    buf: Vec<u64>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u64>;

    fn deref(&self) -> &Vec<u64> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u64> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        // try_with: the thread-local may already be gone during thread teardown
        let _ = POOL.try_with(|pool| {
            if let Ok(mut pool) = pool.try_borrow_mut() {
                pool.give_back(buf);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_return_to_the_pool_on_drop() {
        let before = BufferPool::pooled_count(1000);
        {
            let mut buf = BufferPool::get(1000);
            assert_eq!(buf.len(), 1000);
            buf[0] = 7;
        }
        assert_eq!(BufferPool::pooled_count(1000), before.max(1));

        let buf = BufferPool::get(1000);
        assert_eq!(buf[0], 0, "recycled buffers are zeroed");
    }

    #[test]
    fn released_on_error_paths() {
        fn failing() -> Result<(), ()> {
            let _scratch = BufferPool::get(300);
            Err(())
        }
        let before = BufferPool::pooled_count(300);
        assert!(failing().is_err());
        assert_eq!(BufferPool::pooled_count(300), before.max(1));
    }
}
