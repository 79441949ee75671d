//! # Buffer Pool
//!
//! Object pool for the small byte buffers the codec allocates constantly:
//! outbound packet frames and per-connection read chunks.
//!
//! Rents are capacity-bucketed: an explicit capacity request is rounded up to
//! the next power of two (1 KB minimum) so repeated rent/return cycles with
//! slightly different sizes converge on a few reusable buckets instead of
//! fragmenting the free list.
//!
//! ## Usage
//! ```rust,no_run
//! use shardnet::utils::buffer_pool::BufferPool;
//!
//! let pool = BufferPool::new(100); // 100 buffers in pool
//! let mut buffer = pool.acquire();
//! // Use buffer...
//! // Buffer automatically returned to pool on drop
//! ```

use std::sync::{Arc, Mutex};

/// Buffers above this capacity are dropped instead of pooled (64 KB)
const MAX_POOLED_BUFFER_SIZE: usize = 64 * 1024;

/// Smallest bucket handed out for any rent
const MIN_BUCKET_CAPACITY: usize = 1024;

/// A pooled buffer that returns itself to the pool when dropped
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Get the underlying buffer, consuming this wrapper. The storage leaves
    /// the pool's custody for good.
    pub fn into_inner(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if !self.buffer.is_empty() || self.buffer.capacity() > 0 {
            self.pool.release(std::mem::take(&mut self.buffer));
        }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

/// Thread-safe buffer pool with bucketed capacities
#[derive(Debug)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Create a new pool pre-seeded with `pool_size` minimum-bucket buffers
    pub fn new(pool_size: usize) -> Self {
        let mut free = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            free.push(Vec::with_capacity(MIN_BUCKET_CAPACITY));
        }

        Self {
            free: Arc::new(Mutex::new(free)),
        }
    }

    /// Round a requested capacity up to its bucket size
    fn bucket(capacity: usize) -> usize {
        capacity.max(MIN_BUCKET_CAPACITY).next_power_of_two()
    }

    /// Rent a raw buffer with at least `capacity` bytes of storage. The
    /// caller (normally a `PacketWriter`) is responsible for pairing this
    /// with [`release`](BufferPool::release) or taking ownership outright.
    pub fn take(&self, capacity: usize) -> Vec<u8> {
        let wanted = Self::bucket(capacity);

        if let Ok(mut free) = self.free.lock() {
            if let Some(idx) = free.iter().position(|b| b.capacity() >= wanted) {
                return free.swap_remove(idx);
            }
        }

        Vec::with_capacity(wanted)
    }

    /// Return a rented buffer. Oversized buffers are dropped so one huge
    /// frame cannot pin its allocation forever.
    pub fn release(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() == 0 || buffer.capacity() > MAX_POOLED_BUFFER_SIZE {
            return;
        }
        buffer.clear();
        if let Ok(mut free) = self.free.lock() {
            free.push(buffer);
        }
    }

    /// Acquire a self-returning buffer wrapper
    pub fn acquire(&self) -> PooledBuffer {
        self.acquire_with_capacity(MIN_BUCKET_CAPACITY)
    }

    /// Acquire a self-returning buffer with at least `capacity` bytes
    pub fn acquire_with_capacity(&self, capacity: usize) -> PooledBuffer {
        PooledBuffer {
            buffer: self.take(capacity),
            pool: self.clone(),
        }
    }

    /// Get the current number of available buffers in the pool
    pub fn available(&self) -> usize {
        self.free.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Clone for BufferPool {
    fn clone(&self) -> Self {
        Self {
            free: self.free.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_basic() {
        let pool = BufferPool::new(10);
        assert_eq!(pool.available(), 10);

        let mut buf = pool.acquire();
        assert_eq!(pool.available(), 9);

        buf.push(42);
        assert_eq!(buf[0], 42);

        drop(buf);
        assert_eq!(pool.available(), 10);
    }

    #[test]
    fn test_buffer_pool_reuse_clears_contents() {
        let pool = BufferPool::new(1);

        {
            let mut buf1 = pool.acquire();
            buf1.extend_from_slice(b"test");
            assert_eq!(buf1.len(), 4);
        }

        let buf2 = pool.acquire();
        assert_eq!(buf2.len(), 0);
        assert!(buf2.capacity() >= 4);
    }

    #[test]
    fn test_rent_rounds_up_to_bucket() {
        let pool = BufferPool::new(0);
        let buf = pool.take(1500);
        assert_eq!(buf.capacity(), 2048);

        let small = pool.take(10);
        assert_eq!(small.capacity(), MIN_BUCKET_CAPACITY);
    }

    #[test]
    fn test_into_inner_detaches_from_pool() {
        let pool = BufferPool::new(1);
        let buf = pool.acquire();
        assert_eq!(pool.available(), 0);

        let raw = buf.into_inner();
        drop(raw);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_oversized_buffer_not_pooled() {
        let pool = BufferPool::new(0);
        pool.release(Vec::with_capacity(MAX_POOLED_BUFFER_SIZE + 1));
        assert_eq!(pool.available(), 0);
    }
}
