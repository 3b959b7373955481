//! Buffer pool for reusing allocations between producer and consumer.
//!
//! A producer acquires a [`VecBuffer`], encodes messages into it and hands
//! it off. Once the consumer is done with it the buffer is released back
//! into the pool, cleared, and handed out again on the next acquire. The
//! allocation survives the round trip.
//!
//! # Design
//!
//! - Released buffers are cleared before they become idle
//! - At most `max_idle` buffers are kept; extra releases are dropped
//! - Idle buffers are reused last-in first-out (the warmest allocation
//!   first) unless [`RecycleOrder::Fifo`] is configured
//! - [`BufferQueue`] keeps in-flight buffers in production order, each with
//!   a piece of user data, and recycles them from the front
//!
//! # Usage
//!
//! ```
//! use structwire::buffer::BufferPool;
//!
//! let mut pool = BufferPool::new();
//! let mut buf = pool.acquire();
//! structwire::encode(&mut buf, &42u32).unwrap();
//! pool.release(buf);
//!
//! let reused = pool.acquire();
//! assert!(reused.is_empty());
//! ```

use std::collections::VecDeque;

use super::vec_buffer::{TrimPolicy, VecBuffer};

/// Default number of idle buffers kept by a pool.
pub const DEFAULT_MAX_IDLE_BUFFERS: usize = 16;

/// Default capacity of freshly allocated pool buffers (8 KB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Order in which idle buffers are handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecycleOrder {
    /// Most recently released first.
    #[default]
    Lifo,
    /// Least recently released first.
    Fifo,
}

/// Configuration for a [`BufferPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle buffers retained.
    pub max_idle: usize,
    /// Capacity of newly allocated buffers.
    pub buffer_capacity: usize,
    /// Trim policy applied to newly allocated buffers.
    pub trim_policy: TrimPolicy,
    /// Reuse order of idle buffers.
    pub recycle_order: RecycleOrder,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE_BUFFERS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            trim_policy: TrimPolicy::default(),
            recycle_order: RecycleOrder::default(),
        }
    }
}

impl PoolConfig {
    /// Set the maximum number of idle buffers.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set the capacity of newly allocated buffers.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the trim policy of newly allocated buffers.
    pub fn with_trim_policy(mut self, policy: TrimPolicy) -> Self {
        self.trim_policy = policy;
        self
    }

    /// Set the reuse order of idle buffers.
    pub fn with_recycle_order(mut self, order: RecycleOrder) -> Self {
        self.recycle_order = order;
        self
    }
}

/// A pool of recyclable [`VecBuffer`]s.
///
/// Not synchronized; give each thread its own pool or wrap it in a lock.
#[derive(Debug, Default)]
pub struct BufferPool {
    idle: VecDeque<VecBuffer>,
    /// Buffers handed out and not yet released.
    outstanding: usize,
    config: PoolConfig,
}

impl BufferPool {
    /// Create a pool with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with custom settings.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            idle: VecDeque::with_capacity(config.max_idle),
            outstanding: 0,
            config,
        }
    }

    /// Take a buffer, reusing an idle one when possible.
    pub fn acquire(&mut self) -> VecBuffer {
        self.outstanding += 1;
        let recycled = match self.config.recycle_order {
            RecycleOrder::Lifo => self.idle.pop_back(),
            RecycleOrder::Fifo => self.idle.pop_front(),
        };
        match recycled {
            Some(buffer) => buffer,
            None => VecBuffer::with_capacity(self.config.buffer_capacity)
                .trim_policy(self.config.trim_policy),
        }
    }

    /// Return a buffer to the pool.
    ///
    /// The buffer is cleared. If the pool already holds `max_idle` buffers
    /// it is dropped instead.
    pub fn release(&mut self, mut buffer: VecBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.idle.len() >= self.config.max_idle {
            tracing::trace!("Buffer pool full, dropping released buffer");
            return;
        }
        buffer.clear();
        self.idle.push_back(buffer);
    }

    /// Number of idle buffers ready for reuse.
    #[inline]
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of acquired buffers not yet released.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Drop all idle buffers.
    pub fn shrink(&mut self) {
        self.idle.clear();
    }
}

/// In-flight buffers in production order, backed by a [`BufferPool`].
///
/// The producer fills buffers at the back, the consumer drains them from
/// the front. Each buffer carries a `U` chosen by the producer, such as a
/// sequence number or a destination.
#[derive(Debug)]
pub struct BufferQueue<U = ()> {
    active: VecDeque<(VecBuffer, U)>,
    pool: BufferPool,
}

impl<U> Default for BufferQueue<U> {
    fn default() -> Self {
        Self::with_pool(BufferPool::new())
    }
}

impl<U> BufferQueue<U> {
    /// Create a queue over a default pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that recycles through `pool`.
    pub fn with_pool(pool: BufferPool) -> Self {
        Self {
            active: VecDeque::new(),
            pool,
        }
    }

    /// Append a fresh buffer tagged with `data` and return it for filling.
    pub fn obtain_back(&mut self, data: U) -> &mut VecBuffer {
        let buffer = self.pool.acquire();
        self.active.push_back((buffer, data));
        let last = self.active.len() - 1;
        &mut self.active[last].0
    }

    /// Oldest in-flight buffer and its data.
    pub fn front(&self) -> Option<(&VecBuffer, &U)> {
        self.active.front().map(|(buffer, data)| (buffer, data))
    }

    /// Oldest in-flight buffer and its data, mutably.
    pub fn front_mut(&mut self) -> Option<(&mut VecBuffer, &mut U)> {
        self.active.front_mut().map(|(buffer, data)| (buffer, data))
    }

    /// Hand the oldest buffer back to the pool and return its data.
    pub fn recycle_front(&mut self) -> Option<U> {
        let (buffer, data) = self.active.pop_front()?;
        self.pool.release(buffer);
        Some(data)
    }

    /// Number of in-flight buffers.
    #[inline]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// True when no buffer is in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The pool buffers are recycled through.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{WireRead, WireWrite};

    #[test]
    fn test_pool_creation() {
        let pool = BufferPool::new();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_acquire_allocates_with_configured_capacity() {
        let mut pool = BufferPool::with_config(PoolConfig::default().with_buffer_capacity(1024));
        let buf = pool.acquire();

        assert!(buf.capacity() >= 1024);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn test_release_clears_and_reuses() {
        let mut pool = BufferPool::new();

        let mut buf = pool.acquire();
        buf.write_bytes(b"leftover").unwrap();
        buf.read_u8().unwrap();
        pool.release(buf);

        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.outstanding(), 0);

        let reused = pool.acquire();
        assert!(reused.is_empty());
        assert_eq!(reused.consumed_bytes(), 0);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_max_idle_is_respected() {
        let mut pool = BufferPool::with_config(PoolConfig::default().with_max_idle(2));

        let buffers: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        assert_eq!(pool.outstanding(), 4);

        for buf in buffers {
            pool.release(buf);
        }

        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_trim_policy_applied() {
        let config = PoolConfig::default().with_trim_policy(TrimPolicy::Always);
        let mut pool = BufferPool::with_config(config);

        let buf = pool.acquire();
        assert_eq!(buf.policy(), TrimPolicy::Always);
    }

    #[test]
    fn test_shrink() {
        let mut pool = BufferPool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle_count(), 2);

        pool.shrink();
        assert_eq!(pool.idle_count(), 0);
    }

    /// Release three buffers and return the order they come back in.
    fn reuse_order(order: RecycleOrder) -> Vec<usize> {
        let mut pool = BufferPool::with_config(PoolConfig::default().with_recycle_order(order));
        let mut starts = Vec::new();
        let buffers: Vec<_> = (0..3)
            .map(|_| {
                let mut buf = pool.acquire();
                buf.write_u8(0).unwrap();
                starts.push(buf.unread().as_ptr());
                buf
            })
            .collect();
        for buf in buffers {
            pool.release(buf);
        }

        (0..3)
            .map(|_| {
                let mut buf = pool.acquire();
                buf.write_u8(0).unwrap();
                let start = buf.unread().as_ptr();
                starts.iter().position(|s| *s == start).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_recycle_order() {
        assert_eq!(reuse_order(RecycleOrder::Lifo), [2, 1, 0]);
        assert_eq!(reuse_order(RecycleOrder::Fifo), [0, 1, 2]);
    }

    #[test]
    fn test_queue_keeps_production_order() {
        let mut queue = BufferQueue::<u32>::new();
        queue.obtain_back(7).write_bytes(b"first").unwrap();
        queue.obtain_back(8).write_bytes(b"second").unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pool().outstanding(), 2);

        let (buf, seq) = queue.front().unwrap();
        assert_eq!(buf.unread(), b"first");
        assert_eq!(*seq, 7);

        assert_eq!(queue.recycle_front(), Some(7));
        assert_eq!(queue.pool().idle_count(), 1);

        let (buf, seq) = queue.front_mut().unwrap();
        *seq += 1;
        assert_eq!(buf.read_u8().unwrap(), b's');
        assert_eq!(queue.recycle_front(), Some(9));

        assert!(queue.is_empty());
        assert_eq!(queue.recycle_front(), None);
        assert_eq!(queue.pool().outstanding(), 0);
    }

    #[test]
    fn test_queue_reuses_recycled_buffers() {
        let mut queue = BufferQueue::with_pool(BufferPool::with_config(
            PoolConfig::default().with_buffer_capacity(64),
        ));
        queue.obtain_back(()).write_bytes(&[1; 32]).unwrap();
        queue.recycle_front();

        let buf = queue.obtain_back(());
        assert!(buf.is_empty());
        assert_eq!(queue.pool().idle_count(), 0);
    }
}
