use super::{Buffer, BufferError, Offer};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// Consecutive "full" misses per buffer before a put tries to grow the pool
const GROW_PATIENCE: u32 = 5;

/// Consecutive "empty" misses per buffer before a get tries to shrink the pool
const SHRINK_PATIENCE: u32 = 10;

/// How often a waiting get rescans an empty pool
const EMPTY_RESCAN_INTERVAL: Duration = Duration::from_millis(20);

/// Elastic pool of fixed-capacity buffers
///
/// `put` blocks while every buffer is full and the pool is at its maximum
/// size; `get` blocks while every buffer is empty. Both fail with
/// [`BufferError::ClosedPool`] once [`Pool::close`] was called.
///
/// # Example
///
/// ```no_run
/// use webcrawler::buffer::Pool;
///
/// # async fn demo() -> Result<(), webcrawler::buffer::BufferError> {
/// let pool = Pool::new(10, 2)?;
/// pool.put("hello").await?;
/// assert_eq!(pool.get().await?, "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pool<T> {
    buffer_cap: u32,
    max_buffer_number: u32,
    buffer_number: AtomicU32,
    total: AtomicU64,
    /// Read side for put/get, write side for grow/shrink/close
    buffers: RwLock<Vec<Buffer<T>>>,
    cursor: AtomicUsize,
    closed: AtomicBool,
    data_ready: Notify,
    space_ready: Notify,
}

impl<T> Pool<T> {
    /// Creates a pool holding one buffer
    ///
    /// # Arguments
    ///
    /// * `buffer_cap` - Capacity of every buffer
    /// * `max_buffer_number` - Upper bound on the number of buffers
    ///
    /// # Returns
    ///
    /// * `Ok(Pool)` - The new pool
    /// * `Err(BufferError::IllegalParameter)` - Either argument is zero
    pub fn new(buffer_cap: u32, max_buffer_number: u32) -> Result<Self, BufferError> {
        if buffer_cap == 0 {
            return Err(BufferError::IllegalParameter(
                "zero buffer capacity".to_string(),
            ));
        }
        if max_buffer_number == 0 {
            return Err(BufferError::IllegalParameter(
                "zero max buffer number".to_string(),
            ));
        }
        let first = Buffer::new(buffer_cap)?;
        Ok(Self {
            buffer_cap,
            max_buffer_number,
            buffer_number: AtomicU32::new(1),
            total: AtomicU64::new(0),
            buffers: RwLock::new(vec![first]),
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            data_ready: Notify::new(),
            space_ready: Notify::new(),
        })
    }

    pub fn buffer_cap(&self) -> u32 {
        self.buffer_cap
    }

    pub fn max_buffer_number(&self) -> u32 {
        self.max_buffer_number
    }

    pub fn buffer_number(&self) -> u32 {
        self.buffer_number.load(Ordering::Acquire)
    }

    /// Number of data currently held
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stores a datum, waiting for room if necessary
    pub async fn put(&self, datum: T) -> Result<(), BufferError> {
        let mut datum = datum;
        let mut misses = 0u32;
        loop {
            let space_ready = self.space_ready.notified();
            tokio::pin!(space_ready);
            space_ready.as_mut().enable();

            datum = match self.try_put(datum, &mut misses)? {
                Offer::Accepted => {
                    self.data_ready.notify_one();
                    return Ok(());
                }
                Offer::Rejected(datum) => datum,
            };

            if self.buffer_number() < self.max_buffer_number {
                // Keep probing so the misses add up to a growth
                tokio::task::yield_now().await;
            } else {
                space_ready.await;
            }
        }
    }

    /// Takes a datum, waiting for one if necessary
    pub async fn get(&self) -> Result<T, BufferError> {
        let mut misses = 0u32;
        loop {
            let data_ready = self.data_ready.notified();
            tokio::pin!(data_ready);
            data_ready.as_mut().enable();

            if let Some(datum) = self.try_get(&mut misses)? {
                self.space_ready.notify_one();
                return Ok(datum);
            }

            // Timing out is fine; the rescan counts towards shrinking
            let _ = tokio::time::timeout(EMPTY_RESCAN_INTERVAL, data_ready).await;
        }
    }

    /// Closes the pool and every buffer in it
    ///
    /// Returns `true` only for the call that actually closed the pool.
    pub fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        for buffer in buffers.drain(..) {
            buffer.close();
        }
        self.buffer_number.store(0, Ordering::Release);
        // Whatever was still buffered is discarded
        self.total.store(0, Ordering::Release);
        drop(buffers);

        self.data_ready.notify_waiters();
        self.space_ready.notify_waiters();
        true
    }

    /// One pass over the chain; grows the pool once enough misses piled up
    fn try_put(&self, datum: T, misses: &mut u32) -> Result<Offer<T>, BufferError> {
        let mut datum = datum;
        {
            let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
            if self.closed() || buffers.is_empty() {
                return Err(BufferError::ClosedPool);
            }
            let count = buffers.len();
            let start = self.cursor.fetch_add(1, Ordering::Relaxed);
            for i in 0..count {
                match buffers[(start + i) % count].put_tallied(datum, Some(&self.total)) {
                    Ok(Offer::Accepted) => return Ok(Offer::Accepted),
                    Ok(Offer::Rejected(rejected)) => {
                        datum = rejected;
                        *misses += 1;
                    }
                    Err(_) => return Err(BufferError::ClosedPool),
                }
            }
        }

        if *misses >= self.buffer_number().saturating_mul(GROW_PATIENCE) {
            *misses = 0;
            return self.grow(datum);
        }
        Ok(Offer::Rejected(datum))
    }

    /// Appends a new buffer seeded with `datum`, if the maximum allows it
    fn grow(&self, datum: T) -> Result<Offer<T>, BufferError> {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        if self.closed() {
            return Err(BufferError::ClosedPool);
        }
        if buffers.len() as u32 >= self.max_buffer_number {
            return Ok(Offer::Rejected(datum));
        }

        let buffer = Buffer::new(self.buffer_cap)?;
        let offer = buffer.put_tallied(datum, Some(&self.total))?;
        buffers.push(buffer);
        self.buffer_number.store(buffers.len() as u32, Ordering::Release);
        tracing::debug!(
            "Buffer pool grew to {}/{} buffers",
            buffers.len(),
            self.max_buffer_number
        );
        Ok(offer)
    }

    /// One pass over the chain; shrinks the pool once enough misses piled up
    fn try_get(&self, misses: &mut u32) -> Result<Option<T>, BufferError> {
        {
            let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
            if self.closed() || buffers.is_empty() {
                return Err(BufferError::ClosedPool);
            }
            let count = buffers.len();
            let start = self.cursor.fetch_add(1, Ordering::Relaxed);
            for i in 0..count {
                match buffers[(start + i) % count].get_tallied(Some(&self.total)) {
                    Ok(Some(datum)) => return Ok(Some(datum)),
                    Ok(None) => *misses += 1,
                    Err(_) => return Err(BufferError::ClosedPool),
                }
            }
        }

        if *misses >= self.buffer_number().saturating_mul(SHRINK_PATIENCE) {
            *misses = 0;
            self.shrink();
        }
        Ok(None)
    }

    /// Drops one empty buffer, keeping at least one
    fn shrink(&self) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        if self.closed() || buffers.len() <= 1 {
            return;
        }
        if let Some(index) = buffers.iter().rposition(|buffer| buffer.is_empty()) {
            let buffer = buffers.remove(index);
            buffer.close();
            self.buffer_number.store(buffers.len() as u32, Ordering::Release);
            tracing::debug!(
                "Buffer pool shrank to {}/{} buffers",
                buffers.len(),
                self.max_buffer_number
            );
        }
    }
}
