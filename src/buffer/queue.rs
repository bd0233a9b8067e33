use super::BufferError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Outcome of a non-blocking put
#[derive(Debug, PartialEq, Eq)]
pub enum Offer<T> {
    /// The datum was stored
    Accepted,
    /// The buffer is full; the datum is handed back
    Rejected(T),
}

/// Fixed-capacity FIFO buffer with non-blocking put/get
#[derive(Debug)]
pub struct Buffer<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: u32,
    closed: AtomicBool,
}

impl<T> Buffer<T> {
    /// Creates a buffer holding at most `capacity` data
    pub fn new(capacity: u32) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::IllegalParameter(
                "zero buffer capacity".to_string(),
            ));
        }
        Ok(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity as usize)),
            capacity,
            closed: AtomicBool::new(false),
        })
    }

    pub fn cap(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> u32 {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `datum` if there is room
    ///
    /// Fails with [`BufferError::ClosedBuffer`] once the buffer is closed.
    pub fn put(&self, datum: T) -> Result<Offer<T>, BufferError> {
        self.put_tallied(datum, None)
    }

    /// Takes the oldest datum, `Ok(None)` if the buffer is empty
    ///
    /// A closed buffer still hands out what it holds and only fails with
    /// [`BufferError::ClosedBuffer`] once drained.
    pub fn get(&self) -> Result<Option<T>, BufferError> {
        self.get_tallied(None)
    }

    /// Like [`Buffer::put`], bumping `tally` inside the same critical section
    pub(crate) fn put_tallied(&self, datum: T, tally: Option<&AtomicU64>) -> Result<Offer<T>, BufferError> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return Err(BufferError::ClosedBuffer);
        }
        if queue.len() >= self.capacity as usize {
            return Ok(Offer::Rejected(datum));
        }
        queue.push_back(datum);
        if let Some(tally) = tally {
            tally.fetch_add(1, Ordering::AcqRel);
        }
        Ok(Offer::Accepted)
    }

    /// Like [`Buffer::get`], lowering `tally` inside the same critical section
    pub(crate) fn get_tallied(&self, tally: Option<&AtomicU64>) -> Result<Option<T>, BufferError> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.pop_front() {
            Some(datum) => {
                if let Some(tally) = tally {
                    tally.fetch_sub(1, Ordering::AcqRel);
                }
                Ok(Some(datum))
            }
            None if self.closed.load(Ordering::Acquire) => Err(BufferError::ClosedBuffer),
            None => Ok(None),
        }
    }

    /// Closes the buffer, returning whether this call closed it
    pub fn close(&self) -> bool {
        let _queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            Buffer::<u32>::new(0),
            Err(BufferError::IllegalParameter(_))
        ));
    }

    #[test]
    fn test_put_get_fifo() {
        let buffer = Buffer::new(2).unwrap();
        assert_eq!(buffer.put(1).unwrap(), Offer::Accepted);
        assert_eq!(buffer.put(2).unwrap(), Offer::Accepted);
        assert_eq!(buffer.put(3).unwrap(), Offer::Rejected(3));
        assert_eq!(buffer.len(), 2);

        assert_eq!(buffer.get().unwrap(), Some(1));
        assert_eq!(buffer.get().unwrap(), Some(2));
        assert_eq!(buffer.get().unwrap(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_close_drains_then_fails() {
        let buffer = Buffer::new(4).unwrap();
        buffer.put("a").unwrap();

        assert!(buffer.close());
        assert!(!buffer.close());
        assert!(buffer.closed());

        assert_eq!(buffer.put("b"), Err(BufferError::ClosedBuffer));
        assert_eq!(buffer.get().unwrap(), Some("a"));
        assert_eq!(buffer.get(), Err(BufferError::ClosedBuffer));
    }

    #[test]
    fn test_tally_follows_contents() {
        let tally = AtomicU64::new(0);
        let buffer = Buffer::new(3).unwrap();
        buffer.put_tallied(1, Some(&tally)).unwrap();
        buffer.put_tallied(2, Some(&tally)).unwrap();
        assert_eq!(tally.load(Ordering::Acquire), 2);

        buffer.get_tallied(Some(&tally)).unwrap();
        assert_eq!(tally.load(Ordering::Acquire), 1);

        // Nothing taken, nothing counted
        buffer.get_tallied(Some(&tally)).unwrap();
        buffer.get_tallied(Some(&tally)).unwrap();
        assert_eq!(tally.load(Ordering::Acquire), 0);
    }
}
