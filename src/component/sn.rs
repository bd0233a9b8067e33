use std::sync::{Mutex, PoisonError};

/// Cyclic serial number generator for component IDs
///
/// Hands out `start, start + 1, ..., max` and then starts over from `start`,
/// counting how many times it wrapped.
#[derive(Debug)]
pub struct SnGenerator {
    start: u64,
    max: u64,
    state: Mutex<SnState>,
}

#[derive(Debug)]
struct SnState {
    next: u64,
    cycle_count: u64,
}

impl SnGenerator {
    /// Creates a generator; a `max` of zero means `u64::MAX`
    pub fn new(start: u64, max: u64) -> Self {
        let max = if max == 0 { u64::MAX } else { max };
        let start = start.min(max);
        Self {
            start,
            max,
            state: Mutex::new(SnState {
                next: start,
                cycle_count: 0,
            }),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Returns the serial number the next call to [`SnGenerator::get`] yields
    pub fn next(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).next
    }

    pub fn cycle_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cycle_count
    }

    /// Takes a serial number
    pub fn get(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let sn = state.next;
        if sn >= self.max {
            state.next = self.start;
            state.cycle_count += 1;
        } else {
            state.next = sn + 1;
        }
        sn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_serial_numbers() {
        let gen = SnGenerator::new(1, 0);
        assert_eq!(gen.max(), u64::MAX);
        assert_eq!(gen.get(), 1);
        assert_eq!(gen.get(), 2);
        assert_eq!(gen.next(), 3);
        assert_eq!(gen.cycle_count(), 0);
    }

    #[test]
    fn test_wraps_at_max() {
        let gen = SnGenerator::new(3, 5);
        let taken: Vec<u64> = (0..7).map(|_| gen.get()).collect();
        assert_eq!(taken, vec![3, 4, 5, 3, 4, 5, 3]);
        assert_eq!(gen.cycle_count(), 2);
        assert_eq!(gen.start(), 3);
    }
}
