//! Fixed-capacity FIFO of the most recent filtered samples

use std::collections::VecDeque;

/// Append-overwrite sequence holding at most `capacity` samples.
///
/// Once full, every append evicts exactly the oldest sample. Readers only
/// ever see owned copies via [`RingBuffer::snapshot`].
#[derive(Debug, Clone)]
pub struct RingBuffer {
    capacity: usize,
    data: VecDeque<f32>,
}

impl RingBuffer {
    /// Create new ring buffer; `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RingBuffer {
            capacity,
            data: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, sample: f32) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(sample);
    }

    /// Owned copy, oldest to newest
    pub fn snapshot(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction_keeps_order() {
        let mut buffer = RingBuffer::new(5);
        for x in 1..=7 {
            buffer.append(x as f32);
        }
        assert_eq!(buffer.snapshot(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = RingBuffer::new(3);
        for i in 0..50 {
            buffer.append(i as f32);
            assert!(buffer.len() <= buffer.capacity());
        }
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_partial_fill() {
        let mut buffer = RingBuffer::new(4);
        assert!(buffer.is_empty());

        buffer.append(1.0);
        buffer.append(2.0);
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut buffer = RingBuffer::new(3);
        buffer.append(1.0);
        let snapshot = buffer.snapshot();
        buffer.append(2.0);
        assert_eq!(snapshot, vec![1.0]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = RingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(1.0);
        buffer.append(2.0);
        assert_eq!(buffer.snapshot(), vec![2.0]);
    }
}
