//! Bounded sample history.

use std::collections::VecDeque;

use benchlink_core::error::{Error, Result};

/// Samples kept when no buffer size is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Keeps the newest `capacity` samples, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: VecDeque<String>,
    capacity: usize,
}

impl SampleBuffer {
    /// An empty buffer holding at most `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(SampleBuffer {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: String) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Change the capacity. Growing keeps every sample; shrinking keeps the
    /// newest `capacity` of them.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        check_capacity(capacity)?;
        let excess = self.samples.len().saturating_sub(capacity);
        self.samples.drain(..excess);
        self.capacity = capacity;
        Ok(())
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&str> {
        self.samples.back().map(String::as_str)
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        SampleBuffer {
            samples: VecDeque::with_capacity(DEFAULT_BUFFER_SIZE),
            capacity: DEFAULT_BUFFER_SIZE,
        }
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::ValueOutOfRange {
            name: "buffer_size".into(),
            value: 0.0,
            min: 1.0,
            max: u32::MAX as f64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, count: usize) -> SampleBuffer {
        let mut buf = SampleBuffer::new(capacity).unwrap();
        for i in 0..count {
            buf.push(i.to_string());
        }
        buf
    }

    #[test]
    fn full_buffer_evicts_oldest() {
        let buf = filled(3, 5);
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec!["2", "3", "4"]);
        assert_eq!(buf.latest(), Some("4"));
    }

    #[test]
    fn growing_keeps_samples() {
        let mut buf = filled(3, 3);
        buf.resize(6).unwrap();
        assert_eq!(buf.capacity(), 6);
        buf.push("3".into());
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn shrinking_keeps_newest() {
        let mut buf = filled(8, 5);
        buf.resize(2).unwrap();
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec!["3", "4"]);
        buf.push("5".into());
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec!["4", "5"]);
    }

    #[test]
    fn shrinking_above_length_keeps_all() {
        let mut buf = filled(8, 2);
        buf.resize(4).unwrap();
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn default_holds_sixty_four() {
        let buf = SampleBuffer::default();
        assert_eq!(buf.capacity(), DEFAULT_BUFFER_SIZE);
        assert!(buf.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(SampleBuffer::new(0), Err(Error::ValueOutOfRange { .. })));
        let mut buf = filled(2, 2);
        assert!(buf.resize(0).is_err());
        assert_eq!(buf.capacity(), 2);
        assert_eq!(buf.len(), 2);
    }
}
