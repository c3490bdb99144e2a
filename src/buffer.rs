//! Capacity-bounded, insertion-ordered store of accepted samples

use crate::errors::CaptureError;
use crate::types::Sample;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the new length.
    ///
    /// Fails without modifying the buffer once capacity is reached.
    pub fn append(&mut self, sample: Sample) -> Result<usize, CaptureError> {
        if self.is_full() {
            return Err(CaptureError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.samples.push(sample);
        Ok(self.samples.len())
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a SampleBuffer {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, DetectionResult, Point};

    fn sample(tag: f32) -> Sample {
        Sample::from_detection(&DetectionResult {
            bounding_box: BoundingBox::new(120.0, 120.0),
            confidence_score: 0.9,
            descriptor: vec![tag; 4],
            landmarks: vec![Point::new(tag, tag)],
        })
    }

    #[test]
    fn test_append_until_full() {
        let mut buffer = SampleBuffer::new(3);
        assert_eq!(buffer.append(sample(1.0)).unwrap(), 1);
        assert_eq!(buffer.append(sample(2.0)).unwrap(), 2);
        assert!(!buffer.is_full());
        assert_eq!(buffer.append(sample(3.0)).unwrap(), 3);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_append_past_capacity_is_rejected() {
        let mut buffer = SampleBuffer::new(1);
        buffer.append(sample(1.0)).unwrap();

        let err = buffer.append(sample(2.0)).unwrap_err();
        assert_eq!(err, CaptureError::BufferFull { capacity: 1 });
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.samples()[0].descriptor()[0], 1.0);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut buffer = SampleBuffer::new(3);
        for tag in [3.0, 1.0, 2.0] {
            buffer.append(sample(tag)).unwrap();
        }
        let order: Vec<f32> = buffer.iter().map(|s| s.descriptor()[0]).collect();
        assert_eq!(order, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_clear_resets() {
        let mut buffer = SampleBuffer::new(2);
        buffer.append(sample(1.0)).unwrap();
        buffer.append(sample(2.0)).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let buffer = SampleBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }
}
