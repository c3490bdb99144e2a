//! Synthetic frames, detections and a frame source
//!
//! Lets capture sessions run end to end without a webcam or a model.

use crate::errors::CaptureError;
use crate::source::VideoSource;
use crate::types::{BoundingBox, DetectionResult, Frame, Point};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Descriptor length of common face embedding models
pub const DESCRIPTOR_LEN: usize = 128;

/// Landmark count of the 68-point face shape model
pub const LANDMARK_COUNT: usize = 68;

/// Create a gradient RGB frame that changes with the frame number
pub fn synthetic_frame(frame_number: u64, width: u32, height: u32) -> Frame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    Frame::new(data, width, height, "synthetic".to_string())
}

/// A usable detection with the given box and score
pub fn detection(width: f32, height: f32, confidence: f32) -> DetectionResult {
    DetectionResult {
        bounding_box: BoundingBox::new(width, height),
        confidence_score: confidence,
        descriptor: (0..DESCRIPTOR_LEN).map(|i| i as f32 / DESCRIPTOR_LEN as f32).collect(),
        landmarks: (0..LANDMARK_COUNT)
            .map(|i| Point::new(i as f32, (i * 2) as f32))
            .collect(),
    }
}

/// In-memory [`VideoSource`] producing [`synthetic_frame`]s
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    ready: AtomicBool,
    failing: AtomicBool,
    frames: AtomicU64,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_resolution(64, 48)
    }

    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            frames: AtomicU64::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make every capture fail until switched back.
    pub fn fail_captures(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for SyntheticSource {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn capture_frame(&self) -> Result<Frame, CaptureError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CaptureError::TransientCapture(
                "synthetic capture failure".to_string(),
            ));
        }
        let number = self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(synthetic_frame(number, self.width, self.height))
    }
}
