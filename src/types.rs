//! Core data types shared by the capture pipeline
//!
//! Frames come from a [`crate::source::VideoSource`], detections from a
//! [`crate::detector::Detector`], and accepted detections are copied into
//! immutable [`Sample`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which verification flow a capture session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Seeds a biometric reference: several high-confidence samples.
    Registration,
    /// Verifies against an existing reference: one sample per attempt.
    Login,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Registration => "registration",
            Variant::Login => "login",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "registration" | "register" => Ok(Variant::Registration),
            "login" => Ok(Variant::Login),
            other => Err(format!("Unknown verification variant: {}", other)),
        }
    }
}

/// A raw RGB8 video frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, device_id: String) -> Self {
        let size_bytes = data.len();
        Self {
            data,
            width,
            height,
            format: "RGB8".to_string(),
            device_id,
            timestamp: Utc::now(),
            size_bytes,
        }
    }

    pub fn with_format(mut self, format: String) -> Self {
        self.format = format;
        self
    }

    /// True when the buffer holds exactly `width * height` RGB pixels.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// Copy the pixels into an `image` buffer for model backends.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if !self.is_valid() {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Pixel size of a detected face region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn min_dimension(&self) -> f32 {
        self.width.min(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One face found by the detector in a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub bounding_box: BoundingBox,
    /// Detector certainty in [0, 1]
    pub confidence_score: f32,
    /// Face embedding, opaque to this crate
    pub descriptor: Vec<f32>,
    pub landmarks: Vec<Point>,
}

impl DetectionResult {
    /// Detections with a degenerate box or no descriptor count as misses.
    pub fn is_usable(&self) -> bool {
        self.bounding_box.width > 0.0
            && self.bounding_box.height > 0.0
            && !self.descriptor.is_empty()
    }
}

/// An accepted detection, frozen at the moment of acceptance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    descriptor: Vec<f32>,
    landmarks: Vec<Point>,
    captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn from_detection(detection: &DetectionResult) -> Self {
        Self {
            descriptor: detection.descriptor.clone(),
            landmarks: detection.landmarks.clone(),
            captured_at: Utc::now(),
        }
    }

    pub fn descriptor(&self) -> &[f32] {
        &self.descriptor
    }

    pub fn landmarks(&self) -> &[Point] {
        &self.landmarks
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
