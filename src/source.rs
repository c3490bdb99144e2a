//! Video frame source capability
//!
//! The orchestrator polls a [`VideoSource`]; it never receives pushed frames
//! and never mutates the source. [`CameraSource`] reads a local webcam
//! through `nokhwa`, keeping the newest streamed frame so reads never block.

use crate::errors::CaptureError;
use crate::types::Frame;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Buffer, CallbackCamera,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub trait VideoSource: Send + Sync {
    /// True once frames can be decoded (stream open, dimensions known).
    fn is_ready(&self) -> bool;

    /// Read the current frame. Synchronous; must not wait on the device.
    fn capture_frame(&self) -> Result<Frame, CaptureError>;
}

/// Webcam source backed by a `nokhwa` threaded camera
pub struct CameraSource {
    camera: Mutex<CallbackCamera>,
    latest: Arc<Mutex<Option<Buffer>>>,
    device_id: String,
    streaming: AtomicBool,
}

impl CameraSource {
    /// Open the camera with the given numeric device id and start streaming.
    pub fn open(device_id: &str) -> Result<Self, CaptureError> {
        let index = device_id.parse::<u32>().map_err(|_| {
            CaptureError::InitError(format!("Invalid camera device ID: {}", device_id))
        })?;

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let latest: Arc<Mutex<Option<Buffer>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest);
        let on_frame = move |buffer: Buffer| {
            if let Ok(mut frame) = slot.lock() {
                *frame = Some(buffer);
            }
        };

        let mut camera = CallbackCamera::new(CameraIndex::Index(index), requested, on_frame)
            .map_err(|e| {
                CaptureError::InitError(format!("Failed to initialize camera: {}", e))
            })?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::InitError(format!("Failed to start stream: {}", e)))?;

        log::info!("Camera {} streaming", device_id);
        Ok(Self {
            camera: Mutex::new(camera),
            latest,
            device_id: device_id.to_string(),
            streaming: AtomicBool::new(true),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn stop(&self) -> Result<(), CaptureError> {
        if !self.streaming.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CaptureError::TransientCapture("Failed to lock camera".to_string()))?;
        camera
            .stop_stream()
            .map_err(|e| CaptureError::TransientCapture(format!("Failed to stop stream: {}", e)))
    }
}

impl VideoSource for CameraSource {
    fn is_ready(&self) -> bool {
        if !self.streaming.load(Ordering::SeqCst) {
            return false;
        }
        self.latest
            .lock()
            .map(|frame| has_dimensions(frame.as_ref()))
            .unwrap_or(false)
    }

    fn capture_frame(&self) -> Result<Frame, CaptureError> {
        let buffer = self
            .latest
            .lock()
            .map_err(|_| CaptureError::TransientCapture("Failed to lock frame slot".to_string()))?
            .clone()
            .ok_or_else(|| {
                CaptureError::TransientCapture("No frame streamed yet".to_string())
            })?;

        let decoded = buffer.decode_image::<RgbFormat>().map_err(|e| {
            CaptureError::TransientCapture(format!("Failed to decode frame: {}", e))
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        Ok(Frame::new(decoded.into_raw(), width, height, self.device_id.clone()))
    }
}

fn has_dimensions(frame: Option<&Buffer>) -> bool {
    frame.is_some_and(|buffer| {
        let resolution = buffer.resolution();
        resolution.width_x > 0 && resolution.height_y > 0
    })
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error stopping camera {} in drop: {}", self.device_id, e);
        }
    }
}
