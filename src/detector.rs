//! Face detector capability
//!
//! The model itself is external. A [`Detector`] loads it once and then turns
//! frames into at most one [`DetectionResult`]. Synchronous model bindings
//! plug in through [`FaceModel`] and [`BlockingDetector`], which keeps the
//! inference off the async runtime threads and runs one inference at a time.

use crate::errors::CaptureError;
use crate::types::{DetectionResult, Frame};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub type DetectorFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CaptureError>> + Send + 'a>>;

pub trait Detector: Send + Sync {
    fn name(&self) -> &str {
        "detector"
    }

    /// Load model weights. Failures are reported as [`CaptureError::InitError`].
    fn initialize(&self) -> DetectorFuture<'_, ()>;

    /// Run one detection; `Ok(None)` means no face in the frame.
    fn detect<'a>(&'a self, frame: &'a Frame) -> DetectorFuture<'a, Option<DetectionResult>>;
}

/// A synchronous face model (ONNX session, dlib binding, ...)
pub trait FaceModel: Send + Sync + 'static {
    fn load(&self) -> Result<(), CaptureError>;

    fn detect(&self, image: &image::RgbImage) -> Result<Option<DetectionResult>, CaptureError>;
}

/// Runs a [`FaceModel`] on the blocking thread pool
pub struct BlockingDetector<M> {
    model: Arc<M>,
    permits: Arc<Semaphore>,
    name: String,
}

impl<M: FaceModel> BlockingDetector<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
            permits: Arc::new(Semaphore::new(1)),
            name: std::any::type_name::<M>().to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<M: FaceModel> Detector for BlockingDetector<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> DetectorFuture<'_, ()> {
        let model = Arc::clone(&self.model);
        Box::pin(async move {
            log::info!("Loading face model: {}", self.name);
            tokio::task::spawn_blocking(move || model.load())
                .await
                .map_err(|e| CaptureError::InitError(format!("Task join error: {}", e)))?
                .map_err(|e| match e {
                    CaptureError::InitError(_) => e,
                    other => CaptureError::InitError(other.to_string()),
                })
        })
    }

    fn detect<'a>(&'a self, frame: &'a Frame) -> DetectorFuture<'a, Option<DetectionResult>> {
        Box::pin(async move {
            let image = frame.to_rgb_image().ok_or_else(|| {
                CaptureError::TransientCapture(format!(
                    "Malformed frame: {}x{} with {} bytes",
                    frame.width,
                    frame.height,
                    frame.data.len()
                ))
            })?;

            // The permit lives until the model returns, even if the caller gave up
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| CaptureError::TransientCapture(format!("Detector closed: {}", e)))?;

            let model = Arc::clone(&self.model);
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                model.detect(&image)
            })
                .await
                .map_err(|e| CaptureError::TransientCapture(format!("Task join error: {}", e)))?
        })
    }
}
