//! FaceGate: face-verification capture orchestration for Tauri applications
//!
//! This crate drives a video source and an external face-detection model
//! through repeated detection attempts, gates each detection on quality,
//! accumulates accepted samples and hands a serialized payload to the caller.
//!
//! # Features
//! - Registration flow: several high-confidence samples, staged processing
//! - Login flow: one sample per attempt, bounded retries
//! - Pluggable detector and video source capabilities
//! - Cancellable sessions on a fixed-period tokio polling loop
//! - Tauri plugin with start/stop/verdict commands and webview events
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! facegate = "0.3"
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! fn main() {
//!     let detector = Arc::new(facegate::BlockingDetector::new(MyModel::load()));
//!     let camera = Arc::new(facegate::CameraSource::open("0").unwrap());
//!     tauri::Builder::default()
//!         .plugin(facegate::init(detector, camera))
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod buffer;
pub mod callbacks;
pub mod commands;
pub mod config;
pub mod detector;
pub mod errors;
pub mod finalize;
pub mod invariants;
pub mod orchestrator;
pub mod quality;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod status;
pub mod types;

// Testing utilities - synthetic sources and scripted collaborators
pub mod testing;

// Re-exports for convenience
pub use callbacks::{CaptureCallbacks, ChannelCallbacks, SessionEvent};
pub use config::{FaceGateConfig, SessionSettings};
pub use detector::{BlockingDetector, Detector, FaceModel};
pub use errors::CaptureError;
pub use orchestrator::{
    start, CaptureOrchestrator, CaptureReport, SessionController, SessionHandle, TickOutcome,
};
pub use quality::{GateDecision, QualityGate, RejectReason};
pub use session::{CaptureSession, Phase, Transition};
pub use source::{CameraSource, VideoSource};
pub use status::{StatusKind, StatusUpdate};
pub use types::{BoundingBox, DetectionResult, Frame, Point, Sample, Variant};

use commands::verification::VerificationBackend;
use std::sync::Arc;
use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

/// Initialize the FaceGate plugin with all commands
pub fn init<R: Runtime>(
    detector: Arc<dyn Detector>,
    source: Arc<dyn VideoSource>,
) -> TauriPlugin<R> {
    Builder::new("facegate")
        .invoke_handler(tauri::generate_handler![
            // Session commands
            commands::verification::start_face_verification,
            commands::verification::stop_face_verification,
            commands::verification::submit_verification_result,
            commands::verification::list_verification_sessions,
            // Configuration commands
            commands::config::get_verification_config,
            commands::config::update_verification_config,
            commands::config::reset_verification_config,
        ])
        .setup(move |app, _api| {
            app.manage(VerificationBackend { detector, source });
            Ok(())
        })
        .build()
}

/// Initialize logging for the capture pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "facegate=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        variants: vec![Variant::Registration, Variant::Login],
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub variants: Vec<Variant>,
}
