//! Configuration management for FaceGate
//!
//! Provides configuration loading, saving, and validation for the polling
//! loop, the per-variant quality thresholds, and the cosmetic processing
//! delays shown before a registration payload is handed over.

use crate::errors::CaptureError;
use crate::quality::QualityGate;
use crate::types::Variant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceGateConfig {
    pub capture: CaptureConfig,
    pub registration: RegistrationConfig,
    pub login: LoginConfig,
}

/// Polling loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Camera device index used by the built-in camera source
    pub device_id: String,
    /// Tick period of the polling loop in milliseconds
    pub poll_interval_ms: u64,
    /// Per-call detector timeout in milliseconds (0 disables)
    pub detect_timeout_ms: u64,
}

/// Registration flow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Accepted samples required before the payload is assembled
    pub required_samples: usize,
    /// Minimum face box side in pixels
    pub min_face_size: f32,
    /// Detector confidence must be strictly greater than this
    pub min_confidence: f32,
    /// Delay before the close callback, after success
    pub close_delay_ms: u64,
    /// Status messages shown in order before the payload is handed over
    pub processing_stages: Vec<ProcessingStage>,
}

/// Login flow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Minimum face box side in pixels
    pub min_face_size: f32,
    /// Rejected attempts allowed before the session fails
    pub max_attempts: u32,
    /// Pause after a rejected attempt before polling resumes
    pub retry_delay_ms: u64,
}

/// One cosmetic step of the finalize sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStage {
    pub message: String,
    pub duration_ms: u64,
}

impl ProcessingStage {
    pub fn new(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            message: message.into(),
            duration_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

pub fn default_processing_stages() -> Vec<ProcessingStage> {
    vec![
        ProcessingStage::new("Processing verification...", 2000),
        ProcessingStage::new("Analyzing facial features...", 1500),
        ProcessingStage::new("Finalizing verification...", 1500),
    ]
}

impl Default for FaceGateConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device_id: "0".to_string(),
                poll_interval_ms: 100,
                detect_timeout_ms: 5000,
            },
            registration: RegistrationConfig {
                required_samples: 3,
                min_face_size: 100.0,
                min_confidence: 0.8,
                close_delay_ms: 1000,
                processing_stages: default_processing_stages(),
            },
            login: LoginConfig {
                min_face_size: 100.0,
                max_attempts: 3,
                retry_delay_ms: 1000,
            },
        }
    }
}

impl FaceGateConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;

        let config: FaceGateConfig = toml::from_str(&contents).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to parse config file: {}", e))
        })?;

        config.validate().map_err(CaptureError::InvalidConfig)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::InvalidConfig(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CaptureError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("facegate.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(10..=10_000).contains(&self.capture.poll_interval_ms) {
            return Err("Poll interval must be between 10 and 10000 ms".to_string());
        }
        if self.capture.detect_timeout_ms > 60_000 {
            return Err("Detector timeout must be at most 60000 ms".to_string());
        }

        if !(1..=10).contains(&self.registration.required_samples) {
            return Err("Required samples must be between 1 and 10".to_string());
        }
        let positive = |size: f32| size.is_finite() && size > 0.0;
        if !positive(self.registration.min_face_size) || !positive(self.login.min_face_size) {
            return Err("Minimum face size must be a positive number".to_string());
        }
        if !(0.0..=1.0).contains(&self.registration.min_confidence) {
            return Err("Minimum confidence must be between 0.0 and 1.0".to_string());
        }
        if self
            .registration
            .processing_stages
            .iter()
            .any(|stage| stage.duration_ms > 60_000)
        {
            return Err("Processing stage durations must be at most 60000 ms".to_string());
        }

        if !(1..=10).contains(&self.login.max_attempts) {
            return Err("Login attempts must be between 1 and 10".to_string());
        }

        Ok(())
    }

    /// Resolve the per-session settings for one verification flow
    pub fn session_settings(&self, variant: Variant) -> SessionSettings {
        let poll_interval = Duration::from_millis(self.capture.poll_interval_ms);
        let detect_timeout = match self.capture.detect_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        match variant {
            Variant::Registration => SessionSettings {
                variant,
                poll_interval,
                detect_timeout,
                required_samples: self.registration.required_samples,
                max_attempts: None,
                retry_delay: Duration::ZERO,
                gate: QualityGate::new(
                    self.registration.min_face_size,
                    Some(self.registration.min_confidence),
                ),
                stages: self.registration.processing_stages.clone(),
                close_delay: Some(Duration::from_millis(self.registration.close_delay_ms)),
            },
            Variant::Login => SessionSettings {
                variant,
                poll_interval,
                detect_timeout,
                required_samples: 1,
                max_attempts: Some(self.login.max_attempts),
                retry_delay: Duration::from_millis(self.login.retry_delay_ms),
                gate: QualityGate::new(self.login.min_face_size, None),
                stages: Vec::new(),
                close_delay: None,
            },
        }
    }
}

/// Everything one capture session needs to know, resolved from config.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub variant: Variant,
    pub poll_interval: Duration,
    pub detect_timeout: Option<Duration>,
    pub required_samples: usize,
    /// `Some` only for login: rejected attempts tolerated before failing
    pub max_attempts: Option<u32>,
    pub retry_delay: Duration,
    pub gate: QualityGate,
    pub stages: Vec<ProcessingStage>,
    /// `Some` only for registration: pause before the close callback
    pub close_delay: Option<Duration>,
}

impl SessionSettings {
    pub fn registration() -> Self {
        FaceGateConfig::default().session_settings(Variant::Registration)
    }

    pub fn login() -> Self {
        FaceGateConfig::default().session_settings(Variant::Login)
    }

    /// Zero every cosmetic delay, keeping messages and thresholds.
    pub fn without_delays(mut self) -> Self {
        for stage in &mut self.stages {
            stage.duration_ms = 0;
        }
        if self.close_delay.is_some() {
            self.close_delay = Some(Duration::ZERO);
        }
        self.retry_delay = Duration::ZERO;
        self
    }

    pub fn with_detect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.detect_timeout = timeout;
        self
    }
}
