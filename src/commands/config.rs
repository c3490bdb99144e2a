use crate::config::{FaceGateConfig, SessionSettings};
use crate::types::Variant;
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<FaceGateConfig>> = Arc::new(RwLock::new(FaceGateConfig::load_or_default()));
}

/// Snapshot of the active configuration
pub fn current_config() -> Result<FaceGateConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Settings for a new session, from the active configuration
pub fn current_settings(variant: Variant) -> Result<SessionSettings, String> {
    Ok(current_config()?.session_settings(variant))
}

/// Get the current verification configuration
#[command]
pub async fn get_verification_config() -> Result<FaceGateConfig, String> {
    current_config()
}

/// Update verification configuration. Running sessions keep their settings.
#[command]
pub async fn update_verification_config(new_config: FaceGateConfig) -> Result<(), String> {
    // Validate first
    new_config.validate()?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = new_config.clone();
    }

    new_config
        .save_to_file(FaceGateConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Reset verification configuration to defaults
#[command]
pub async fn reset_verification_config() -> Result<FaceGateConfig, String> {
    let default_config = FaceGateConfig::default();

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = default_config.clone();
    }

    default_config
        .save_to_file(FaceGateConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(default_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_rejects_invalid_config() {
        let mut config = FaceGateConfig::default();
        config.login.max_attempts = 0;

        let result = update_verification_config(config).await;
        assert!(result.unwrap_err().contains("attempts"));
        assert!(current_config().unwrap().validate().is_ok());
    }

    #[test]
    fn test_current_settings_follow_variant() {
        let settings = current_settings(Variant::Login).unwrap();
        assert_eq!(settings.required_samples, 1);
        assert!(settings.max_attempts.is_some());
    }
}
