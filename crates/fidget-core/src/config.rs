//! Loading and saving fidget configurations
//!
//! RON is the native format; files ending in `.json` are read and written
//! as JSON instead.

use std::path::Path;

use crate::types::FidgetConfig;

/// Configuration error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Ron,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Ron,
        }
    }
}

/// Load a configuration file
///
/// Relative asset paths inside the file (gear profile, custom shape mesh)
/// are resolved against the directory containing it.
pub fn load_config(path: impl AsRef<Path>) -> Result<FidgetConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

    let mut config = parse_config(&content, ConfigFormat::from_path(path))?;
    if let Some(base) = path.parent() {
        resolve_paths(&mut config, base);
    }

    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

fn parse_config(content: &str, format: ConfigFormat) -> Result<FidgetConfig, ConfigError> {
    match format {
        ConfigFormat::Ron => {
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
        }
    }
}

fn resolve_paths(config: &mut FidgetConfig, base: &Path) {
    if config.gear.profile.is_relative() {
        config.gear.profile = base.join(&config.gear.profile);
    }
    if let Some(stl) = config.shape.stl_path.as_mut() {
        if stl.is_relative() {
            *stl = base.join(&*stl);
        }
    }
}

/// Render a configuration in RON
pub fn to_ron_string(config: &FidgetConfig) -> Result<String, ConfigError> {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .map_err(|e| ConfigError::Serialize(e.to_string()))
}

/// Save a configuration, choosing the format from the file extension
pub fn save_config(config: &FidgetConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Ron => to_ron_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
    }
    std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}
