use serde::Deserialize;
use std::path::Path;

/// Scoring configuration for one experiment run.
///
/// Built directly by the evolutionary-algorithm driver, or loaded from a
/// TOML file when scoring recorded videos offline.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Minimum background-difference pixel count for a ROI to count as
    /// "bees present".
    #[serde(default = "default_background_threshold")]
    pub pixel_count_background_threshold: i64,
    /// Maximum previous-frame-difference pixel count for a ROI to count as
    /// "no movement".
    #[serde(default = "default_previous_frame_threshold")]
    pub pixel_count_previous_frame_threshold: i64,
    /// Key selecting the scoring function. Accepts short codes ("B_bm_ap")
    /// as well as the descriptive and legacy names kept for old run files.
    #[serde(default = "default_function")]
    pub image_processing_function: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_background_threshold() -> i64 {
    1000
}
fn default_previous_frame_threshold() -> i64 {
    1000
}
fn default_function() -> String {
    "B_bm_ap".into()
}
