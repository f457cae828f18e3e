use crate::config::{default_frame_size, default_sample_rate_hz};

use serde::{Deserialize, Serialize};

/// Capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Rate the estimator sees, after resampling.
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Samples per analysis frame.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            frame_size: default_frame_size(),
        }
    }
}
