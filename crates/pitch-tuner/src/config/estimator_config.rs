use crate::config::{default_amplitude_threshold, default_threshold};

use serde::{Deserialize, Serialize};

/// YIN estimator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Absolute threshold on the normalized difference function.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// RMS level below which a frame is treated as silence.
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            amplitude_threshold: default_amplitude_threshold(),
        }
    }
}
