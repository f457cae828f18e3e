//! YIN fundamental frequency estimator.
//!
//! de Cheveigné & Kawahara's difference-function method: square differences
//! against lagged copies of the frame, normalise by the running mean, take the
//! first lag that dips under an absolute threshold, then refine it with
//! parabolic interpolation.

use crate::{AudioFrame, pitch::PitchEstimator};

use tracing::trace;

/// Tuning knobs for [`YinEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YinConfig {
    /// Dip depth accepted as periodic (lower is stricter).
    pub threshold: f32,
    /// RMS below which a frame is treated as silence.
    pub amplitude_threshold: f32,
    /// Results below this frequency are discarded.
    pub min_frequency_hz: f64,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            threshold: 0.10,
            amplitude_threshold: 0.01,
            min_frequency_hz: 20.0,
        }
    }
}

/// YIN pitch estimator with a reusable difference buffer.
#[derive(Debug, Clone, Default)]
pub struct YinEstimator {
    config: YinConfig,
    yin_buffer: Vec<f32>,
}

impl YinEstimator {
    /// Creates an estimator with the given settings.
    pub fn new(config: YinConfig) -> Self {
        Self {
            config,
            yin_buffer: Vec::new(),
        }
    }

    /// The settings in use.
    pub fn config(&self) -> &YinConfig {
        &self.config
    }

    fn detect(&mut self, signal: &[f32], sample_rate_hz: u32) -> Option<f64> {
        let half = signal.len() / 2;
        if half < 3 || sample_rate_hz == 0 {
            return None;
        }

        let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
        if rms < self.config.amplitude_threshold {
            trace!(rms, "Frame below amplitude gate");
            return None;
        }

        self.yin_buffer.clear();
        self.yin_buffer.resize(half, 0.0);
        let buffer = &mut self.yin_buffer;

        // Squared difference.
        for tau in 1..half {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            buffer[tau] = diff;
        }

        // Cumulative mean normalised difference.
        buffer[0] = 1.0;
        let mut running_sum = 0.0;
        for (tau, value) in buffer.iter_mut().enumerate().skip(1) {
            running_sum += *value;
            *value = if running_sum != 0.0 {
                *value * tau as f32 / running_sum
            } else {
                1.0
            };
        }

        // Absolute threshold, then slide down to the bottom of the dip.
        let mut tau = 2;
        let period = loop {
            if tau >= half {
                return None;
            }
            if buffer[tau] < self.config.threshold {
                while tau + 1 < half && buffer[tau + 1] < buffer[tau] {
                    tau += 1;
                }
                break tau;
            }
            tau += 1;
        };

        let refined = if period + 1 < half {
            let y1 = buffer[period - 1];
            let y2 = buffer[period];
            let y3 = buffer[period + 1];
            let curvature = y1 - 2.0 * y2 + y3;
            if curvature != 0.0 {
                period as f32 + (y1 - y3) / (2.0 * curvature)
            } else {
                period as f32
            }
        } else {
            period as f32
        };

        let frequency = f64::from(sample_rate_hz) / f64::from(refined);
        if frequency.is_finite() && frequency >= self.config.min_frequency_hz {
            Some(frequency)
        } else {
            None
        }
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, frame: &AudioFrame) -> Option<f64> {
        self.detect(frame.samples(), frame.sample_rate_hz())
    }
}
