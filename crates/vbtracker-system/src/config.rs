use serde::{Deserialize, Serialize};
use vbtracker_core::{RansacOptions, Real};

/// Tuning consumed by tracking-system factories.
///
/// Defaults are the parameter finder's starting point: translation noise
/// `4.14e-6`, rotation noise `1e-2`, no beacon noise, variance scale `5e-2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigParams {
    /// Process-noise autocorrelation: translation axes at 0..3, rotation axes at 3..6.
    pub process_noise_autocorrelation: [Real; 6],
    /// Process noise applied to beacon position estimates.
    pub beacon_process_noise: Real,
    /// Multiplier on the nominal measurement variance.
    pub measurement_variance_scale_factor: Real,
    /// Nominal variance of a single-frame pose measurement (m² and rad²).
    pub base_measurement_variance: Real,
    /// RANSAC settings for the per-frame pose solve.
    pub ransac: RansacOptions,
}

impl Default for ConfigParams {
    fn default() -> Self {
        Self {
            process_noise_autocorrelation: [4.14e-6, 4.14e-6, 4.14e-6, 1e-2, 1e-2, 1e-2],
            beacon_process_noise: 0.0,
            measurement_variance_scale_factor: 5e-2,
            base_measurement_variance: 1e-4,
            ransac: RansacOptions::default(),
        }
    }
}

impl ConfigParams {
    /// Effective measurement variance after scaling, never negative.
    pub fn measurement_variance(&self) -> Real {
        (self.base_measurement_variance * self.measurement_variance_scale_factor).max(0.0)
    }
}
