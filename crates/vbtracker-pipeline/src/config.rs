use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use vbtracker_core::{CameraParameters, OneEuroParams};
use vbtracker_system::{ConfigParams, TargetLayout};

use crate::OptimizerOptions;

/// Everything the replay and optimizer commands need besides the log itself.
///
/// Every field has a default, so a JSON file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Field separator of the measurement log.
    pub delimiter: char,
    pub camera: CameraParameters,
    /// Replay against the undistorted variant of `camera`.
    pub undistort: bool,
    pub target: TargetLayout,
    pub tracker: ConfigParams,
    pub position_filter: OneEuroParams,
    pub orientation_filter: OneEuroParams,
    pub optimizer: OptimizerOptions,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            camera: CameraParameters::default(),
            undistort: true,
            target: TargetLayout::default(),
            tracker: ConfigParams::default(),
            position_filter: OneEuroParams::default(),
            orientation_filter: OneEuroParams::default(),
            optimizer: OptimizerOptions::default(),
        }
    }
}

impl FinderConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.delimiter_byte()?;
        config
            .camera
            .validate()
            .with_context(|| format!("invalid camera in {}", path.display()))?;
        Ok(config)
    }

    /// The delimiter as the single byte the log reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        ensure!(
            self.delimiter.is_ascii(),
            "log delimiter must be ASCII, got {:?}",
            self.delimiter
        );
        Ok(self.delimiter as u8)
    }

    /// Camera parameters the measurements are interpreted with.
    pub fn effective_camera(&self) -> CameraParameters {
        if self.undistort {
            self.camera.create_undistorted_variant()
        } else {
            self.camera.clone()
        }
    }
}
