//! Replay and tuning pipeline for recorded tracker measurements.
//!
//! - [`MeasurementLog`] loads the recorded blob log,
//! - [`PoseStrategy`] implementations turn rows into pose estimates,
//! - [`replay_log`] drives every strategy over a log,
//! - [`run_optimizer`] searches the tracker tuning space.

mod config;
mod csv_log;
mod param_finder;
mod pose_filter;
mod replay;
mod strategies;

pub use config::*;
pub use csv_log::*;
pub use param_finder::*;
pub use pose_filter::*;
pub use replay::*;
pub use strategies::*;
