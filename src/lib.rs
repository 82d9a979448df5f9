//! mets-reingest library crate.
//!
//! Reconciles an archival package's METS document with the change records
//! captured since it was written. The `mets-reingest` binary is a thin shell
//! over [`reingest::run`]; the modules are public so integration tests can
//! drive the model and the mergers directly.

pub mod config;
pub mod error;
pub mod merge;
pub mod mets;
pub mod model;
pub mod payload;
pub mod reingest;
pub mod side_metadata;
pub mod telemetry;

pub use config::ReingestConfig;
pub use error::ReingestError;
pub use reingest::{RunReport, reconcile, run, write_output};
