//! Vigil: activity intelligence for a camera detection pipeline.
//!
//! The pipeline stores one row per detection and writes captures into
//! per-label folders. This crate turns both into the documents a dashboard
//! renders: hourly activity charts, label breakdowns, the latest capture,
//! per-label galleries and short spoken summaries.

pub mod activity;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod labels;
pub mod logging;
pub mod media;
pub mod voice;

pub use config::Config;
pub use dashboard::Dashboard;
pub use db::Database;
pub use error::{IntelError, IntelResult};
