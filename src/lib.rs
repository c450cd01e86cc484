//! PsyScan: psychophysiological scoring from facial geometry, motor jitter
//! and a pulse proxy.
//!
//! Pipeline: capture -> landmarks/emotion -> features -> score + personality -> render

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{Error, Result};

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
