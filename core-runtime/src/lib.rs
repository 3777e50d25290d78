//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the media-control crates:
//! - Logging and tracing setup
//! - Outbound player events and the broadcast event bus
//!
//! The playback core depends on this crate for its ambient concerns; this
//! crate knows nothing about backends or reconciliation.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
