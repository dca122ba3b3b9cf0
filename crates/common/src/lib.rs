//! Common utilities for vh-supervisor
//!
//! This crate provides the functionality shared across the supervisor:
//! the error taxonomy, logging setup, the capability traits the supervisor
//! coordinates (sleep inhibition and display dimming), and test utilities.

pub mod error;
pub mod logging;
pub mod system;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use system::{DisplayDimmer, SleepInhibitor};
