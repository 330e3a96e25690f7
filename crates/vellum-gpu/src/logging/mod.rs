//! Logger setup.
//!
//! The crate itself only emits through the `log` facade; this module gives
//! binaries and tests a one-call `env_logger` setup.

mod init;

pub use init::{init_logging, LoggingConfig};
