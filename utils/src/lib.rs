//! Shared utilities for the quorum bridge.

pub mod logging;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
