//! Shared utilities for the bleach workspace: tracing setup and text
//! serialization helpers used for configuration and correction metadata.

pub mod log_setup;
pub mod serde;

pub use self::serde::FileFormat;
