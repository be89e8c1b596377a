//! # Core Runtime Module
//!
//! Foundational infrastructure for the session-log sync engine:
//! - Logging and tracing initialization
//! - Configuration management with fail-fast validation
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the engine crates depend on. It
//! establishes the logging conventions and the configuration surface through
//! which hosts inject bridge implementations.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SyncSettings};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
