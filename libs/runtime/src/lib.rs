//! Process-level plumbing shared by EcoCycle binaries: layered configuration
//! and logging initialisation.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section, ServerConfig};
