//! Domain layer: pure configuration types with no I/O dependencies beyond
//! reading the optional config file.

pub mod config;

pub use config::{load_file_config, BasicAuth, ConfigError, FileConfig, ServerConfig};
