mod config;

pub use config::{ConfigError, HarnessConfig};
