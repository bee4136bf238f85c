use relay_ipc::frame_bytes;
use serde::Deserialize;
use std::path::Path;

/// Process-level harness settings. Both processes of a real deployment must
/// agree on capacity and message size out of band; nothing is negotiated on
/// the wire.
#[derive(Deserialize, Debug, Clone)]
pub struct HarnessConfig {
    /// Records per burst, and the receiver's snapshot boundary.
    #[serde(default = "defaults::message_count")]
    pub message_count: u64,
    /// Ring data capacity in bytes. Must be a power of two.
    #[serde(default = "defaults::ring_capacity")]
    pub ring_capacity: usize,
    /// Payload bytes per record (timestamp + filler + sequence).
    #[serde(default = "defaults::message_size")]
    pub message_size: usize,
    /// Inter-publish pacing delay; 0 publishes flat out.
    #[serde(default)]
    pub publish_delay_ns: u64,
    /// RTT samples are clamped to this ceiling.
    #[serde(default = "defaults::max_rtt_ns")]
    pub max_rtt_ns: u64,
    #[serde(default = "defaults::in_path")]
    pub in_path: String,
    #[serde(default = "defaults::out_path")]
    pub out_path: String,
    /// Snapshot artifacts land here, one file per boundary.
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub publisher_core: Option<usize>,
    #[serde(default)]
    pub echo_core: Option<usize>,
    #[serde(default)]
    pub receiver_core: Option<usize>,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

mod defaults {
    pub fn message_count() -> u64 {
        1 << 20
    }

    pub fn ring_capacity() -> usize {
        1 << 17
    }

    pub fn message_size() -> usize {
        256
    }

    pub fn max_rtt_ns() -> u64 {
        50_000_000
    }

    pub fn in_path() -> String {
        "/dev/shm/relay-in".into()
    }

    pub fn out_path() -> String {
        "/dev/shm/relay-out".into()
    }

    pub fn output_dir() -> String {
        "/tmp".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        // An empty document picks up every serde default.
        toml::from_str("").expect("defaults must deserialize")
    }
}

impl HarnessConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: HarnessConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fatal-at-construction checks; no retry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ring_capacity.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "ring_capacity {} is not a power of two",
                self.ring_capacity
            )));
        }
        if frame_bytes(self.message_size) > self.ring_capacity {
            return Err(ConfigError::Invalid(format!(
                "message_size {} (framed: {}) cannot fit ring_capacity {}",
                self.message_size,
                frame_bytes(self.message_size),
                self.ring_capacity
            )));
        }
        // Payload carries an 8-byte timestamp up front and an 8-byte
        // sequence at the end.
        if self.message_size < 16 {
            return Err(ConfigError::Invalid(format!(
                "message_size {} below the 16-byte timestamp+sequence minimum",
                self.message_size
            )));
        }
        if self.message_count == 0 {
            return Err(ConfigError::Invalid("message_count must be positive".into()));
        }
        // Core detection can fail on exotic hosts; skip the check rather
        // than reject every pin.
        let cores = relay_affinity::available_cores();
        if !cores.is_empty() {
            for (name, core) in [
                ("publisher_core", self.publisher_core),
                ("echo_core", self.echo_core),
                ("receiver_core", self.receiver_core),
            ] {
                if let Some(id) = core
                    && !cores.contains(&id)
                {
                    return Err(ConfigError::Invalid(format!(
                        "{name} {id} is not an available core (have {cores:?})"
                    )));
                }
            }
        }
        Ok(())
    }
}
