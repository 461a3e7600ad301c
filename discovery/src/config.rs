// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration from file.
//!
//! Every section and every field is optional:
//!
//! ```json
//! {
//!   "server":  { "address": "127.0.0.1", "port": 8053, "drain_timeout_secs": 5, "max_in_flight": 1024 },
//!   "cache":   { "default_ttl": 300, "records_file": "records.json", "refresh_interval_secs": 60 },
//!   "dns":     { "strict_header": true },
//!   "logging": { "level": "info", "file": "dns-server.log" }
//! }
//! ```

use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use waypoint::HeaderPolicy;

/// Errors loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// Path of the file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// The contents are not a valid configuration.
    #[error("could not parse the configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// The whole configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// UDP server
    pub server: Server,
    /// Records and their refresh
    pub cache: Cache,
    /// Query handling
    pub dns: Dns,
    /// Log output
    pub logging: Logging,
}

/// UDP server settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Server {
    /// IP address to listen on
    pub address: IpAddr,
    /// UDP port to listen on
    pub port: u16,
    /// Seconds to wait for queries in flight on shutdown, `null` to wait for all of them
    pub drain_timeout_secs: Option<u64>,
    /// Maximum number of queries answered at the same time
    pub max_in_flight: usize,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8053,
            drain_timeout_secs: Some(5),
            max_in_flight: 1024,
        }
    }
}

impl Server {
    /// Address to bind to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Drain limit on shutdown.
    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_secs.map(Duration::from_secs)
    }
}

/// Record store settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Cache {
    /// TTL in seconds for records that do not set one
    pub default_ttl: u64,
    /// JSON file with the records, without one every query is answered with NXDOMAIN
    pub records_file: Option<PathBuf>,
    /// Seconds between reloads of the records file
    pub refresh_interval_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            default_ttl: 300,
            records_file: None,
            refresh_interval_secs: 60,
        }
    }
}

impl Cache {
    /// TTL of records that do not set one.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Time between reloads.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Query handling settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Dns {
    /// Reject queries without questions, with more than 9 or with an unknown opcode
    pub strict_header: bool,
}

impl Default for Dns {
    fn default() -> Self {
        Dns {
            strict_header: true,
        }
    }
}

impl Dns {
    /// How query headers are validated.
    pub fn policy(&self) -> HeaderPolicy {
        if self.strict_header {
            HeaderPolicy::Strict
        } else {
            HeaderPolicy::Lenient
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    /// Minimum level, overridden by `RUST_LOG`
    pub level: String,
    /// File receiving JSON lines, `null` for standard error
    pub file: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: "info".to_string(),
            file: Some(PathBuf::from("dns-server.log")),
        }
    }
}

impl Config {
    /// Read and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::parse(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON text, without validating it.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            Err(ConfigError::Invalid("server.port must not be 0"))?
        }
        if self.server.max_in_flight == 0 {
            Err(ConfigError::Invalid("server.max_in_flight must not be 0"))?
        }
        if self.cache.default_ttl == 0 {
            Err(ConfigError::Invalid("cache.default_ttl must be positive"))?
        }
        if self.cache.refresh_interval_secs == 0 {
            Err(ConfigError::Invalid("cache.refresh_interval_secs must be positive"))?
        }
        Ok(())
    }
}
