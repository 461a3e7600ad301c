// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Records read from a JSON file.
//!
//! The file holds an array of records:
//!
//! ```json
//! [
//!   { "domain": "db.internal", "qtype": 1, "value": "10.0.0.7", "ttl": 60 },
//!   { "domain": "db.internal", "qtype": 28, "value": "fd00::7" },
//!   { "domain": "flags.internal", "qtype": 16, "value": "new-checkout=on" },
//!   { "domain": "primary.db.internal", "qtype": 5, "value": "db.internal" }
//! ]
//! ```
//!
//! Records without a `ttl` use the configured default. Records that cannot be served are
//! skipped with a warning, the rest of the file is still loaded.

use std::{
    fs,
    net::{Ipv4Addr, Ipv6Addr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use waypoint::{CacheKey, Name, QType, Record, RecordSource, Records, SerializeError};

const MAX_TXT_SIZE: usize = 255;

/// Errors that fail a whole load.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// Path of the file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not an array of records.
    #[error("could not parse records in {path}: {source}")]
    Parse {
        /// Path of the file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: serde_json::Error,
    },
}

// Why a single record is left out.
#[derive(Error, Debug, PartialEq, Eq)]
enum Skip {
    #[error("empty domain")]
    EmptyDomain,
    #[error("ttl {0} is not positive")]
    Ttl(i64),
    #[error("unknown qtype {0}")]
    UnknownType(u16),
    #[error("records of type {0:?} cannot be loaded")]
    Unsupported(QType),
    #[error("invalid IPv4 address")]
    Ipv4,
    #[error("invalid IPv6 address")]
    Ipv6,
    #[error("text is {0} bytes long, the maximum is 255")]
    TxtTooLong(usize),
    #[error("invalid domain name: {0}")]
    Name(#[from] SerializeError),
}

// Missing keys take their zero value and the entry is skipped on its own.
#[derive(Debug, Deserialize)]
struct FileRecord {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    qtype: u16,
    #[serde(default)]
    value: String,
    #[serde(default)]
    ttl: Option<i64>,
}

/// A [RecordSource] reading a JSON records file.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    default_ttl: Duration,
}

impl FileSource {
    /// Read records from `path`, giving `default_ttl` to those without a TTL.
    pub fn new(path: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        FileSource {
            path: path.into(),
            default_ttl,
        }
    }

    /// The records file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the contents of a records file.
    pub fn parse(&self, text: &str) -> Result<Records, LoadError> {
        let entries: Vec<FileRecord> =
            serde_json::from_str(text).map_err(|source| LoadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let mut records = Records::with_capacity(entries.len());
        for entry in entries {
            match self.record(&entry) {
                Ok((key, record)) => {
                    records.insert(key, record);
                }
                Err(reason) => warn!(
                    domain = %entry.domain,
                    qtype = entry.qtype,
                    %reason,
                    "skipping record"
                ),
            }
        }
        Ok(records)
    }

    fn record(&self, entry: &FileRecord) -> Result<(CacheKey, Record), Skip> {
        if entry.domain.is_empty() {
            Err(Skip::EmptyDomain)?
        }
        let ttl = match entry.ttl {
            None => self.default_ttl,
            Some(ttl) if ttl <= 0 => Err(Skip::Ttl(ttl))?,
            Some(ttl) => Duration::from_secs(ttl as u64),
        };
        let qtype = QType::try_from(entry.qtype).map_err(|_| Skip::UnknownType(entry.qtype))?;
        let value = encode(qtype, &entry.value)?;
        Ok((CacheKey::new(&entry.domain, qtype), Record::new(value, ttl)))
    }
}

impl RecordSource for FileSource {
    type Error = LoadError;

    fn load(&self) -> Result<Records, LoadError> {
        let text = fs::read_to_string(&self.path).map_err(|source| LoadError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records = self.parse(&text)?;
        info!(path = %self.path.display(), records = records.len(), "loaded records");
        Ok(records)
    }
}

// The value as it is written in RDATA.
fn encode(qtype: QType, value: &str) -> Result<Vec<u8>, Skip> {
    match qtype {
        QType::A => {
            let ip: Ipv4Addr = value.parse().map_err(|_| Skip::Ipv4)?;
            Ok(ip.octets().to_vec())
        }
        QType::Aaaa => {
            let ip: Ipv6Addr = value.parse().map_err(|_| Skip::Ipv6)?;
            Ok(ip.octets().to_vec())
        }
        QType::Txt if value.len() > MAX_TXT_SIZE => Err(Skip::TxtTooLong(value.len())),
        QType::Txt => Ok(value.as_bytes().to_vec()),
        QType::Cname | QType::Ns => {
            let mut target = Vec::new();
            Name::from(value).serialize(&mut target)?;
            Ok(target)
        }
        QType::Soa | QType::Mx => Err(Skip::Unsupported(qtype)),
    }
}
