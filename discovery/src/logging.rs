// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Log sink setup.
//!
//! With `--debug` human readable logs go to the console at debug level. Otherwise logs are
//! written as JSON lines to the configured file, or to standard error when there is none.

use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::Mutex,
};

use thiserror::Error;
use tracing_subscriber::{
    layer::{Layered, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

use crate::config::Logging;

/// A log layer stacked on top of the level filter.
pub type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Errors setting up the log sink.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("could not open log file {path}: {source}")]
    Open {
        /// Path of the log file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },
    /// A global subscriber was already installed.
    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// The level filter, `RUST_LOG` takes precedence over the configured level.
pub fn filter(config: &Logging, debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { config.level.as_str() };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The layer writing log lines to their destination.
pub fn layer(config: &Logging, debug: bool) -> Result<BoxedLayer, LoggingError> {
    if debug {
        return Ok(tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_target(false)
            .boxed());
    }
    let Some(path) = &config.file else {
        return Ok(tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .boxed());
    };

    let open = || -> io::Result<fs::File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    };
    let file = open().map_err(|source| LoggingError::Open {
        path: path.clone(),
        source,
    })?;
    Ok(tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .boxed())
}

/// Install the global log sink.
pub fn init(config: &Logging, debug: bool) -> Result<(), LoggingError> {
    let layer = layer(config, debug)?;
    tracing_subscriber::registry()
        .with(filter(config, debug))
        .with(layer)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("dns-server.log");
        let config = Logging {
            level: "info".to_string(),
            file: Some(path.clone()),
        };

        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(layer(&config, false).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(records = 3, "cache refreshed");
            tracing::debug!("not written");
        });

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let line: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["fields"]["message"], "cache refreshed");
        assert_eq!(line["fields"]["records"], 3);
    }

    #[test]
    fn unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Logging {
            level: "info".to_string(),
            // a directory cannot be opened for appending
            file: Some(dir.path().to_path_buf()),
        };
        assert!(matches!(
            layer(&config, false),
            Err(LoggingError::Open { .. })
        ));
    }
}
