// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Waypoint discovery
//!
//! The pieces of the `waypoint-discovery` server that live outside of query handling: its
//! [configuration](config), the [records file](loader) and the [log sink](logging).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod config;
pub mod loader;
pub mod logging;

pub use config::{Config, ConfigError};
pub use loader::{FileSource, LoadError};
