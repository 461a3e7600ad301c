// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Waypoint
//!
//! Answer DNS queries from an in-memory [Cache] of records.
//!
//! A [Server] owns the UDP socket and hands every datagram to a [ServerService] in its own
//! task. The [Resolver] is the service that decodes the query, looks every question up in the
//! [Cache] and encodes the response.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use waypoint::{Cache, QType, Resolver, Server};
//!
//! # async fn run() -> Result<(), waypoint::ServerError> {
//! let cache = Arc::new(Cache::new());
//! cache.set("db.internal", QType::A, [10, 0, 0, 7], Duration::from_secs(300));
//!
//! let shutdown = CancellationToken::new();
//! Server::default()
//!     .bind("127.0.0.1:8053".parse().unwrap())
//!     .await?
//!     .serve(Arc::new(Resolver::new(cache)), shutdown)
//!     .await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

use std::{io, net::SocketAddr};

use thiserror::Error;

pub mod cache;
mod context;
pub mod resolver;
pub mod response;
mod server;

pub use cache::{Cache, CacheKey, Record, RecordSource, Records, Refresher};
pub use context::RequestContext;
pub use resolver::Resolver;
pub use server::{Builder, Runner, Server, ServerService};
pub use waypoint_parser::*;

/// Errors that keep a single query from being answered.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The query could not be decoded.
    #[error("could not decode query: {0}")]
    Parse(#[from] ParseError),
    /// The response could not be encoded.
    #[error("could not encode response: {0}")]
    Serialize(#[from] SerializeError),
    /// There is nothing to answer.
    #[error("query has no questions")]
    NoQuestions,
}

/// Errors of the [Server] itself.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The socket could not be bound.
    #[error("could not bind to {addr}: {source}")]
    Bind {
        /// The address that was requested
        addr: SocketAddr,
        /// The underlying error
        #[source]
        source: io::Error,
    },
    /// Any other socket error.
    #[error(transparent)]
    Io(#[from] io::Error),
}
