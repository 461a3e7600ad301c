// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The UDP dispatcher answering each datagram in its own task.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{net::UdpSocket, sync::Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, trace, warn};

use crate::{RequestContext, ServerError};

const MAX_DATAGRAM: usize = 512;
const DEFAULT_MAX_IN_FLIGHT: usize = 1024;
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A DNS service, it receives the bytes of a query and may return the bytes of a response.
///
/// ```rust
/// use std::future::{ready, Future};
/// use std::net::SocketAddr;
/// use waypoint::{RequestContext, ServerService};
///
/// struct Echo;
///
/// impl ServerService for Echo {
///     fn run(
///         &self,
///         _ctx: RequestContext,
///         _client: SocketAddr,
///         query: Vec<u8>,
///     ) -> impl Future<Output = Option<Vec<u8>>> + Send {
///         ready(Some(query))
///     }
/// }
/// ```
pub trait ServerService: Send + Sync + 'static {
    /// Take the `query` sent by `client` and return the response to be sent back, if any.
    fn run(
        &self,
        ctx: RequestContext,
        client: SocketAddr,
        query: Vec<u8>,
    ) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub struct Builder;
#[doc(hidden)]
#[derive(Debug)]
pub struct Runner {
    socket: UdpSocket,
}

/// A DNS server over UDP.
///
/// Every datagram is answered in its own task. Once the shutdown token passed to
/// [Server::serve] is cancelled no more datagrams are read, and the server waits for the
/// queries already being answered before it returns and closes the socket.
#[derive(Debug)]
pub struct Server<S> {
    drain_timeout: Option<Duration>,
    max_in_flight: usize,
    state: S,
}

impl Server<Builder> {
    /// Create a new [Server]
    pub fn new() -> Self {
        Server::default()
    }
}

impl Default for Server<Builder> {
    fn default() -> Self {
        Server {
            drain_timeout: Some(DEFAULT_DRAIN_TIMEOUT),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            state: Builder,
        }
    }
}

impl Server<Builder> {
    /// Maximum time to wait for queries in flight on shutdown, `None` waits forever.
    ///
    /// Queries still unanswered when it elapses are abandoned.
    pub fn drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Maximum number of queries being answered at the same time.
    ///
    /// When reached the server stops reading until one of them finishes.
    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Bind to a [SocketAddr] to listen for queries.
    pub async fn bind(self, addr: SocketAddr) -> Result<Server<Runner>, ServerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Server {
            drain_timeout: self.drain_timeout,
            max_in_flight: self.max_in_flight,
            state: Runner { socket },
        })
    }
}

impl Server<Runner> {
    /// The address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.state.socket.local_addr()?)
    }

    /// Answer queries with `srv` until `shutdown` is cancelled.
    ///
    /// Errors answering a single query, including sending its response, are logged and only
    /// affect that query.
    pub async fn serve<T>(self, srv: Arc<T>, shutdown: CancellationToken)
    where
        T: ServerService,
    {
        let socket = Arc::new(self.state.socket);
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let tracker = TaskTracker::new();
        let mut buff = [0; MAX_DATAGRAM];
        let mut request_id = 0u64;

        match socket.local_addr() {
            Ok(addr) => info!(%addr, "listening"),
            Err(_) => info!("listening"),
        }

        loop {
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            // The semaphore is never closed.
            let Ok(permit) = permit else { break };

            let (n, client) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = socket.recv_from(&mut buff) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!(error = %e, "failed to receive datagram");
                        continue;
                    }
                },
            };

            request_id += 1;
            let ctx = RequestContext::new(request_id);
            let query = buff[..n].to_vec();
            trace!(request_id, %client, query = %hex::encode(&query), "datagram received");
            let srv = Arc::clone(&srv);
            let socket = Arc::clone(&socket);
            tracker.spawn(async move {
                let _permit = permit;
                let Some(response) = srv.run(ctx, client, query).await else {
                    return;
                };
                match socket.send_to(&response, client).await {
                    Ok(sent) => debug!(
                        request_id = ctx.request_id,
                        %client,
                        bytes = sent,
                        "response sent"
                    ),
                    Err(e) => error!(
                        request_id = ctx.request_id,
                        %client,
                        error = %e,
                        "failed to send response"
                    ),
                }
            });
        }

        tracker.close();
        info!(in_flight = tracker.len(), "draining");
        match self.drain_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, tracker.wait()).await.is_err() {
                    warn!(
                        abandoned = tracker.len(),
                        "drain timed out, abandoning queries in flight"
                    );
                }
            }
            None => tracker.wait().await,
        }
        drop(socket);
        info!("stopped");
    }
}
