// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

use std::{fmt, net::IpAddr, path::PathBuf, sync::Arc};

use argh::FromArgs;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use waypoint::{cache, Cache, Refresher, Resolver, Server, ServerError};
use waypoint_discovery::{logging, Config, ConfigError, FileSource};

#[derive(Clone, Debug, FromArgs)]
/// Answer DNS queries for service endpoints, feature flags and configuration values
struct Args {
    /// path to the JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
    /// ip to listen to, overrides the configuration
    #[argh(option, short = 'a')]
    address: Option<IpAddr>,
    /// UDP port to listen to, overrides the configuration
    #[argh(option, short = 'p')]
    port: Option<u16>,
    /// number of threads in the runtime
    #[argh(option, short = 't', default = "num_cpus::get()")]
    threads: usize,
    /// log at debug level to the console
    #[argh(switch)]
    debug: bool,
}

fn main() {
    let args: Args = argh::from_env();

    let config = match configure(&args) {
        Ok(config) => config,
        Err(e) => fatal("Could not load the configuration", e),
    };

    if let Err(e) = logging::init(&config.logging, args.debug) {
        fatal("Could not set up logging", e)
    }
    info!(
        address = %config.server.address,
        port = config.server.port,
        debug = args.debug,
        threads = args.threads,
        "configuration loaded"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.threads.max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => fatal("Could not start the runtime", e),
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!(error = %e, "server failed");
        fatal("Could not bind to the specified interface or port", e)
    }
}

fn configure(args: &Args) -> Result<Config, ConfigError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> Result<(), ServerError> {
    let cache = Arc::new(Cache::new());

    let refresher = match &config.cache.records_file {
        Some(path) => {
            let source = Arc::new(FileSource::new(path, config.cache.default_ttl()));
            if !cache::refresh(&cache, &source).await {
                warn!("starting without records");
            }
            Some(Refresher::spawn(
                Arc::clone(&cache),
                source,
                config.cache.refresh_interval(),
            ))
        }
        None => {
            warn!("no records file configured, every query will be answered with NXDOMAIN");
            None
        }
    };

    let resolver = Resolver::new(Arc::clone(&cache)).policy(config.dns.policy());
    let server = Server::default()
        .drain_timeout(config.server.drain_timeout())
        .max_in_flight(config.server.max_in_flight)
        .bind(config.server.listen_addr())
        .await;
    let server = match server {
        Ok(server) => server,
        Err(e) => {
            if let Some(refresher) = refresher {
                refresher.join().await;
            }
            return Err(e);
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));
    server.serve(Arc::new(resolver), shutdown).await;

    if let Some(refresher) = refresher {
        refresher.join().await;
    }
    info!("shutdown complete");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "could not listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}

fn fatal(context: &str, error: impl fmt::Display) -> ! {
    eprintln!("{}: {}.\n\n{}", "ERROR".red(), context, error);
    std::process::exit(1)
}
