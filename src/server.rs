//! HTTP server setup and lifecycle management.

use std::net::SocketAddr;
use std::num::NonZeroU16;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::GatewayConfig;
use crate::error::GatekeeperError;
use crate::handlers::GatewayHandler;
use crate::rewriter::{HttpManifestRewriter, ManifestRewriter};
use crate::signer::UrlSigner;

pub struct Server {
    bind_address: String,
    port: NonZeroU16,
    config: GatewayConfig,
}

impl Server {
    pub fn new(cli: Cli) -> Result<Self, GatekeeperError> {
        let config = GatewayConfig::from_cli(&cli)?;
        Ok(Self {
            bind_address: cli.host,
            port: cli.port,
            config,
        })
    }

    #[cfg(test)]
    /// Create a server instance for testing that binds to a random available
    /// port.
    pub(crate) async fn test_mode(config: GatewayConfig) -> Result<(Self, u16), GatekeeperError> {
        let host = "127.0.0.1".to_string();
        let addr = format!("{host}:0");
        if let Ok(listener) = TcpListener::bind(&addr).await {
            let port = listener.local_addr()?.port();
            let server = Server {
                bind_address: host,
                port: NonZeroU16::try_from(port).map_err(|_| {
                    GatekeeperError::Other(format!("Failed to convert port '{port}' to NonZeroU16"))
                })?,
                config,
            };
            return Ok((server, port));
        }

        Err(GatekeeperError::Other(
            "Could not find an available port for testing".to_string(),
        ))
    }

    pub async fn run(self) -> Result<(), GatekeeperError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        let addr: SocketAddr = addr.parse().map_err(|err| {
            GatekeeperError::Configuration(format!("Failed to parse address '{addr}': {err}"))
        })?;

        let config = Arc::new(self.config);

        // Key material is validated here, before the listener binds. Invalid
        // keys must never serve traffic.
        let signer = Arc::new(UrlSigner::new(&config)?);
        let rewriter: Arc<dyn ManifestRewriter> = Arc::new(HttpManifestRewriter::new()?);
        let handler = Arc::new(GatewayHandler::new(config.clone(), signer, rewriter));

        info!(
            origin = %config.origin,
            key_pair_id = %config.key_pair_id,
            address = %addr,
            "Starting hlsgate..."
        );

        let listener = TcpListener::bind(addr).await?;

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!(remote_addr = %remote_addr, "Accepted new connection");

            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move { handler.handle_request(req).await }
                        }),
                    )
                    .await
                {
                    debug!(error = %err, remote_addr = %remote_addr, "Error serving connection");
                }
            });
        }
    }
}
