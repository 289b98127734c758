//! HTTP server built on axum
//!
//! Wraps an axum [`Router`] with listener binding, bound-address
//! introspection (port 0 binds an ephemeral port, useful in tests) and
//! graceful shutdown through a [`CancellationToken`].

use axum::Router;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Result, ServerError};

/// HTTP server with graceful shutdown
#[derive(Clone)]
pub struct HttpServer {
    host: String,
    port: u16,
    router: Router,
    bound_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl HttpServer {
    /// Create a server for the given host, port and router
    pub fn new(host: impl Into<String>, port: u16, router: Router) -> Self {
        Self {
            host: host.into(),
            port,
            router,
            bound_addr: Arc::new(RwLock::new(None)),
        }
    }

    /// The address the listener is actually bound to.
    ///
    /// `None` until [`run`](Self::run) has bound the listener. With port 0
    /// this is the only way to learn the assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    /// Serve until the token is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.port)))?;

        let listener = TcpListener::bind(&addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "HTTP server listening");

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        *self.bound_addr.write() = None;

        match result {
            Ok(()) => {
                info!("HTTP server shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(%e, "HTTP server error");
                Err(ServerError::Io(e))
            }
        }
    }

    /// Spawn the server onto the runtime, returning the join handle and a
    /// token that stops it
    pub fn spawn(self) -> (JoinHandle<Result<()>>, CancellationToken) {
        let token = CancellationToken::new();
        let run_token = token.clone();
        let handle = tokio::spawn(async move { self.run(run_token).await });
        (handle, token)
    }
}
