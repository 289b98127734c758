//! Graceful shutdown coordination
//!
//! Built on `tokio_util::sync::CancellationToken`: tokens clone cheaply,
//! child tokens cancel with their parent, and cancellation can be observed
//! from any number of tasks.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates graceful shutdown across the server and background workers.
#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a controller that is only cancelled manually
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a controller that also cancels on Ctrl+C
    pub fn with_ctrl_c() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    token.cancel();
                }
                Err(e) => {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
            }
        });

        controller
    }

    /// Child token, cancelled when this controller shuts down.
    ///
    /// A child can also be cancelled on its own without affecting siblings.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Clone of the root token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown manually
    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }

    /// Whether shutdown has been triggered
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is triggered
    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }
}
