//! HTTP server infrastructure for fxgap
//!
//! Thin wrapper around axum with graceful shutdown:
//!
//! - [`HttpServer`] - binds a router to a host/port and serves until the
//!   shutdown token fires
//! - [`ShutdownController`] - CancellationToken-based shutdown coordination,
//!   optionally wired to Ctrl+C
//!
//! # Example
//!
//! ```ignore
//! let shutdown = ShutdownController::with_ctrl_c();
//! let server = HttpServer::new("0.0.0.0", 8080, router);
//! server.run(shutdown.child_token()).await?;
//! ```

pub mod error;
pub mod http;
pub mod shutdown;

pub use error::{Result, ServerError};
pub use http::HttpServer;
pub use shutdown::ShutdownController;
