//! HTTP API for the rate monitor
//!
//! Three routes behind an open-CORS layer:
//!
//! - `POST /api/v1/compute` - stateless gap computation over two caller-supplied rates
//! - `GET /api/v1/rates` - snapshot served through the cache controller
//!   (`?refresh=force` for the manual path)
//! - `GET /health`

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
