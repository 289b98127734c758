//! Observability infrastructure for fxgap
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics with a monitor-specific metric set
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("fxgap", LogFormat::Pretty)?;
//!
//! // Optional Prometheus endpoint
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, MonitorMetrics};
