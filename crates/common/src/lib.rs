//! Common utilities for fxgap
//!
//! This crate provides the currency rounding routine shared across all
//! fxgap crates.
//!
//! # Modules
//!
//! - [`money`] - Currency rounding (2 fractional digits, ties away from zero)

pub mod money;

pub use money::{round_to_cents, round_to_unit};
