//! Gap computation engine
//!
//! Pure function from two rates to the derived metrics. The recommendation
//! thresholds compare against the ROUNDED purchasing power, so a raw value
//! of 89.996 rounds to 90.00 and stays Neutral.

use crate::error::RateError;
use crate::types::{GapMetrics, Recommendation};
use common::money::round_to_cents;

/// Purchasing power below this is a buy-official signal
const BUY_OFFICIAL_BELOW: f64 = 60.0;

/// Purchasing power above this is a sell-parallel signal
const SELL_PARALLEL_ABOVE: f64 = 90.0;

/// Derive gap spread, purchasing power and a recommendation from the two
/// market rates.
///
/// Both inputs must be finite and positive; anything else is rejected with
/// [`RateError::Validation`]. Both output percentages are rounded to cents.
pub fn compute(official_rate: f64, parallel_rate: f64) -> Result<GapMetrics, RateError> {
    if !(official_rate.is_finite() && official_rate > 0.0) {
        return Err(RateError::Validation(format!(
            "official rate must be a positive finite number, got {}",
            official_rate
        )));
    }
    if !(parallel_rate.is_finite() && parallel_rate > 0.0) {
        return Err(RateError::Validation(format!(
            "parallel rate must be a positive finite number, got {}",
            parallel_rate
        )));
    }

    let gap_spread_pct = round_to_cents(100.0 * (parallel_rate - official_rate) / official_rate);
    let purchasing_power_pct = round_to_cents(100.0 * official_rate / parallel_rate);

    let recommendation = if purchasing_power_pct < BUY_OFFICIAL_BELOW {
        Recommendation::BuyOfficial
    } else if purchasing_power_pct > SELL_PARALLEL_ABOVE {
        Recommendation::SellParallel
    } else {
        Recommendation::Neutral
    };

    Ok(GapMetrics {
        gap_spread_pct,
        purchasing_power_pct,
        recommendation,
    })
}
