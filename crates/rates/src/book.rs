//! Peer-offer aggregation
//!
//! Collapses a list of order book sell offers into one representative rate
//! via quantity-weighted averaging. Offers with a non-finite or non-positive
//! price or quantity are skipped silently; the upstream adapter hands them
//! through unfiltered so that the exclusion rule lives in exactly one place.

use crate::error::RateError;
use crate::types::PeerOffer;
use common::money::round_to_cents;

/// Quantity-weighted average price over the valid offers.
///
/// Accumulates in double precision and rounds once at the end, so the
/// result does not depend on offer order. Fails with
/// [`RateError::NoValidOffers`] when no offer survives the validity filter.
pub fn representative_rate(offers: &[PeerOffer]) -> Result<f64, RateError> {
    let mut weighted_sum = 0.0;
    let mut total_quantity = 0.0;

    for offer in offers {
        if offer.price.is_finite()
            && offer.price > 0.0
            && offer.quantity.is_finite()
            && offer.quantity > 0.0
        {
            weighted_sum += offer.price * offer.quantity;
            total_quantity += offer.quantity;
        }
    }

    if total_quantity == 0.0 {
        return Err(RateError::NoValidOffers);
    }

    Ok(round_to_cents(weighted_sum / total_quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn offer(price: f64, quantity: f64) -> PeerOffer {
        PeerOffer { price, quantity }
    }

    #[test]
    fn test_weighted_average() {
        // (50*100 + 52*50) / 150 = 50.666... -> 50.67
        let offers = vec![offer(50.0, 100.0), offer(52.0, 50.0)];
        assert_eq!(representative_rate(&offers).unwrap(), 50.67);
    }

    #[test]
    fn test_single_offer_is_its_own_average() {
        let offers = vec![offer(36.55, 1200.0)];
        assert_eq!(representative_rate(&offers).unwrap(), 36.55);
    }

    #[test]
    fn test_invalid_entries_are_skipped_not_errors() {
        let offers = vec![
            offer(50.0, 100.0),
            offer(0.0, 500.0),
            offer(-3.0, 10.0),
            offer(f64::NAN, 25.0),
            offer(51.0, f64::INFINITY),
            offer(52.0, 50.0),
        ];
        // Only the first and last survive
        assert_eq!(representative_rate(&offers).unwrap(), 50.67);
    }

    #[test]
    fn test_all_zero_quantity_fails() {
        let offers = vec![offer(50.0, 0.0), offer(52.0, 0.0)];
        assert_matches!(representative_rate(&offers), Err(RateError::NoValidOffers));
    }

    #[test]
    fn test_empty_list_fails() {
        assert_matches!(representative_rate(&[]), Err(RateError::NoValidOffers));
    }

    #[test]
    fn test_order_does_not_change_the_rounded_result() {
        let mut offers = vec![
            offer(36.10, 845.5),
            offer(36.25, 120.0),
            offer(36.90, 12.75),
            offer(37.05, 5000.0),
            offer(36.55, 433.1),
        ];
        let forward = representative_rate(&offers).unwrap();
        offers.reverse();
        let backward = representative_rate(&offers).unwrap();
        assert_eq!(forward, backward);
    }
}
