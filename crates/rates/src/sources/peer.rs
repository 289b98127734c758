//! Peer market rate source - trait and implementations

use crate::error::RateError;
use crate::types::PeerOffer;
use async_trait::async_trait;

/// Source of peer-to-peer order book sell offers - protocol agnostic
#[async_trait]
pub trait PeerMarketSource: Send + Sync {
    /// Fetch the top-ranked sell offers for the monitored pair.
    ///
    /// `filter_amount` is an optional transaction-amount hint in fiat units.
    /// Implementations must round it to a whole unit before forwarding -
    /// the upstream search returns zero matches for fractional amounts.
    async fn fetch_offers(&self, filter_amount: Option<f64>) -> Result<Vec<PeerOffer>, RateError>;
}

// ==================== Mock Implementation ====================

/// Mock peer market source for testing
pub struct MockPeerMarketSource {
    result: parking_lot::Mutex<Result<Vec<PeerOffer>, RateError>>,
    calls: std::sync::atomic::AtomicUsize,
    last_filter: parking_lot::Mutex<Option<Option<f64>>>,
    delay: std::time::Duration,
}

impl MockPeerMarketSource {
    /// Create a mock returning the given offers
    pub fn new(offers: Vec<PeerOffer>) -> Self {
        Self {
            result: parking_lot::Mutex::new(Ok(offers)),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_filter: parking_lot::Mutex::new(None),
            delay: std::time::Duration::from_millis(5),
        }
    }

    /// Create a mock that always fails
    pub fn failing(error: RateError) -> Self {
        Self {
            result: parking_lot::Mutex::new(Err(error)),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_filter: parking_lot::Mutex::new(None),
            delay: std::time::Duration::from_millis(5),
        }
    }

    /// Configure the simulated network delay
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change what subsequent fetches return
    pub fn set_result(&self, result: Result<Vec<PeerOffer>, RateError>) {
        *self.result.lock() = result;
    }

    /// Number of fetches issued so far
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// The `filter_amount` the most recent fetch was called with
    pub fn last_filter(&self) -> Option<Option<f64>> {
        *self.last_filter.lock()
    }
}

#[async_trait]
impl PeerMarketSource for MockPeerMarketSource {
    async fn fetch_offers(&self, filter_amount: Option<f64>) -> Result<Vec<PeerOffer>, RateError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_filter.lock() = Some(filter_amount);

        // Simulate the network round-trip
        tokio::time::sleep(self.delay).await;

        self.result.lock().clone()
    }
}

// ==================== HTTP Implementation ====================

#[cfg(feature = "client")]
pub mod http {
    use super::PeerMarketSource;
    use crate::error::{Provider, RateError};
    use crate::types::{PeerOffer, TOP_OFFER_COUNT};
    use async_trait::async_trait;
    use common::money::round_to_unit;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    /// Envelope code indicating a successful search
    const SUCCESS_CODE: &str = "000000";

    /// Where and what to search on the peer-to-peer venue
    #[derive(Debug, Clone)]
    pub struct PeerMarketEndpoint {
        /// Order book search endpoint (POST)
        pub url: String,
        /// Fiat currency code, e.g. "VES"
        pub fiat: String,
        /// Quoted asset code, e.g. "USDT"
        pub asset: String,
        /// Number of top-ranked offers to request
        pub rows: u32,
        /// Request timeout
        pub timeout: Duration,
    }

    /// Search payload understood by the order book endpoint.
    ///
    /// The venue silently ignores unknown filters but rejects missing ones,
    /// so the full filter set is sent even where we only ever use defaults.
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct OfferSearchRequest {
        fiat: String,
        page: u32,
        rows: u32,
        trade_type: String,
        asset: String,
        countries: Vec<String>,
        pro_merchant_ads: bool,
        shield_merchant_ads: bool,
        filter_type: String,
        periods: Vec<String>,
        additional_kyc_verify_filter: u8,
        publisher_type: String,
        pay_types: Vec<String>,
        classifies: Vec<String>,
        traded_with: bool,
        followed: bool,
        /// Whole fiat units as a decimal string; empty means unfiltered
        trans_amount: String,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct OfferSearchResponse {
        pub code: String,
        #[serde(default)]
        pub data: Vec<OfferRow>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct OfferRow {
        pub adv: Advertisement,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Advertisement {
        pub price: String,
        pub tradable_quantity: String,
    }

    /// HTTP-backed peer market source
    pub struct HttpPeerMarketSource {
        client: Client,
        endpoint: PeerMarketEndpoint,
    }

    impl HttpPeerMarketSource {
        pub fn new(endpoint: PeerMarketEndpoint) -> Self {
            Self {
                client: Client::new(),
                endpoint,
            }
        }

        fn build_request(&self, filter_amount: Option<f64>) -> OfferSearchRequest {
            OfferSearchRequest {
                fiat: self.endpoint.fiat.clone(),
                page: 1,
                rows: self.endpoint.rows,
                trade_type: "SELL".to_string(),
                asset: self.endpoint.asset.clone(),
                countries: Vec::new(),
                pro_merchant_ads: false,
                shield_merchant_ads: false,
                filter_type: "tradable".to_string(),
                periods: Vec::new(),
                additional_kyc_verify_filter: 0,
                publisher_type: "merchant".to_string(),
                pay_types: Vec::new(),
                classifies: vec![
                    "mass".to_string(),
                    "profession".to_string(),
                    "fiat_trade".to_string(),
                ],
                traded_with: false,
                followed: false,
                trans_amount: filter_amount
                    .map(|amount| format!("{}", round_to_unit(amount) as i64))
                    .unwrap_or_default(),
            }
        }
    }

    #[async_trait]
    impl PeerMarketSource for HttpPeerMarketSource {
        async fn fetch_offers(
            &self,
            filter_amount: Option<f64>,
        ) -> Result<Vec<PeerOffer>, RateError> {
            let payload = self.build_request(filter_amount);

            let response = self
                .client
                .post(&self.endpoint.url)
                .json(&payload)
                .timeout(self.endpoint.timeout)
                .send()
                .await
                .map_err(|e| RateError::unavailable(Provider::PeerMarket, None, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RateError::unavailable(
                    Provider::PeerMarket,
                    Some(status.as_u16()),
                    format!("request failed with status {}", status),
                ));
            }

            let envelope: OfferSearchResponse = response
                .json()
                .await
                .map_err(|e| RateError::malformed(Provider::PeerMarket, e.to_string()))?;

            if envelope.code != SUCCESS_CODE {
                return Err(RateError::malformed(
                    Provider::PeerMarket,
                    format!("search returned code {}", envelope.code),
                ));
            }
            if envelope.data.is_empty() {
                return Err(RateError::malformed(
                    Provider::PeerMarket,
                    "search returned no offers",
                ));
            }

            // Unparseable numbers become NaN on purpose: the aggregator owns
            // the rule for excluding invalid entries.
            let offers = envelope
                .data
                .into_iter()
                .take(TOP_OFFER_COUNT)
                .map(|row| PeerOffer {
                    price: row.adv.price.trim().parse().unwrap_or(f64::NAN),
                    quantity: row.adv.tradable_quantity.trim().parse().unwrap_or(f64::NAN),
                })
                .collect();

            Ok(offers)
        }
    }

}
