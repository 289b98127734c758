//! Official rate source - trait and implementations

use crate::error::RateError;
use async_trait::async_trait;

/// Source of the centrally-published exchange rate - protocol agnostic
#[async_trait]
pub trait OfficialRateSource: Send + Sync {
    /// Fetch the current official rate, rounded to cents.
    ///
    /// One network call, no internal retry. A non-finite or non-positive
    /// value from the provider is an [`RateError::InvalidValue`].
    async fn fetch_rate(&self) -> Result<f64, RateError>;
}

// ==================== Mock Implementation ====================

/// Mock official rate source for testing
pub struct MockOfficialRateSource {
    result: parking_lot::Mutex<Result<f64, RateError>>,
    calls: std::sync::atomic::AtomicUsize,
    delay: std::time::Duration,
}

impl MockOfficialRateSource {
    /// Create a mock returning the given rate
    pub fn new(rate: f64) -> Self {
        Self {
            result: parking_lot::Mutex::new(Ok(rate)),
            calls: std::sync::atomic::AtomicUsize::new(0),
            delay: std::time::Duration::from_millis(5),
        }
    }

    /// Create a mock that always fails
    pub fn failing(error: RateError) -> Self {
        Self {
            result: parking_lot::Mutex::new(Err(error)),
            calls: std::sync::atomic::AtomicUsize::new(0),
            delay: std::time::Duration::from_millis(5),
        }
    }

    /// Configure the simulated network delay
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change what subsequent fetches return
    pub fn set_result(&self, result: Result<f64, RateError>) {
        *self.result.lock() = result;
    }

    /// Number of fetches issued so far
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl OfficialRateSource for MockOfficialRateSource {
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        // Simulate the network round-trip
        tokio::time::sleep(self.delay).await;

        self.result.lock().clone()
    }
}

// ==================== HTTP Implementation ====================

#[cfg(feature = "client")]
pub mod http {
    use super::OfficialRateSource;
    use crate::error::{Provider, RateError};
    use async_trait::async_trait;
    use common::money::round_to_cents;
    use reqwest::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// Response body of the official-rate provider
    #[derive(Debug, Deserialize)]
    pub(crate) struct OfficialRateEnvelope {
        pub dollar: String,
    }

    /// HTTP-backed official rate source
    pub struct HttpOfficialRateSource {
        client: Client,
        url: String,
        timeout: Duration,
    }

    impl HttpOfficialRateSource {
        pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
            Self {
                client: Client::new(),
                url: url.into(),
                timeout,
            }
        }
    }

    #[async_trait]
    impl OfficialRateSource for HttpOfficialRateSource {
        async fn fetch_rate(&self) -> Result<f64, RateError> {
            let response = self
                .client
                .get(&self.url)
                .header("Accept", "application/json")
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| RateError::unavailable(Provider::Official, None, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RateError::unavailable(
                    Provider::Official,
                    Some(status.as_u16()),
                    format!("request failed with status {}", status),
                ));
            }

            let envelope: OfficialRateEnvelope = response
                .json()
                .await
                .map_err(|e| RateError::malformed(Provider::Official, e.to_string()))?;

            let rate: f64 = envelope
                .dollar
                .trim()
                .parse()
                .unwrap_or(f64::NAN);

            if !(rate.is_finite() && rate > 0.0) {
                return Err(RateError::InvalidValue {
                    provider: Provider::Official,
                });
            }

            Ok(round_to_cents(rate))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Provider;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_mock_returns_configured_rate() {
        let source = MockOfficialRateSource::new(36.58);
        assert_eq!(source.fetch_rate().await.unwrap(), 36.58);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_and_recovery() {
        let source = MockOfficialRateSource::failing(RateError::unavailable(
            Provider::Official,
            Some(503),
            "maintenance window",
        ));

        assert_matches!(
            source.fetch_rate().await,
            Err(RateError::Unavailable { status: Some(503), .. })
        );

        source.set_result(Ok(36.60));
        assert_eq!(source.fetch_rate().await.unwrap(), 36.60);
        assert_eq!(source.call_count(), 2);
    }
}
