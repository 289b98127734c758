//! API routes for the rate monitor

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::*;

/// Create the monitor router.
///
/// CORS is wide open: any origin, `GET`/`POST`/`OPTIONS`. The layer answers
/// preflight requests itself.
pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/compute", post(compute_rates))
        .route("/api/v1/rates", get(get_rates))
        .layer(cors)
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{Provider, RateError};
    use crate::monitor::RateMonitor;
    use crate::sources::{MockOfficialRateSource, MockPeerMarketSource};
    use crate::store::InMemorySnapshotStore;
    use crate::types::{PeerOffer, DEFAULT_TTL_MINUTES, REFERENCE_AMOUNT};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_monitor() -> (RateMonitor, Arc<MockOfficialRateSource>) {
        let official = Arc::new(MockOfficialRateSource::new(40.0));
        let peer = Arc::new(MockPeerMarketSource::new(vec![
            PeerOffer {
                price: 50.0,
                quantity: 100.0,
            },
            PeerOffer {
                price: 52.0,
                quantity: 50.0,
            },
        ]));
        let monitor = RateMonitor::with_settings(
            official.clone(),
            peer,
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        );
        (monitor, official)
    }

    fn test_router() -> (Router, Arc<MockOfficialRateSource>) {
        let (monitor, official) = test_monitor();
        let router = create_router(ApiState {
            monitor,
            service_name: "fxgap".to_string(),
        });
        (router, official)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_compute(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/compute")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = test_router();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "fxgap");
    }

    #[tokio::test]
    async fn test_compute_reference_values() {
        let (router, _) = test_router();

        let response = router
            .oneshot(post_compute(
                json!({ "official_rate": 40.0, "parallel_rate": 50.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["rates"]["official_rate"], 40.0);
        assert_eq!(body["rates"]["parallel_rate"], 50.0);
        assert_eq!(body["rates"]["gap_spread_pct"], 25.0);
        assert_eq!(body["rates"]["purchasing_power_pct"], 80.0);
        assert_eq!(body["rates"]["recommendation"], "NEUTRAL");
    }

    #[tokio::test]
    async fn test_compute_rejects_non_positive_input() {
        let (router, _) = test_router();

        let response = router
            .oneshot(post_compute(
                json!({ "official_rate": -1.0, "parallel_rate": 50.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_rates_serves_fresh_snapshot() {
        let (router, _) = test_router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/rates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["served_from"], "fresh");
        assert_eq!(body["rates"]["parallel_rate"], 50.67);
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn test_get_rates_hard_failure_is_503() {
        let (router, official) = test_router();
        official.set_result(Err(RateError::unavailable(
            Provider::Official,
            Some(502),
            "bad gateway",
        )));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/rates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_get_rates_force_refresh_bypasses_cache() {
        let (monitor, official) = test_monitor();
        let router = create_router(ApiState {
            monitor: monitor.clone(),
            service_name: "fxgap".to_string(),
        });

        // Prime the cache
        monitor.current().await.unwrap();
        assert_eq!(official.call_count(), 1);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/rates?refresh=force")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(official.call_count(), 2);
    }

    #[tokio::test]
    async fn test_get_rates_stale_serve_carries_warning() {
        let official = Arc::new(MockOfficialRateSource::new(40.0));
        let peer = Arc::new(MockPeerMarketSource::new(vec![PeerOffer {
            price: 50.0,
            quantity: 100.0,
        }]));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let monitor = RateMonitor::with_settings(
            official.clone(),
            peer,
            Arc::new(InMemorySnapshotStore::new()),
            clock.clone(),
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        );
        let router = create_router(ApiState {
            monitor: monitor.clone(),
            service_name: "fxgap".to_string(),
        });

        monitor.current().await.unwrap();
        clock.advance(chrono::Duration::minutes(31));
        official.set_result(Err(RateError::unavailable(
            Provider::Official,
            Some(503),
            "maintenance window",
        )));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/rates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["served_from"], "stale");
        assert!(body["warning"].as_str().unwrap().contains("unavailable"));
        assert_eq!(body["rates"]["official_rate"], 40.0);
    }

    #[tokio::test]
    async fn test_preflight_gets_open_cors() {
        let (router, _) = test_router();

        let response = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/compute")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
