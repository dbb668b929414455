#![cfg(test)]

use super::coordinator::{CoordinatorState, RefreshStatus};
use super::snapshot::{Day, PriceSnapshot};
use super::web::*;
use axum::http::{Request, StatusCode};
use chrono::{FixedOffset, TimeZone, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceExt;

fn sample_snapshot() -> PriceSnapshot {
    let stamp = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 15, 14, 5, 0)
        .unwrap();
    let mut snapshot = PriceSnapshot::empty(stamp);
    snapshot.set_hour(Day::Today, 14, Some(12.5));
    snapshot.set_hour(Day::Tomorrow, 3, Some(7.75));
    snapshot.select_current_hour(14);
    snapshot
}

fn state_with(snapshot: Option<PriceSnapshot>, success: bool) -> AppState {
    let state = CoordinatorState {
        snapshot: snapshot.map(Arc::new),
        status: RefreshStatus {
            last_update_success: success,
            last_attempt: Some(Utc.with_ymd_and_hms(2024, 1, 15, 13, 5, 0).unwrap()),
            last_error: (!success).then(|| "Refresh failed: Price fetch error: HTTP 502".into()),
            total_refreshes: 1,
            ..RefreshStatus::default()
        },
    };
    let (_, rx) = watch::channel(Arc::new(state));
    AppState::new(rx)
}

async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router(state)
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_ok() {
    let response = router(state_with(None, false))
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn prices_returns_full_snapshot() {
    let (status, body) = get_json(state_with(Some(sample_snapshot()), true), "/api/prices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot"]["today_14"], serde_json::json!(12.5));
    assert_eq!(body["snapshot"]["tomorrow_03"], serde_json::json!(7.75));
    assert_eq!(body["snapshot"]["today_00"], serde_json::Value::Null);
    assert_eq!(body["snapshot"]["current_price"], serde_json::json!(12.5));
    assert_eq!(body["status"]["last_update_success"], serde_json::json!(true));
    assert_eq!(body["stale"], serde_json::json!(false));
}

#[tokio::test]
async fn prices_before_first_refresh_is_null() {
    let (status, body) = get_json(state_with(None, false), "/api/prices").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["snapshot"].is_null());
    assert_eq!(body["stale"], serde_json::json!(true));
}

#[tokio::test]
async fn single_value_lookup() {
    let (status, body) =
        get_json(state_with(Some(sample_snapshot()), true), "/api/prices/today_14").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], serde_json::json!(12.5));
    assert_eq!(body["name"], serde_json::json!("Nomos Today 14:00"));
    assert_eq!(body["unit"], serde_json::json!("ct/kWh"));
}

#[tokio::test]
async fn stale_value_is_flagged_unavailable() {
    let (status, body) = get_json(
        state_with(Some(sample_snapshot()), false),
        "/api/prices/current_price",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], serde_json::json!(12.5));
    assert_eq!(body["available"], serde_json::json!(false));
}

#[tokio::test]
async fn unknown_key_is_404() {
    let (status, _) =
        get_json(state_with(Some(sample_snapshot()), true), "/api/prices/today_24").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn value_without_snapshot_is_503() {
    let (status, _) = get_json(state_with(None, false), "/api/prices/today_01").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn sensors_lists_every_key() {
    let (status, body) = get_json(state_with(None, false), "/api/sensors").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(51));
}

#[tokio::test]
async fn binds_hostnames_and_ip_literals() {
    for host in ["localhost", "127.0.0.1"] {
        let listener = bind(host, 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback(), "{host}");
    }
}

#[tokio::test]
async fn serve_on_answers_until_shutdown() {
    let listener = bind("localhost", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = watch::channel(false);
    let server = tokio::spawn(serve_on(
        listener,
        state_with(Some(sample_snapshot()), true),
        stop_rx,
    ));

    let body: serde_json::Value = reqwest::get(format!("http://{}/api/prices/today_14", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"], serde_json::json!(12.5));

    stop_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}
