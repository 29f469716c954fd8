//! HTTP routes for the HLS streamer.
//!
//! Two routers:
//! - HLS server on `PORT`: `/hls_stream/*` (playlist and segments from the
//!   output directory), `/health`, `/ready`
//! - Metrics server on `PROM_PORT`: `/metrics`

use crate::backend::HLS_ROUTE;
use crate::observability::{health_router, HealthState};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Build the HLS server routes.
///
/// Segments are served straight from `directory` while the transcoder
/// writes them. CORS is permissive so browser players on other origins can
/// fetch the playlist.
pub fn build_routes(directory: &Path, health: Arc<HealthState>) -> Router {
    health_router(health)
        .nest_service(HLS_ROUTE, ServeDir::new(directory))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Build the Prometheus scrape route.
pub fn metrics_routes(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    const PLAYLIST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:2\n";

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ORIGIN, "http://player.example")
            .body(Body::empty())
            .expect("Failed to build request")
    }

    #[tokio::test]
    async fn test_playlist_is_served_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stream.m3u8"), PLAYLIST).unwrap();
        let app = build_routes(dir.path(), Arc::new(HealthState::new()));

        let response = app.oneshot(get("/hls_stream/stream.m3u8")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), PLAYLIST.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_segment_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_routes(dir.path(), Arc::new(HealthState::new()));

        let response = app
            .oneshot(get("/hls_stream/segment00001.ts"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_routes_are_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let health = Arc::new(HealthState::new());
        let app = build_routes(dir.path(), Arc::clone(&health));

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        health.set_ready();
        let response = app.oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_route_renders_exposition() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::gauge!("hls_packets_lost").set(7.0);
        });

        let response = metrics_routes(handle)
            .oneshot(get("/metrics"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("hls_packets_lost 7"));
    }
}
