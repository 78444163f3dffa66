//! HTTP surface: a thin rendering collaborator over the acquisition flow.

mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::flow::LocationAcquisitionFlow;

pub fn build_router(flow: Arc<LocationAcquisitionFlow>) -> Router {
    let state = Arc::new(AppState { flow });

    Router::new()
        .route("/api/state", get(handlers::current_state))
        .route("/api/locate", post(handlers::locate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, flow: Arc<LocationAcquisitionFlow>) {
    let app = build_router(Arc::clone(&flow));
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    eprintln!("  autolocate server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    flow.teardown();

    if let Err(e) = result {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Phase;
    use crate::location::{BuiltinGeocoder, FixedPositionProvider, PermissionStatus, StaticPermission};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn flow(permission: PermissionStatus) -> Arc<LocationAcquisitionFlow> {
        Arc::new(LocationAcquisitionFlow::new(
            Arc::new(StaticPermission(permission)),
            Arc::new(FixedPositionProvider::new(37.77, -122.41).unwrap()),
            Arc::new(BuiltinGeocoder::default()),
        ))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    #[tokio::test]
    async fn test_state_starts_idle() {
        let response = build_router(flow(PermissionStatus::Granted))
            .oneshot(Request::builder().uri("/api/state").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["attempt"], 0);
        assert!(json["display_location"].is_null());
    }

    #[tokio::test]
    async fn test_locate_then_state() {
        let flow = flow(PermissionStatus::Granted);
        let mut rx = flow.subscribe();
        let app = build_router(Arc::clone(&flow));

        let response = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/api/locate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["attempt"], 1);

        rx.wait_for(|s| s.phase.is_terminal()).await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["phase"], "succeeded");
        assert_eq!(json["display_location"], "San Francisco, California");
    }

    #[tokio::test]
    async fn test_locate_denied() {
        let flow = flow(PermissionStatus::Denied);
        let mut rx = flow.subscribe();
        let app = build_router(Arc::clone(&flow));

        app.oneshot(Request::builder().method("POST").uri("/api/locate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let state = rx.wait_for(|s| s.phase.is_terminal()).await.unwrap().clone();
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(state.error_message.as_deref(), Some("Permission to access location was denied"));
    }

    #[tokio::test]
    async fn test_locate_after_teardown() {
        let flow = flow(PermissionStatus::Granted);
        flow.teardown();

        let response = build_router(flow)
            .oneshot(Request::builder().method("POST").uri("/api/locate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["code"], 503);
    }
}
