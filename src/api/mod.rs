//! HTTP surface of the service.

pub mod error;
pub mod powerflow;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Request},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{field, info_span, warn};

use crate::config::ServerConfig;
use crate::service::PowerFlowService;

pub const API_PREFIX: &str = "/api/v1";
const REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PowerFlowService>,
}

impl AppState {
    pub fn new(service: PowerFlowService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "docs": env!("CARGO_PKG_REPOSITORY"),
        "api_prefix": API_PREFIX,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn powerflow_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(powerflow::upload))
        .route("/run/:session_id", post(powerflow::run))
        .route("/results/:session_id", get(powerflow::results))
        .route("/download/:session_id", get(powerflow::download))
        .route("/session/:session_id", delete(powerflow::delete_session))
        .route("/formats", get(powerflow::formats))
        .route("/examples", get(powerflow::examples))
        .route("/examples/:case_name/download", get(powerflow::download_example))
}

pub fn router(state: AppState, cfg: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let request_id = req
            .headers()
            .get(REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            session_id = field::Empty,
        )
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(&format!("{API_PREFIX}/powerflow"), powerflow_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors(&cfg.cors_origins))
                .layer(DefaultBodyLimit::max(cfg.max_upload_bytes)),
        )
}
