//! Passthrough relay
//!
//! Lets a browser console talk to the Open Cloud API by answering with a
//! permissive CORS policy and forwarding everything under the relay prefix
//! verbatim. Only the API key and content type travel upstream; the
//! upstream answer comes back untouched apart from `transfer-encoding`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use monetix_core::config::RelayConfig;
use reqwest::Client;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Inbound headers copied onto the upstream request
pub const FORWARDED_HEADERS: [&str; 2] = ["x-api-key", "content-type"];

/// State shared across relay handlers
#[derive(Clone)]
pub struct RelayState {
    /// Host receiving every relayed request
    pub upstream_url: String,
    /// Prefix stripped from inbound paths
    pub prefix: String,
    /// Maximum buffered request body
    pub body_limit: usize,
    /// HTTP client for making requests to upstream
    pub client: Client,
}

/// Build the relay router
pub fn router(config: &RelayConfig) -> Result<Router, String> {
    let client = Client::builder()
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

    let prefix = config.prefix.trim_end_matches('/').to_string();
    if !prefix.starts_with('/') {
        return Err(format!("Relay prefix must start with '/': {:?}", config.prefix));
    }
    let state = RelayState {
        upstream_url: config.upstream_url.clone(),
        prefix: prefix.clone(),
        body_limit: config.body_limit,
        client,
    };

    // CORS layer - allow all for relay
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route(&prefix, any(relay_handler))
        .route(&format!("{prefix}/*path"), any(relay_handler))
        .with_state(state);

    if let Some(dir) = &config.static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    Ok(app.layer(TraceLayer::new_for_http()).layer(cors))
}

/// Run the relay until the server stops
pub async fn run_relay(config: RelayConfig) -> Result<(), String> {
    let app = router(&config)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {e}", addr))?;

    info!(
        "Relay listening on http://{}{} -> {}",
        addr, config.prefix, config.upstream_url
    );
    if let Some(dir) = &config.static_dir {
        info!("Serving console from {}", dir.display());
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {e}"))
}

/// Health check endpoint
async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Relay is healthy")
}

/// Forward one request upstream and mirror the answer
async fn relay_handler(State(state): State<RelayState>, req: Request<Body>) -> Response {
    let method = req.method().clone();
    let target = upstream_target(&state.upstream_url, &state.prefix, req.uri());
    let headers = forwarded_headers(req.headers());

    debug!("Relaying {} {}", method, target);

    // Read request body
    let body_bytes = match axum::body::to_bytes(req.into_body(), state.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let mut upstream_req = state.client.request(method.clone(), &target).headers(headers);
    if method != Method::GET && method != Method::HEAD && !body_bytes.is_empty() {
        upstream_req = upstream_req.body(body_bytes);
    }

    let upstream_response = match upstream_req.send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Relay error: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "Failed to proxy request to Roblox API"})),
            )
                .into_response();
        }
    };

    let status = upstream_response.status();
    let resp_headers = upstream_response.headers().clone();

    let resp_body = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read upstream response body: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "Failed to proxy request to Roblox API"})),
            )
                .into_response();
        }
    };

    debug!("Upstream answered {} ({} bytes)", status, resp_body.len());

    let mut response = Response::builder().status(status);
    for (name, value) in resp_headers.iter() {
        if *name == header::TRANSFER_ENCODING {
            continue;
        }
        response = response.header(name, value);
    }

    response
        .body(Body::from(resp_body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Upstream URL for an inbound URI: prefix stripped, query kept
fn upstream_target(upstream_url: &str, prefix: &str, uri: &Uri) -> String {
    let path = uri.path();
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    format!("{}{}{}", upstream_url.trim_end_matches('/'), rest, query)
}

fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = inbound.get(name) {
            headers.insert(HeaderName::from_static(name), value.clone());
        }
    }
    headers
}
