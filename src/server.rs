use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info};
use metasync::verify::SIGNATURE_HEADER;
use metasync::{Config, ShopifyClient, handle_customer_webhook, set_up_logger};
use serde_json::{Value, json};
use std::sync::Arc;

struct AppState {
    config: Config,
    client: ShopifyClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    let verbose = std::env::var("METASYNC_VERBOSE").is_ok_and(|v| !v.is_empty() && v != "0");
    set_up_logger(module_path!(), verbose)?;

    let config = Config::from_env()?;
    let client = ShopifyClient::new(&config)?;
    let addr = format!("0.0.0.0:{}", config.port);

    let state = Arc::new(AppState { config, client });

    let app = Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .with_state(state);

    info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    debug!("Received webhook: {}", String::from_utf8_lossy(&body));

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let response = handle_customer_webhook(
        &state.client,
        state.config.webhook_secret.as_deref(),
        &body,
        signature,
    )
    .await;

    let status =
        StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(response.to_json()))
}
