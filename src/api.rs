//! JSON API over the [`Monitor`] operations.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde_json::{json, Value};

use crate::error::SettingsError;
use crate::monitor::Monitor;
use crate::settings::Settings;
use crate::types::{CheckOutcome, ContainerView};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

pub fn router(monitor: Arc<Monitor>) -> Router {
    Router::new()
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/containers", get(list_containers))
        .route("/api/check/{id}", post(check_update))
        .route("/api/update/{name}", post(run_update))
        .with_state(monitor)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    bind: SocketAddr,
    monitor: Arc<Monitor>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("HTTP API listening on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn get_settings(State(monitor): State<Arc<Monitor>>) -> Json<Settings> {
    Json(monitor.get_settings())
}

async fn update_settings(
    State(monitor): State<Arc<Monitor>>,
    Json(patch): Json<Value>,
) -> ApiResult<Value> {
    match monitor.update_settings(&patch) {
        Ok(config) => Ok(Json(json!({ "success": true, "config": config }))),
        Err(e @ SettingsError::SaveFailed) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
        Err(e) => Err(api_error(StatusCode::BAD_REQUEST, e)),
    }
}

async fn list_containers(State(monitor): State<Arc<Monitor>>) -> ApiResult<Vec<ContainerView>> {
    monitor
        .list_containers()
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
}

async fn check_update(
    State(monitor): State<Arc<Monitor>>,
    Path(id): Path<String>,
) -> ApiResult<CheckOutcome> {
    monitor.check(&id).await.map(Json).map_err(|e| {
        error!("Check failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })
}

async fn run_update(
    State(monitor): State<Arc<Monitor>>,
    Path(name): Path<String>,
) -> ApiResult<Value> {
    match monitor.trigger_update(&name).await {
        Ok(()) => Ok(Json(json!({
            "success": true,
            "message": format!("Update triggered for {}", name),
        }))),
        Err(e) => {
            error!("Update of {} failed: {}", name, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}
