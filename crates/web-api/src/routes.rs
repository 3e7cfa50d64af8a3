use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use config::ServerConfig;
use domain::{MetricSnapshot, PresenceEntry, Room};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::ApiError, state::AppState, ws_connection::WebSocketConnection};

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(websocket_upgrade))
        .route("/rooms", get(list_rooms))
        .route("/presence", get(presence))
        .route("/stats", get(stats))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.hub.list_rooms().await?))
}

async fn presence(State(state): State<AppState>) -> Result<Json<Vec<PresenceEntry>>, ApiError> {
    Ok(Json(state.hub.roster().await?))
}

/// 最近一次发布的指标快照，尚未发布时为 `null`
async fn stats(State(state): State<AppState>) -> Result<Json<Option<MetricSnapshot>>, ApiError> {
    Ok(Json(state.hub.stats().await?))
}

async fn websocket_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        WebSocketConnection::new(socket, state).run().await;
    })
}
