//! The thin HTTP surface over the Channel Supervisor: list/get/start/stop/
//! status. No auth, no pagination, no websocket — richer surface area
//! belongs to the external collaborators (authoring tools, the media
//! scanner) that sit outside this crate.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use channelcast_core::{
    models::{Channel, ChannelState},
    supervisor::ChannelSupervisor,
    Error,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<ChannelSupervisor>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/channels/:id", get(get_channel))
        .route("/channels/:id/start", post(start_channel))
        .route("/channels/:id/stop", post(stop_channel))
        .route("/channels/:id/status", get(channel_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: Error) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        Error::ChannelNotFound(_) | Error::PlaylistNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyRunning(_) => StatusCode::CONFLICT,
        Error::NotRunning(_) => StatusCode::CONFLICT,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: err.to_string() }))
}

async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    match state.supervisor.list_channels().await {
        Ok(channels) => Json(channels).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to list channels");
            error_response(e).into_response()
        }
    }
}

async fn get_channel(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let channel_id = channelcast_core::models::ChannelId::from_string(id);
    match state.supervisor.status(&channel_id).await {
        Ok(status) => Json(status.channel).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn start_channel(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let channel_id = channelcast_core::models::ChannelId::from_string(id);
    match state.supervisor.start(channel_id).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn stop_channel(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let channel_id = channelcast_core::models::ChannelId::from_string(id);
    match state.supervisor.stop(&channel_id).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ChannelStatusResponse {
    channel: Channel,
    state: ChannelState,
    registered: bool,
    current_playlist_name: Option<String>,
}

async fn channel_status(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let channel_id = channelcast_core::models::ChannelId::from_string(id);
    match state.supervisor.status(&channel_id).await {
        Ok(status) => Json(ChannelStatusResponse {
            channel: status.channel,
            state: status.state,
            registered: status.registered,
            current_playlist_name: status.current_playlist_name,
        })
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
