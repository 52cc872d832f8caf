use crate::badge::BadgeView;
use crate::errors::AppError;
use crate::models::{Message, MessageResponse, NetworkEvent, NetworkResponse, RecentDaysResponse};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::debug;

const RECENT_DAYS: u32 = 7;

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let today = state.counter.get_today().await?;
    Ok(Html(render_index(&today)))
}

/// Message channel. Unknown or malformed messages get no response body.
pub async fn message(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(message) = Message::parse(&body) else {
        debug!("ignoring unrecognized message");
        return StatusCode::NO_CONTENT.into_response();
    };
    Json(dispatch(&state, message).await).into_response()
}

pub async fn dispatch(state: &AppState, message: Message) -> MessageResponse {
    let result = match message {
        Message::GetTodayCount => state.counter.get_today().await,
        Message::IncrementReply { at, url } => {
            debug!(?at, ?url, "increment requested");
            state.counter.increment_today().await
        }
    };
    match result {
        Ok(today) => MessageResponse::success(today),
        Err(err) => MessageResponse::failure(err),
    }
}

pub async fn get_today(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(dispatch(&state, Message::GetTodayCount).await)
}

pub async fn get_days(State(state): State<AppState>) -> Result<Json<RecentDaysResponse>, AppError> {
    let days = state.counter.recent_days(RECENT_DAYS).await?;
    Ok(Json(RecentDaysResponse { days }))
}

pub async fn get_badge(State(state): State<AppState>) -> Json<BadgeView> {
    Json(state.badge.view())
}

pub async fn network(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NetworkResponse>, AppError> {
    let event: NetworkEvent = serde_json::from_slice(&body)
        .map_err(|err| AppError::bad_request(format!("invalid network event: {err}")))?;
    let disposition = state.tracker.handle(event).await;
    Ok(Json(NetworkResponse { disposition }))
}

/// Count changes as server-sent events, one JSON `CountsChanged` per event.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = BroadcastStream::new(state.counter.notifier().subscribe()).filter_map(|change| {
        let change = change.ok()?;
        Event::default().event("counts").json_data(&change).ok()
    });
    Sse::new(changes.map(Ok)).keep_alive(KeepAlive::default())
}
