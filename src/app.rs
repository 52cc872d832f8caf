use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/message", post(handlers::message))
        .route("/api/network", post(handlers::network))
        .route("/api/today", get(handlers::get_today))
        .route("/api/days", get(handlers::get_days))
        .route("/api/badge", get(handlers::get_badge))
        .route("/api/events", get(handlers::events))
        .with_state(state)
}
