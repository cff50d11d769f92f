use std::sync::Arc;

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    handler::HandlerWithoutStateExt,
    response::{IntoResponse, Json, Redirect},
    routing::get,
};
use tower_http::services::ServeDir;

use crate::protocol::Track;
use crate::server::AppState;
use crate::server::push;

/// Routes for the player page: the polling endpoints, the push socket,
/// and the static assets under `server.public_dir`.
pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.server.public_dir)
        .not_found_service(redirect_to_root.into_service());

    Router::new()
        .route("/current", get(current_track))
        .route("/next", get(next_track))
        .route("/socket", get(websocket_handler))
        .fallback_service(assets)
        .with_state(state)
}

/// GET /current
pub async fn current_track(State(state): State<Arc<AppState>>) -> Json<Option<Track>> {
    tracing::debug!("GET /current");
    let track = state.active().and_then(|id| {
        state
            .channels
            .get(&id)
            .and_then(|queue| queue.current().cloned())
    });
    Json(track)
}

/// GET /next
///
/// Advances the active channel the same way the `next` command does and
/// returns the new current track. The polling client consumes the body
/// directly, so no push event is sent.
pub async fn next_track(State(state): State<Arc<AppState>>) -> Json<Option<Track>> {
    tracing::debug!("GET /next");
    let track = state
        .active()
        .and_then(|id| state.channel(&id).advance().cloned());
    Json(track)
}

/// GET /socket
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push::handle_socket(socket, state))
}

/// Unmatched paths go back to the player page.
async fn redirect_to_root() -> Redirect {
    Redirect::temporary("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
