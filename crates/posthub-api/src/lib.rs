pub mod comments;
pub mod error;
pub mod notifications;
pub mod onchain;
pub mod posts;
pub mod profiles;
pub mod reactions;
pub mod rewards;
pub mod state;


use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use posthub_chain::Address;

use crate::error::{ApiError, ApiResult};
pub use crate::state::{AppState, AppStateInner};

/// All REST routes. The WebSocket gateway is mounted by the server binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // on-chain
        .route("/api/createOnchain", post(onchain::create_onchain))
        .route("/api/random", get(onchain::random))
        .route("/api/reward", post(onchain::reward))
        // posts
        .route("/posts", get(posts::search_posts).post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/tx", get(posts::tx_status))
        .route(
            "/posts/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/posts/{id}/like", post(reactions::toggle_like))
        .route("/posts/{id}/star", post(reactions::toggle_star))
        .route("/posts/{id}/reactions", get(reactions::reaction_summary))
        .route("/comments/{id}/like", post(comments::toggle_comment_like))
        // notifications
        .route("/notify", post(notifications::relay))
        .route(
            "/notifications/{address}",
            get(notifications::list).delete(notifications::clear),
        )
        .route("/notifications/{address}/read-all", post(notifications::read_all))
        .route("/notifications/{address}/{id}/read", post(notifications::mark_read))
        // profiles
        .route("/profiles/{address}", get(profiles::get_profile))
        .route("/profiles/{address}/username", put(profiles::set_username))
        // rewards
        .route("/rewards/candidates", get(rewards::candidates))
        .route("/rewards/history", get(rewards::history))
        .route("/rewards/draw", post(rewards::draw))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Parses a wallet address from user input, mapping failure to 400.
pub(crate) fn parse_address(input: &str, message: &str) -> ApiResult<Address> {
    input
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(message))
}
