use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use posthub_core::text::{post_link, same_address};
use posthub_types::api::{NotificationPayload, UnreadResponse};
use posthub_types::models::NotificationType;

use crate::error::{ApiError, ApiResult};
use crate::parse_address;
use crate::profiles::display_name;
use crate::state::AppState;

/// Builds "<actor> <verb>" and delivers it to `recipient`. Self-actions and
/// empty recipients are skipped.
pub async fn notify(
    state: &AppState,
    recipient: &str,
    actor: &str,
    kind: NotificationType,
    post_id: &str,
    comment_id: Option<&str>,
) {
    if recipient.trim().is_empty() || same_address(recipient, actor) {
        debug!("skipping {:?} notification for {}", kind, recipient);
        return;
    }

    let name = display_name(state, actor).await;
    let text = format!("{} {}", name, kind.verb());
    let link = post_link(post_id, comment_id);

    state
        .dispatcher
        .deliver(recipient, kind, text, Some(link))
        .await;
}

/// POST /notify, explicit events relayed by clients (gifts).
pub async fn relay(
    State(state): State<AppState>,
    Json(payload): Json<NotificationPayload>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&payload.recipient, "Invalid payload")?;
    if payload.actor.trim().is_empty() {
        return Err(ApiError::bad_request("Invalid payload"));
    }

    notify(
        &state,
        &payload.recipient,
        &payload.actor,
        payload.kind,
        &payload.post_id,
        payload.comment_id.as_deref(),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&address, "Invalid address")?;
    Ok(Json(state.dispatcher.notifications(&address).await))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path((address, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&address, "Invalid address")?;
    let unread = state.dispatcher.mark_read(&address, &id).await;
    Ok(Json(UnreadResponse { unread }))
}

pub async fn read_all(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&address, "Invalid address")?;
    let unread = state.dispatcher.mark_all_read(&address).await;
    Ok(Json(UnreadResponse { unread }))
}

pub async fn clear(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&address, "Invalid address")?;
    let unread = state.dispatcher.clear(&address).await;
    Ok(Json(UnreadResponse { unread }))
}
