use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use posthub_core::text::normalize_address;
use posthub_db::ReactionKind;
use posthub_types::api::{ReactionQuery, ReactionSummary, ToggleRequest, ToggleResponse};
use posthub_types::models::NotificationType;

use crate::error::{ApiError, ApiResult, blocking};
use crate::notifications::notify;
use crate::state::AppState;

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<impl IntoResponse> {
    toggle_post_reaction(state, post_id, req, ReactionKind::Like, NotificationType::Like).await
}

pub async fn toggle_star(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<impl IntoResponse> {
    toggle_post_reaction(state, post_id, req, ReactionKind::Star, NotificationType::Star).await
}

/// Toggle a like/star: removes if exists, inserts if not. Adding notifies the
/// post author.
async fn toggle_post_reaction(
    state: AppState,
    post_id: Uuid,
    req: ToggleRequest,
    kind: ReactionKind,
    notification: NotificationType,
) -> ApiResult<Json<ToggleResponse>> {
    let user = normalize_address(&req.user_address);
    if user.is_empty() {
        return Err(ApiError::bad_request("Invalid user address"));
    }

    let db_state = state.clone();
    let u = user.clone();
    let (post, (active, count)) = blocking(move || {
        let Some(post) = db_state.db.get_post(&post_id)? else {
            return Ok((None, (false, 0)));
        };
        let toggled = db_state.db.toggle_reaction(kind, &post_id.to_string(), &u)?;
        Ok((Some(post), toggled))
    })
    .await?;

    let post = post.ok_or_else(|| ApiError::not_found("Post not found"))?;

    if active {
        notify(
            &state,
            &post.author,
            &user,
            notification,
            &post.id.to_string(),
            None,
        )
        .await;
    }

    Ok(Json(ToggleResponse { active, count }))
}

/// Counts plus whether `?user=` has liked/starred.
pub async fn reaction_summary(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ReactionQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = query.user.as_deref().map(normalize_address).unwrap_or_default();

    let db_state = state.clone();
    let summary = blocking(move || {
        let db = &db_state.db;
        let id = post_id.to_string();
        let (liked, starred) = if user.is_empty() {
            (false, false)
        } else {
            (
                db.has_reacted(ReactionKind::Like, &id, &user)?,
                db.has_reacted(ReactionKind::Star, &id, &user)?,
            )
        };
        Ok(ReactionSummary {
            likes_count: db.count_reactions(ReactionKind::Like, &id)?,
            stars_count: db.count_reactions(ReactionKind::Star, &id)?,
            liked,
            starred,
        })
    })
    .await?;

    Ok(Json(summary))
}
