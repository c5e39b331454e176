use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use posthub_core::text::{MAX_COMMENT_MEDIA, normalize_address};
use posthub_db::{NewComment, ReactionKind};
use posthub_types::api::{
    CommentWithLikes, CreateCommentRequest, ReactionQuery, ToggleRequest, ToggleResponse,
};
use posthub_types::models::{Comment, NotificationType};

use crate::error::{ApiError, ApiResult, blocking};
use crate::notifications::notify;
use crate::profiles::display_name;
use crate::state::AppState;

/// Flat list, oldest first; clients build the tree from `parentCommentId`.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ReactionQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = query.user.as_deref().map(normalize_address).unwrap_or_default();

    let db_state = state.clone();
    let rows = blocking(move || {
        let db = &db_state.db;
        db.list_comments(&post_id)?
            .into_iter()
            .map(|c| -> anyhow::Result<(Comment, u64, bool)> {
                let id = c.id.to_string();
                let likes = db.count_reactions(ReactionKind::CommentLike, &id)?;
                let liked = !user.is_empty() && db.has_reacted(ReactionKind::CommentLike, &id, &user)?;
                Ok((c, likes, liked))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for (comment, likes, liked) in rows {
        let display_name = display_name(&state, &comment.author).await;
        out.push(CommentWithLikes {
            comment,
            likes,
            liked,
            display_name,
        });
    }

    Ok(Json(out))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let author = normalize_address(&req.author);
    if author.is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Author and content are required"));
    }
    if req.media_urls.len() > MAX_COMMENT_MEDIA {
        return Err(ApiError::bad_request(format!(
            "At most {} media items per comment",
            MAX_COMMENT_MEDIA
        )));
    }

    let db_state = state.clone();
    let parent_id = req.parent_comment_id;
    let (post, parent) = blocking(move || {
        let post = db_state.db.get_post(&post_id)?;
        let parent = match parent_id {
            Some(pid) => db_state.db.get_comment(&pid)?,
            None => None,
        };
        Ok((post, parent))
    })
    .await?;

    let post = post.ok_or_else(|| ApiError::not_found("Post not found"))?;
    if parent_id.is_some() && parent.as_ref().is_none_or(|p| p.post_id != post_id) {
        return Err(ApiError::bad_request("Invalid parent comment"));
    }

    let new_comment = NewComment {
        post_id,
        author: author.clone(),
        content: req.content,
        media_urls: req.media_urls,
        parent_comment_id: parent_id,
    };
    let db_state = state.clone();
    let comment = blocking(move || db_state.db.insert_comment(&new_comment)).await?;

    let (recipient, kind) = match &parent {
        Some(parent) => (parent.author.as_str(), NotificationType::Reply),
        None => (post.author.as_str(), NotificationType::Comment),
    };
    notify(
        &state,
        recipient,
        &author,
        kind,
        &post.id.to_string(),
        Some(&comment.id.to_string()),
    )
    .await;

    let display_name = display_name(&state, &author).await;
    Ok((
        StatusCode::CREATED,
        Json(CommentWithLikes {
            comment,
            likes: 0,
            liked: false,
            display_name,
        }),
    ))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = normalize_address(&req.user_address);
    if user.is_empty() {
        return Err(ApiError::bad_request("Invalid user address"));
    }

    let db_state = state.clone();
    let u = user.clone();
    let (comment, (active, count)) = blocking(move || {
        let Some(comment) = db_state.db.get_comment(&comment_id)? else {
            return Ok((None, (false, 0)));
        };
        let toggled =
            db_state
                .db
                .toggle_reaction(ReactionKind::CommentLike, &comment_id.to_string(), &u)?;
        Ok((Some(comment), toggled))
    })
    .await?;

    let comment = comment.ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if active {
        notify(
            &state,
            &comment.author,
            &user,
            NotificationType::CommentLike,
            &comment.post_id.to_string(),
            Some(&comment.id.to_string()),
        )
        .await;
    }

    Ok(Json(ToggleResponse { active, count }))
}
