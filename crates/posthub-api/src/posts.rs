use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use posthub_core::identity::DemographicTags;
use posthub_core::ranking::{RankInput, parse_keywords, rank_by};
use posthub_core::text::{MAX_POST_MEDIA, derive_summary, normalize_address};
use posthub_db::{Database, NewPost, ReactionKind};
use posthub_types::api::{
    CreatePostRequest, PostWithCounts, RankedPost, SearchQuery, TxStatusResponse,
};
use posthub_types::events::GatewayEvent;
use posthub_types::models::Post;

use crate::error::{ApiError, ApiResult, blocking};
use crate::parse_address;
use crate::profiles::{verification_for, viewer_for};
use crate::state::AppState;

/// Search candidates are capped before ranking.
pub const SEARCH_LIMIT: u32 = 50;

pub(crate) fn with_counts(db: &Database, post: Post) -> anyhow::Result<PostWithCounts> {
    let id = post.id.to_string();
    Ok(PostWithCounts {
        likes_count: db.count_reactions(ReactionKind::Like, &id)?,
        stars_count: db.count_reactions(ReactionKind::Star, &id)?,
        post,
    })
}

/// Every post carries an age group (adult unless the author was verified
/// otherwise); nationality only exists for verified authors.
fn rank_input(p: &PostWithCounts) -> RankInput<'_> {
    RankInput {
        title: Some(&p.post.title),
        summary: Some(&p.post.summary),
        nationality: p.post.nationality.as_deref(),
        age_group: Some(p.post.age_group),
        likes_count: p.likes_count,
        stars_count: p.stars_count,
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&req.author, "Invalid author address")?;
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Title and content are required"));
    }
    if req.media_urls.len() > MAX_POST_MEDIA {
        return Err(ApiError::bad_request(format!(
            "At most {} media items per post",
            MAX_POST_MEDIA
        )));
    }

    let author = normalize_address(&req.author);
    let verification = verification_for(&state, &author).await;
    let (tags, nationality) = if verification.verified {
        (
            DemographicTags::from_user_type(verification.user_type),
            Some(verification.nationality),
        )
    } else {
        (DemographicTags::default(), None)
    };

    let new_post = NewPost {
        author,
        title: req.title.trim().to_string(),
        summary: derive_summary(&req.content),
        content: req.content,
        media_urls: req.media_urls,
        gender: tags.gender,
        age_group: tags.age_group,
        nationality,
        is_restricted: tags.is_restricted,
        tx_hash: None,
    };

    let db_state = state.clone();
    let post = blocking(move || db_state.db.insert_post(&new_post)).await?;

    info!("Post {} created by {}", post.id, post.author);
    state.dispatcher.broadcast(GatewayEvent::PostCreated {
        id: post.id,
        author: post.author.clone(),
        title: post.title.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(PostWithCounts {
            post,
            likes_count: 0,
            stars_count: 0,
        }),
    ))
}

/// GET /posts?q=&viewer=, ranked by relevance, engagement and affinity.
pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let db_state = state.clone();
    let q = query.q.clone();
    let candidates = blocking(move || {
        db_state
            .db
            .search_posts(&q, SEARCH_LIMIT)?
            .into_iter()
            .map(|post| with_counts(&db_state.db, post))
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    let viewer = viewer_for(&state, query.viewer.as_deref()).await;
    let keywords = parse_keywords(&query.q);

    let ranked: Vec<RankedPost> = rank_by(candidates, &keywords, &viewer, rank_input)
        .into_iter()
        .map(|(post, score)| RankedPost { post, score })
        .collect();

    Ok(Json(ranked))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db_state = state.clone();
    let post = blocking(move || {
        db_state
            .db
            .get_post(&id)?
            .map(|p| with_counts(&db_state.db, p))
            .transpose()
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post))
}

/// Single receipt check for the post's registry transaction.
pub async fn tx_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let db_state = state.clone();
    let hash = blocking(move || db_state.db.get_post(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?
        .tx_hash
        .ok_or_else(|| ApiError::not_found("Post has no transaction"))?;

    let confirmed = match state.chain.receipt(&hash).await {
        Ok(receipt) => receipt.is_some_and(|r| r.success),
        Err(e) => {
            warn!("receipt lookup for {} failed: {}", hash, e);
            return Err(ApiError::internal("Receipt lookup failed").with_details(e.to_string()));
        }
    };

    Ok(Json(TxStatusResponse { hash, confirmed }))
}
