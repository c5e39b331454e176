use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use tracing::{error, info, warn};

use posthub_chain::{ChainError, OnchainPost};
use posthub_types::api::{CreateOnchainRequest, HashResponse, RandomResponse, RewardRequest};

use crate::error::{ApiError, ApiResult, blocking};
use crate::parse_address;
use crate::rewards::settle_reward;
use crate::state::AppState;

/// POST /api/createOnchain: anchors post metadata in the registry contract
/// and returns the hash without waiting for confirmation.
pub async fn create_onchain(
    State(state): State<AppState>,
    payload: Result<Json<CreateOnchainRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid payload"))?;
    if req.author.trim().is_empty() || req.title.trim().is_empty() || req.summary.trim().is_empty() {
        return Err(ApiError::bad_request("Invalid payload"));
    }
    let author = parse_address(&req.author, "Invalid payload")?;

    let post = OnchainPost {
        author,
        title: req.title,
        summary: req.summary,
        media_links: req.media_links.unwrap_or_default(),
    };

    let hash = state.chain.create_post(&post).await.map_err(|e| {
        error!("createPost failed: {}", e);
        match e {
            ChainError::Unreachable(details) => {
                ApiError::internal("RPC connection failed").with_details(details)
            }
            ChainError::MissingSigner | ChainError::InvalidKey(_) => {
                ApiError::internal("Server mis-configuration")
            }
            ChainError::NoContract(_) => ApiError::internal("Contract not found at address"),
            other => ApiError::internal("On-chain posting failed").with_details(other.to_string()),
        }
    })?;

    if let Some(post_id) = req.post_id {
        let db_state = state.clone();
        let h = hash.clone();
        match blocking(move || db_state.db.set_post_tx_hash(&post_id, &h)).await {
            Ok(true) => info!("Post {} anchored in {}", post_id, hash),
            Ok(false) => warn!("createOnchain for unknown post {}", post_id),
            Err(e) => warn!("Could not record tx hash for {}: {}", post_id, e.message),
        }
    }

    Ok(Json(HashResponse { hash }))
}

/// GET /api/random: one uint64 from the VRF, as a decimal string.
pub async fn random(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let value = state.chain.random_u64().await.map_err(|e| {
        error!("Failed to fetch VRF random: {}", e);
        ApiError::internal("Randomness fetch failed")
    })?;

    Ok(Json(RandomResponse {
        random: value.to_string(),
    }))
}

/// POST /api/reward: pays the configured reward and waits for one
/// confirmation.
pub async fn reward(
    State(state): State<AppState>,
    payload: Result<Json<RewardRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid recipient address"))?;
    let recipient = parse_address(&req.recipient, "Invalid recipient address")?;

    let record = settle_reward(&state, &recipient).await?;
    let hash = record
        .tx_hash
        .ok_or_else(|| ApiError::internal("Reward settled without a transaction hash"))?;

    Ok(Json(HashResponse { hash }))
}
