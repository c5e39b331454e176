use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use posthub_chain::Address;
use posthub_core::draw::{DRAW_WINDOW_DAYS, fallback_slot, pick_winner, tally_engagement, winner_index};
use posthub_types::api::{Candidate, DrawResponse};
use posthub_types::models::{RewardRecord, RewardStatus};

use crate::error::{ApiError, ApiResult, blocking};
use crate::state::AppState;

/// Most recent ledger entries returned by the history endpoint.
pub const HISTORY_LIMIT: u32 = 20;

/// Top posts by likes + stars over the draw window. Deleted posts drop out.
pub async fn load_candidates(state: &AppState) -> ApiResult<Vec<Candidate>> {
    let db_state = state.clone();
    blocking(move || {
        let since = Utc::now() - Duration::days(DRAW_WINDOW_DAYS);
        let rows = db_state.db.engagement_since(since)?;

        let mut candidates = Vec::new();
        for (id, score) in tally_engagement(rows) {
            let Ok(uuid) = Uuid::parse_str(&id) else { continue };
            if let Some(post) = db_state.db.get_post(&uuid)? {
                candidates.push(Candidate { post, score });
            }
        }
        Ok(candidates)
    })
    .await
}

/// Pays `recipient` through the ledger: pending record, transfer, one
/// confirmation, then success or failed.
pub async fn settle_reward(state: &AppState, recipient: &Address) -> ApiResult<RewardRecord> {
    if !state.chain.has_signer() {
        return Err(ApiError::internal("Server missing FLOW_TX_PRIVATE_KEY env"));
    }

    let key = recipient.to_string();
    let db_state = state.clone();
    let k = key.clone();
    let pending = blocking(move || db_state.db.claim_pending_reward(&k))
        .await?
        .ok_or_else(|| ApiError::conflict("Reward already pending for recipient"))?;

    let outcome = match state.chain.transfer_reward(recipient).await {
        Ok(hash) => match state.chain.wait_for_receipt(&hash).await {
            Ok(receipt) if receipt.success => Ok(hash),
            Ok(_) => Err(format!("Reward transfer {} reverted", hash)),
            Err(e) => Err(e.to_string()),
        },
        Err(e) => Err(e.to_string()),
    };

    let (status, tx_hash, failure) = match outcome {
        Ok(hash) => (RewardStatus::Success, Some(hash), None),
        Err(msg) => (RewardStatus::Failed, None, Some(msg)),
    };

    let db_state = state.clone();
    let id = pending.id;
    let settled = blocking(move || db_state.db.settle_reward(&id, status, tx_hash.as_deref())).await;

    match (settled, failure) {
        (Ok(record), None) => {
            info!("Reward {} to {} settled: {:?}", record.id, key, record.tx_hash);
            Ok(record)
        }
        (Ok(record), Some(msg)) => {
            error!("Reward {} to {} failed: {}", record.id, key, msg);
            Err(ApiError::internal(msg))
        }
        (Err(e), _) => {
            error!("Reward {} to {} could not be settled in the ledger", id, key);
            Err(e)
        }
    }
}

pub async fn candidates(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(load_candidates(&state).await?))
}

pub async fn history(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let db_state = state.clone();
    let rows = blocking(move || db_state.db.list_rewards(HISTORY_LIMIT)).await?;
    Ok(Json(rows))
}

/// POST /rewards/draw: VRF pick over the candidates, payout, then badge.
pub async fn draw(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let candidates = load_candidates(&state).await?;

    let random = match state.chain.random_u64().await {
        Ok(r) => r,
        Err(e) => {
            warn!("VRF unavailable, nothing paid: {}", e);
            return Ok(Json(DrawResponse {
                random: None,
                slot: fallback_slot(),
                winner: None,
                reward: None,
                badge_tx: None,
            }));
        }
    };

    let slot = winner_index(random) + 1;
    let Some(winner) = pick_winner(&candidates, random) else {
        info!("Draw {} landed on empty slot {}", random, slot);
        return Ok(Json(DrawResponse {
            random: Some(random.to_string()),
            slot,
            winner: None,
            reward: None,
            badge_tx: None,
        }));
    };

    let recipient: Address = winner.post.author.parse().map_err(|_| {
        ApiError::internal("Winning post has no valid author address")
    })?;

    info!("Draw {} picked slot {} ({})", random, slot, recipient);
    let record = settle_reward(&state, &recipient).await?;

    let badge_tx = match state.chain.mint_badge(&recipient).await {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!("Badge mint for {} failed: {}", recipient, e);
            None
        }
    };

    Ok(Json(DrawResponse {
        random: Some(random.to_string()),
        slot,
        winner: Some(recipient.to_string()),
        reward: Some(record),
        badge_tx,
    }))
}
