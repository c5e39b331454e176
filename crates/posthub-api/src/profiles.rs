use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use posthub_chain::Address;
use posthub_core::avatar::avatar_src;
use posthub_core::identity::{Verification, user_type_to_age_group};
use posthub_core::ranking::Viewer;
use posthub_core::text::{normalize_address, truncate_address};
use posthub_types::api::{ProfileResponse, UsernameRequest};
use posthub_types::models::AgeGroup;

use crate::error::{ApiError, ApiResult, blocking};
use crate::parse_address;
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 32;

/// Username, then forward-verified ENS name, then `0x1234…abcd`.
pub async fn display_name(state: &AppState, address: &str) -> String {
    let key = normalize_address(address);
    if key.is_empty() {
        return String::new();
    }
    if let Some(name) = state.cached_name(&key) {
        return name;
    }

    let db_state = state.clone();
    let lookup_key = key.clone();
    match blocking(move || db_state.db.get_username(&lookup_key)).await {
        Ok(Some(username)) => {
            state.cache_name(&key, &username);
            return username;
        }
        Ok(None) => {}
        Err(e) => warn!("username lookup for {} failed: {}", key, e.message),
    }

    let Ok(parsed) = key.parse::<Address>() else {
        return truncate_address(&key);
    };

    match state.chain.lookup_ens(&parsed).await {
        Ok(Some(ens)) => {
            state.cache_name(&key, &ens);
            ens
        }
        Ok(None) => {
            let short = truncate_address(&key);
            state.cache_name(&key, &short);
            short
        }
        Err(e) => {
            // not cached, so the next call retries ENS
            debug!("ENS lookup for {} failed: {}", key, e);
            truncate_address(&key)
        }
    }
}

/// Identity contract lookup. Any failure reads as unverified.
pub async fn verification_for(state: &AppState, address: &str) -> Verification {
    let Ok(parsed) = address.trim().parse::<Address>() else {
        return Verification::default();
    };
    match state.chain.verification(&parsed).await {
        Ok(v) => v,
        Err(e) => {
            warn!("identity lookup for {} failed: {}", address, e);
            Verification::default()
        }
    }
}

/// Search affinity profile. Unverified or unknown viewers get the default.
pub async fn viewer_for(state: &AppState, address: Option<&str>) -> Viewer {
    let Some(address) = address.filter(|a| !a.trim().is_empty()) else {
        return Viewer::default();
    };
    let v = verification_for(state, address).await;
    if !v.verified {
        return Viewer::default();
    }
    Viewer {
        nationality: v.nationality,
        age_group: user_type_to_age_group(v.user_type),
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let parsed = parse_address(&address, "Invalid address")?;
    let key = normalize_address(&address);

    let display_name = display_name(&state, &key).await;
    let verification = verification_for(&state, &key).await;
    let has_badge = match state.chain.has_badge(&parsed).await {
        Ok(held) => held,
        Err(e) => {
            warn!("badge lookup for {} failed: {}", key, e);
            false
        }
    };

    let age_group = if verification.verified {
        user_type_to_age_group(verification.user_type)
    } else {
        AgeGroup::default()
    };

    Ok(Json(ProfileResponse {
        avatar: avatar_src(Some(&key)),
        address: key,
        display_name,
        verified: verification.verified,
        nationality: verification.nationality,
        age_group,
        has_badge,
    }))
}

pub async fn set_username(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(req): Json<UsernameRequest>,
) -> ApiResult<impl IntoResponse> {
    parse_address(&address, "Invalid address")?;
    let key = normalize_address(&address);

    let username = req.username.trim().to_string();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request("Username must be 1-32 characters"));
    }

    let db_state = state.clone();
    let (k, u) = (key.clone(), username.clone());
    blocking(move || db_state.db.set_username(&k, &u)).await?;

    state.forget_name(&key);
    debug!("{} set username {}", key, username);

    Ok(StatusCode::NO_CONTENT)
}
