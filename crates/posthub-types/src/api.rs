use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AgeGroup, Comment, NotificationType, Post, RewardRecord};

// -- Errors --

/// Body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// -- On-chain routes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOnchainRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub media_links: Option<Vec<String>>,
    /// When set, the resulting hash is written to this post's `tx_hash`.
    #[serde(default)]
    pub post_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HashResponse {
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomResponse {
    /// Decimal string so JSON clients keep full 64-bit precision.
    pub random: String,
}

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxStatusResponse {
    pub hash: String,
    pub confirmed: bool,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub author: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithCounts {
    #[serde(flatten)]
    pub post: Post,
    pub likes_count: u64,
    pub stars_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: PostWithCounts,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Wallet address of the viewer, used for locale/age affinity.
    pub viewer: Option<String>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithLikes {
    #[serde(flatten)]
    pub comment: Comment,
    pub likes: u64,
    pub liked: bool,
    pub display_name: String,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub user_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub active: bool,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub likes_count: u64,
    pub stars_count: u64,
    pub liked: bool,
    pub starred: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReactionQuery {
    pub user: Option<String>,
}

// -- Notifications --

/// Explicit notification relayed by a client, e.g. after sending a gift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub recipient: String,
    pub actor: String,
    pub post_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub comment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub unread: usize,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub address: String,
    pub display_name: String,
    pub avatar: String,
    pub verified: bool,
    pub nationality: String,
    pub age_group: AgeGroup,
    pub has_badge: bool,
}

// -- Rewards --

#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub post: Post,
    pub score: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    /// Raw VRF output, absent when the random source failed.
    pub random: Option<String>,
    /// 1-based slot shown to the user.
    pub slot: usize,
    pub winner: Option<String>,
    pub reward: Option<RewardRecord>,
    pub badge_tx: Option<String>,
}
