use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Minor,
    #[default]
    Adult,
    Senior,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Adult => "adult",
            Self::Senior => "senior",
        }
    }
}

impl FromStr for AgeGroup {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minor" => Ok(Self::Minor),
            "adult" => Ok(Self::Adult),
            "senior" => Ok(Self::Senior),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "unknown" => Ok(Self::Unknown),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when a stored enum column holds a value this build doesn't know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub gender: Gender,
    pub age_group: AgeGroup,
    pub nationality: Option<String>,
    pub is_restricted: bool,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Ledger status of a reward payout.
///
/// A record starts `Pending` and moves exactly once to `Success` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Success,
    Failed,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: RewardStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success) | (Self::Pending, Self::Failed)
        )
    }
}

impl FromStr for RewardStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecord {
    pub id: Uuid,
    pub recipient: String,
    pub tx_hash: Option<String>,
    pub status: RewardStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Like,
    Star,
    Comment,
    Reply,
    GiftSent,
    GiftReceived,
    CommentLike,
}

impl NotificationType {
    /// Verb phrase appended to the actor's display name.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Like => "liked your post",
            Self::Star => "starred your post",
            Self::Comment => "commented on your post",
            Self::Reply => "replied to your comment",
            Self::GiftSent => "sent a gift",
            Self::GiftReceived => "sent you a gift",
            Self::CommentLike => "liked your comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_status_only_leaves_pending() {
        assert!(RewardStatus::Pending.can_transition_to(RewardStatus::Success));
        assert!(RewardStatus::Pending.can_transition_to(RewardStatus::Failed));
        assert!(!RewardStatus::Success.can_transition_to(RewardStatus::Failed));
        assert!(!RewardStatus::Failed.can_transition_to(RewardStatus::Success));
        assert!(!RewardStatus::Pending.can_transition_to(RewardStatus::Pending));
    }

    #[test]
    fn notification_item_uses_type_key() {
        let item = NotificationItem {
            id: "1".into(),
            kind: NotificationType::CommentLike,
            text: "x liked your comment".into(),
            timestamp: 42,
            link: None,
            read: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "comment_like");
        assert!(json.get("link").is_none());
    }

    #[test]
    fn enum_round_trip_through_str() {
        assert_eq!("senior".parse::<AgeGroup>().unwrap(), AgeGroup::Senior);
        assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("teen".parse::<AgeGroup>().is_err());
    }
}
