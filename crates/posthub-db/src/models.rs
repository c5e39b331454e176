/// Database row types. These map directly to SQLite rows and are converted
/// into posthub-types models at the query boundary.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use posthub_types::models::{Comment, Post, RewardRecord};
use uuid::Uuid;

pub struct PostRow {
    pub id: String,
    pub author: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub media_urls: String,
    pub gender: String,
    pub age_group: String,
    pub nationality: Option<String>,
    pub is_restricted: bool,
    pub tx_hash: Option<String>,
    pub created_at: String,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: parse_uuid(&self.id)?,
            author: self.author,
            title: self.title,
            summary: self.summary,
            content: self.content,
            media_urls: parse_media(&self.media_urls)?,
            gender: self.gender.parse()?,
            age_group: self.age_group.parse()?,
            nationality: self.nationality,
            is_restricted: self.is_restricted,
            tx_hash: self.tx_hash,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub content: String,
    pub media_urls: String,
    pub parent_comment_id: Option<String>,
    pub created_at: String,
}

impl CommentRow {
    pub fn into_comment(self) -> Result<Comment> {
        Ok(Comment {
            id: parse_uuid(&self.id)?,
            post_id: parse_uuid(&self.post_id)?,
            author: self.author,
            content: self.content,
            media_urls: parse_media(&self.media_urls)?,
            parent_comment_id: self.parent_comment_id.as_deref().map(parse_uuid).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct RewardRow {
    pub id: String,
    pub recipient: String,
    pub tx_hash: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl RewardRow {
    pub fn into_record(self) -> Result<RewardRecord> {
        Ok(RewardRecord {
            id: parse_uuid(&self.id)?,
            recipient: self.recipient,
            tx_hash: self.tx_hash,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Fields supplied by the caller when creating a post. Id and timestamp are
/// assigned on insert.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub author: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub gender: posthub_types::models::Gender,
    pub age_group: posthub_types::models::AgeGroup,
    pub nationality: Option<String>,
    pub is_restricted: bool,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author: String,
    pub content: String,
    pub media_urls: Vec<String>,
    pub parent_comment_id: Option<Uuid>,
}

/// One-per-user toggles. Each maps to its own table keyed by
/// `(target, user_address)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Star,
    CommentLike,
}

impl ReactionKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Star => "stars",
            Self::CommentLike => "comment_likes",
        }
    }

    pub(crate) fn target_column(&self) -> &'static str {
        match self {
            Self::Like | Self::Star => "post_id",
            Self::CommentLike => "comment_id",
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("invalid uuid in row: {}", s))
}

fn parse_media(s: &str) -> Result<Vec<String>> {
    serde_json::from_str(s).with_context(|| format!("invalid media_urls column: {}", s))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid timestamp in row: {}", s))?
        .with_timezone(&Utc))
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
