use crate::Database;
use crate::models::{
    CommentRow, NewComment, NewPost, PostRow, ReactionKind, RewardRow, format_timestamp,
};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use posthub_types::models::{Comment, Post, RewardRecord, RewardStatus};
use rusqlite::Connection;
use uuid::Uuid;

const POST_COLUMNS: &str = "id, author, title, summary, content, media_urls, gender, age_group, \
                            nationality, is_restricted, tx_hash, created_at";

const COMMENT_COLUMNS: &str =
    "id, post_id, author, content, media_urls, parent_comment_id, created_at";

const REWARD_COLUMNS: &str = "id, recipient, tx_hash, status, created_at";

impl Database {
    // -- Posts --

    pub fn insert_post(&self, post: &NewPost) -> Result<Post> {
        let id = Uuid::new_v4();
        let media = serde_json::to_string(&post.media_urls)?;

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author, title, summary, content, media_urls, gender,
                                    age_group, nationality, is_restricted, tx_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    id.to_string(),
                    post.author,
                    post.title,
                    post.summary,
                    post.content,
                    media,
                    post.gender.as_str(),
                    post.age_group.as_str(),
                    post.nationality,
                    post.is_restricted,
                    post.tx_hash,
                    format_timestamp(Utc::now()),
                ],
            )?;

            query_post(conn, &id.to_string())?
                .ok_or_else(|| anyhow!("Post vanished after insert: {}", id))
        })
    }

    pub fn get_post(&self, id: &Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| query_post(conn, &id.to_string()))
    }

    /// Returns false when no post has that id.
    pub fn set_post_tx_hash(&self, id: &Uuid, tx_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET tx_hash = ?1 WHERE id = ?2",
                (tx_hash, id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    /// Posts whose title or summary contains `query` literally. An empty
    /// query returns the latest posts.
    pub fn search_posts(&self, query: &str, limit: u32) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let query = query.trim();
            if query.is_empty() {
                let sql = format!(
                    "SELECT {} FROM posts ORDER BY created_at DESC LIMIT ?1",
                    POST_COLUMNS
                );
                return collect_posts(conn, &sql, rusqlite::params![limit]);
            }

            // LIKE only folds ASCII, so both sides go through casefold().
            let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
            let sql = format!(
                "SELECT {} FROM posts
                 WHERE casefold(title) LIKE ?1 ESCAPE '\\'
                    OR casefold(summary) LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC
                 LIMIT ?2",
                POST_COLUMNS
            );
            collect_posts(conn, &sql, rusqlite::params![pattern, limit])
        })
    }

    // -- Likes, stars, comment likes --

    pub fn count_reactions(&self, kind: ReactionKind, target_id: &str) -> Result<u64> {
        self.with_conn(|conn| query_reaction_count(conn, kind, target_id))
    }

    pub fn has_reacted(&self, kind: ReactionKind, target_id: &str, user: &str) -> Result<bool> {
        self.with_conn(|conn| query_has_reacted(conn, kind, target_id, user))
    }

    /// Toggle a reaction: removes if exists, inserts if not.
    /// Returns (added, count after the change).
    pub fn toggle_reaction(
        &self,
        kind: ReactionKind,
        target_id: &str,
        user: &str,
    ) -> Result<(bool, u64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let added = if query_has_reacted(&tx, kind, target_id, user)? {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1 AND user_address = ?2",
                        kind.table(),
                        kind.target_column()
                    ),
                    (target_id, user),
                )?;
                false
            } else {
                tx.execute(
                    &format!(
                        "INSERT INTO {} ({}, user_address, created_at) VALUES (?1, ?2, ?3)",
                        kind.table(),
                        kind.target_column()
                    ),
                    (target_id, user, format_timestamp(Utc::now())),
                )?;
                true
            };

            let count = query_reaction_count(&tx, kind, target_id)?;
            tx.commit()?;
            Ok((added, count))
        })
    }

    /// Post ids with one entry per like, then one per star, created at or
    /// after `since`. Each list is in creation order.
    pub fn engagement_since(&self, since: DateTime<Utc>) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let since = format_timestamp(since);
            let mut ids = Vec::new();
            for table in ["likes", "stars"] {
                let mut stmt = conn.prepare(&format!(
                    "SELECT post_id FROM {} WHERE created_at >= ?1 ORDER BY created_at ASC, rowid ASC",
                    table
                ))?;
                let rows = stmt
                    .query_map([&since], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                ids.extend(rows);
            }
            Ok(ids)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let id = Uuid::new_v4();
        let media = serde_json::to_string(&comment.media_urls)?;

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author, content, media_urls, parent_comment_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id.to_string(),
                    comment.post_id.to_string(),
                    comment.author,
                    comment.content,
                    media,
                    comment.parent_comment_id.map(|p| p.to_string()),
                    format_timestamp(Utc::now()),
                ],
            )?;

            query_comment(conn, &id.to_string())?
                .ok_or_else(|| anyhow!("Comment vanished after insert: {}", id))
        })
    }

    pub fn get_comment(&self, id: &Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, &id.to_string()))
    }

    /// All comments on a post, oldest first.
    pub fn list_comments(&self, post_id: &Uuid) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, rowid ASC",
                COMMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([post_id.to_string()], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CommentRow::into_comment).collect()
        })
    }

    // -- Usernames --

    pub fn set_username(&self, wallet_address: &str, username: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO usernames (wallet_address, username, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(wallet_address) DO UPDATE SET username = excluded.username,
                                                          updated_at = excluded.updated_at",
                (wallet_address, username, format_timestamp(Utc::now())),
            )?;
            Ok(())
        })
    }

    pub fn get_username(&self, wallet_address: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT username FROM usernames WHERE wallet_address = ?1",
                [wallet_address],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Reward ledger --

    #[cfg(test)]
    pub fn insert_pending_reward(&self, recipient: &str) -> Result<RewardRecord> {
        self.with_conn_mut(|conn| insert_pending(conn, recipient))
    }

    /// Inserts a pending record unless one is already open for `recipient`.
    /// Check and insert happen under the same lock.
    pub fn claim_pending_reward(&self, recipient: &str) -> Result<Option<RewardRecord>> {
        self.with_conn_mut(|conn| {
            if query_pending_reward(conn, recipient)?.is_some() {
                return Ok(None);
            }
            insert_pending(conn, recipient).map(Some)
        })
    }

    /// Moves a pending record to its terminal status. Fails if the record is
    /// missing or already settled.
    pub fn settle_reward(
        &self,
        id: &Uuid,
        status: RewardStatus,
        tx_hash: Option<&str>,
    ) -> Result<RewardRecord> {
        if !RewardStatus::Pending.can_transition_to(status) {
            return Err(anyhow!("Invalid reward transition to {}", status.as_str()));
        }

        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reward_logs SET status = ?1, tx_hash = ?2 WHERE id = ?3 AND status = 'pending'",
                rusqlite::params![status.as_str(), tx_hash, id.to_string()],
            )?;
            if changed == 0 {
                return Err(anyhow!("No pending reward log with id {}", id));
            }
            query_reward(conn, &id.to_string())?
                .ok_or_else(|| anyhow!("Reward log not found: {}", id))
        })
    }

    /// Most recent ledger entries, newest first.
    pub fn list_rewards(&self, limit: u32) -> Result<Vec<RewardRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reward_logs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                REWARD_COLUMNS
            ))?;
            let rows = stmt
                .query_map([limit], map_reward_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(RewardRow::into_record).collect()
        })
    }

    #[cfg(test)]
    pub fn pending_reward_for(&self, recipient: &str) -> Result<Option<RewardRecord>> {
        self.with_conn(|conn| query_pending_reward(conn, recipient))
    }
}

/// Escapes LIKE wildcards so user input is matched literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        content: row.get(4)?,
        media_urls: row.get(5)?,
        gender: row.get(6)?,
        age_group: row.get(7)?,
        nationality: row.get(8)?,
        is_restricted: row.get(9)?,
        tx_hash: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        media_urls: row.get(4)?,
        parent_comment_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_reward_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RewardRow> {
    Ok(RewardRow {
        id: row.get(0)?,
        recipient: row.get(1)?,
        tx_hash: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<Post>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            [id],
            map_post_row,
        )
        .optional()?;
    row.map(PostRow::into_post).transpose()
}

fn collect_posts(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(PostRow::into_post).collect()
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<Comment>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
            [id],
            map_comment_row,
        )
        .optional()?;
    row.map(CommentRow::into_comment).transpose()
}

fn query_reward(conn: &Connection, id: &str) -> Result<Option<RewardRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM reward_logs WHERE id = ?1", REWARD_COLUMNS),
            [id],
            map_reward_row,
        )
        .optional()?;
    row.map(RewardRow::into_record).transpose()
}

fn insert_pending(conn: &Connection, recipient: &str) -> Result<RewardRecord> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO reward_logs (id, recipient, status, created_at) VALUES (?1, ?2, 'pending', ?3)",
        (id.to_string(), recipient, format_timestamp(Utc::now())),
    )?;
    query_reward(conn, &id.to_string())?
        .ok_or_else(|| anyhow!("Reward log vanished after insert: {}", id))
}

fn query_pending_reward(conn: &Connection, recipient: &str) -> Result<Option<RewardRecord>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM reward_logs WHERE recipient = ?1 AND status = 'pending'
                 ORDER BY created_at DESC LIMIT 1",
                REWARD_COLUMNS
            ),
            [recipient],
            map_reward_row,
        )
        .optional()?;
    row.map(RewardRow::into_record).transpose()
}

fn query_reaction_count(conn: &Connection, kind: ReactionKind, target_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            kind.table(),
            kind.target_column()
        ),
        [target_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn query_has_reacted(
    conn: &Connection,
    kind: ReactionKind,
    target_id: &str,
    user: &str,
) -> Result<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND user_address = ?2)",
            kind.table(),
            kind.target_column()
        ),
        [target_id, user],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use posthub_types::models::{AgeGroup, Gender};

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_post(title: &str, summary: &str) -> NewPost {
        NewPost {
            author: "0xauthor".into(),
            title: title.into(),
            summary: summary.into(),
            content: summary.into(),
            ..NewPost::default()
        }
    }

    #[test]
    fn test_insert_and_get_post() {
        let db = db();
        let post = db
            .insert_post(&NewPost {
                media_urls: vec!["https://cdn/a.png".into()],
                gender: Gender::Female,
                age_group: AgeGroup::Senior,
                nationality: Some("FR".into()),
                is_restricted: true,
                ..new_post("Hello", "World")
            })
            .unwrap();

        let loaded = db.get_post(&post.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Hello");
        assert_eq!(loaded.media_urls, vec!["https://cdn/a.png".to_string()]);
        assert_eq!(loaded.gender, Gender::Female);
        assert_eq!(loaded.age_group, AgeGroup::Senior);
        assert_eq!(loaded.nationality.as_deref(), Some("FR"));
        assert!(loaded.is_restricted);
        assert!(loaded.tx_hash.is_none());

        assert!(db.set_post_tx_hash(&post.id, "0xhash").unwrap());
        assert_eq!(db.get_post(&post.id).unwrap().unwrap().tx_hash.as_deref(), Some("0xhash"));
        assert!(!db.set_post_tx_hash(&Uuid::new_v4(), "0xhash").unwrap());
    }

    #[test]
    fn test_search_matches_title_or_summary() {
        let db = db();
        db.insert_post(&new_post("Rust tips", "borrowing")).unwrap();
        db.insert_post(&new_post("Cooking", "rust-free pans")).unwrap();
        db.insert_post(&new_post("Gardening", "tomatoes")).unwrap();

        assert_eq!(db.search_posts("rust", 50).unwrap().len(), 2);
        assert_eq!(db.search_posts("", 50).unwrap().len(), 3);
        assert_eq!(db.search_posts("   ", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let db = db();
        db.insert_post(&new_post("100% organic", "x")).unwrap();
        db.insert_post(&new_post("1000 organic", "x")).unwrap();
        db.insert_post(&new_post("snake_case", "x")).unwrap();
        db.insert_post(&new_post("snakeXcase", "x")).unwrap();

        let hits = db.search_posts("100%", 50).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% organic");

        let hits = db.search_posts("e_c", 50).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "snake_case");
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = db();
        db.insert_post(&new_post("café society", "x")).unwrap();
        db.insert_post(&new_post("cafe plain", "x")).unwrap();
        db.insert_post(&new_post("x", "ÜBER alles")).unwrap();

        let hits = db.search_posts("CAFÉ", 50).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "café society");

        let hits = db.search_posts("über", 50).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].summary, "ÜBER alles");
    }

    #[test]
    fn test_toggle_twice_restores_count() {
        let db = db();
        let post = db.insert_post(&new_post("t", "s")).unwrap();
        let pid = post.id.to_string();

        db.toggle_reaction(ReactionKind::Like, &pid, "0xother").unwrap();
        let before = db.count_reactions(ReactionKind::Like, &pid).unwrap();

        assert_eq!(db.toggle_reaction(ReactionKind::Like, &pid, "0xme").unwrap(), (true, before + 1));
        assert!(db.has_reacted(ReactionKind::Like, &pid, "0xme").unwrap());
        assert_eq!(db.toggle_reaction(ReactionKind::Like, &pid, "0xme").unwrap(), (false, before));
        assert!(!db.has_reacted(ReactionKind::Like, &pid, "0xme").unwrap());

        // stars are tracked separately
        assert_eq!(db.count_reactions(ReactionKind::Star, &pid).unwrap(), 0);
    }

    #[test]
    fn test_comments_and_comment_likes() {
        let db = db();
        let post = db.insert_post(&new_post("t", "s")).unwrap();
        let root = db
            .insert_comment(&NewComment {
                post_id: post.id,
                author: "0xa".into(),
                content: "first".into(),
                ..NewComment::default()
            })
            .unwrap();
        let reply = db
            .insert_comment(&NewComment {
                post_id: post.id,
                author: "0xb".into(),
                content: "reply".into(),
                media_urls: vec!["https://cdn/clip.mp4".into()],
                parent_comment_id: Some(root.id),
            })
            .unwrap();

        let listed = db.list_comments(&post.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, root.id);
        assert_eq!(listed[1].parent_comment_id, Some(root.id));
        assert_eq!(db.get_comment(&reply.id).unwrap().unwrap().media_urls.len(), 1);

        let (added, count) = db
            .toggle_reaction(ReactionKind::CommentLike, &root.id.to_string(), "0xb")
            .unwrap();
        assert!(added);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_username_upsert() {
        let db = db();
        assert!(db.get_username("0xa").unwrap().is_none());
        db.set_username("0xa", "alice").unwrap();
        db.set_username("0xa", "alice2").unwrap();
        assert_eq!(db.get_username("0xa").unwrap().as_deref(), Some("alice2"));
    }

    #[test]
    fn test_reward_ledger_transitions() {
        let db = db();
        let rec = db.insert_pending_reward("0xwinner").unwrap();
        assert_eq!(rec.status, RewardStatus::Pending);
        assert!(db.pending_reward_for("0xwinner").unwrap().is_some());

        let done = db.settle_reward(&rec.id, RewardStatus::Success, Some("0xtx")).unwrap();
        assert_eq!(done.status, RewardStatus::Success);
        assert_eq!(done.tx_hash.as_deref(), Some("0xtx"));
        assert!(db.pending_reward_for("0xwinner").unwrap().is_none());

        // terminal records never move again
        assert!(db.settle_reward(&rec.id, RewardStatus::Failed, None).is_err());
        assert!(db.settle_reward(&rec.id, RewardStatus::Pending, None).is_err());
    }

    #[test]
    fn test_claim_refuses_second_pending() {
        let db = db();
        let first = db.claim_pending_reward("0xwinner").unwrap();
        assert!(first.is_some());
        assert!(db.claim_pending_reward("0xwinner").unwrap().is_none());
        assert!(db.claim_pending_reward("0xother").unwrap().is_some());

        db.settle_reward(&first.unwrap().id, RewardStatus::Failed, None).unwrap();
        assert!(db.claim_pending_reward("0xwinner").unwrap().is_some());
    }

    #[test]
    fn test_failed_reward_has_no_hash() {
        let db = db();
        let rec = db.insert_pending_reward("0xwinner").unwrap();
        let failed = db.settle_reward(&rec.id, RewardStatus::Failed, None).unwrap();
        assert_eq!(failed.status, RewardStatus::Failed);
        assert!(failed.tx_hash.is_none());
    }

    #[test]
    fn test_list_rewards_capped() {
        let db = db();
        for i in 0..25 {
            db.insert_pending_reward(&format!("0x{}", i)).unwrap();
        }
        let listed = db.list_rewards(20).unwrap();
        assert_eq!(listed.len(), 20);
        assert_eq!(listed[0].recipient, "0x24");
    }

    #[test]
    fn test_engagement_window() {
        let db = db();
        let a = db.insert_post(&new_post("a", "s")).unwrap().id.to_string();
        let b = db.insert_post(&new_post("b", "s")).unwrap().id.to_string();

        db.toggle_reaction(ReactionKind::Like, &a, "0x1").unwrap();
        db.toggle_reaction(ReactionKind::Star, &b, "0x1").unwrap();
        db.toggle_reaction(ReactionKind::Like, &b, "0x2").unwrap();

        // backdate one like outside the window
        db.with_conn_mut(|conn| {
            let old = format_timestamp(Utc::now() - Duration::days(8));
            conn.execute(
                "UPDATE likes SET created_at = ?1 WHERE post_id = ?2",
                (old, &a),
            )?;
            Ok(())
        })
        .unwrap();

        let rows = db.engagement_since(Utc::now() - Duration::days(7)).unwrap();
        assert_eq!(rows, vec![b.clone(), b]);
    }
}
