use posthub_types::models::{NotificationItem, NotificationType};
use uuid::Uuid;

/// Only the most recent notifications are kept.
pub const MAX_ITEMS: usize = 50;

/// Two link-less notifications of the same type this close together are
/// treated as one event.
pub const DEDUP_WINDOW_MS: i64 = 10_000;

/// Per-address notification list, newest first.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    items: Vec<NotificationItem>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Prepends a new unread notification and drops the oldest past
    /// [`MAX_ITEMS`].
    pub fn add(
        &mut self,
        kind: NotificationType,
        text: String,
        link: Option<String>,
        now_ms: i64,
    ) -> NotificationItem {
        let suffix = Uuid::new_v4().simple().to_string();
        let item = NotificationItem {
            id: format!("{}-{}", now_ms, &suffix[..6]),
            kind,
            text,
            timestamp: now_ms,
            link,
            read: false,
        };
        self.items.insert(0, item.clone());
        self.items.truncate(MAX_ITEMS);
        item
    }

    /// Marks `id` read together with every notification that looks like the
    /// same underlying event. Returns how many items flipped to read.
    pub fn mark_read(&mut self, id: &str) -> usize {
        let Some(target) = self.items.iter().find(|n| n.id == id).cloned() else {
            return 0;
        };

        let mut flipped = 0;
        for n in self.items.iter_mut() {
            if n.id == target.id || is_duplicate(n, &target) {
                if !n.read {
                    flipped += 1;
                }
                n.read = true;
            }
        }
        flipped
    }

    pub fn mark_all_read(&mut self) -> usize {
        let mut flipped = 0;
        for n in self.items.iter_mut().filter(|n| !n.read) {
            n.read = true;
            flipped += 1;
        }
        flipped
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Heuristic identity: same type and same link, or same type within
/// [`DEDUP_WINDOW_MS`] when either side has no link.
fn is_duplicate(candidate: &NotificationItem, target: &NotificationItem) -> bool {
    if candidate.kind != target.kind {
        return false;
    }

    if let Some(link) = &target.link {
        if candidate.link.as_deref() == Some(link.as_str()) {
            return true;
        }
    }

    let close = (candidate.timestamp - target.timestamp).abs() < DEDUP_WINDOW_MS;
    close && (candidate.link.is_none() || target.link.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_same_type_and_link_marked_together() {
        let mut inbox = Inbox::new();
        let a = inbox.add(NotificationType::Like, "bob liked your post".into(), link("/post/1"), 1_000);
        let b = inbox.add(NotificationType::Like, "bob liked your post".into(), link("/post/1"), 500_000);
        let c = inbox.add(NotificationType::Star, "bob starred your post".into(), link("/post/1"), 500_001);

        assert_eq!(inbox.mark_read(&a.id), 2);

        let read = |id: &str| inbox.items().iter().find(|n| n.id == id).unwrap().read;
        assert!(read(&a.id));
        assert!(read(&b.id));
        assert!(!read(&c.id));
    }

    #[test]
    fn test_linkless_within_window() {
        let mut inbox = Inbox::new();
        let legacy = inbox.add(NotificationType::Comment, "old".into(), None, 10_000);
        let near = inbox.add(NotificationType::Comment, "new".into(), link("/post/2#comment-1"), 19_999);
        let far = inbox.add(NotificationType::Comment, "later".into(), link("/post/3"), 20_000);

        inbox.mark_read(&legacy.id);

        let read = |id: &str| inbox.items().iter().find(|n| n.id == id).unwrap().read;
        assert!(read(&near.id));
        // exactly 10s apart is outside the window
        assert!(!read(&far.id));
    }

    #[test]
    fn test_different_links_not_merged() {
        let mut inbox = Inbox::new();
        let a = inbox.add(NotificationType::Like, "x".into(), link("/post/1"), 0);
        let b = inbox.add(NotificationType::Like, "y".into(), link("/post/2"), 1);
        inbox.mark_read(&a.id);
        assert!(!inbox.items().iter().find(|n| n.id == b.id).unwrap().read);
        assert_eq!(inbox.unread_count(), 1);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut inbox = Inbox::new();
        inbox.add(NotificationType::Star, "x".into(), None, 0);
        assert_eq!(inbox.mark_read("missing"), 0);
        assert_eq!(inbox.unread_count(), 1);
    }

    #[test]
    fn test_capped_at_fifty_newest_first() {
        let mut inbox = Inbox::new();
        for i in 0..60 {
            inbox.add(NotificationType::Like, format!("n{}", i), None, i);
        }
        assert_eq!(inbox.items().len(), MAX_ITEMS);
        assert_eq!(inbox.items()[0].text, "n59");
        assert_eq!(inbox.items()[MAX_ITEMS - 1].text, "n10");
    }

    #[test]
    fn test_mark_all_and_clear() {
        let mut inbox = Inbox::new();
        inbox.add(NotificationType::Reply, "a".into(), None, 0);
        inbox.add(NotificationType::GiftReceived, "b".into(), None, 0);
        assert_eq!(inbox.mark_all_read(), 2);
        assert_eq!(inbox.unread_count(), 0);
        inbox.clear();
        assert!(inbox.items().is_empty());
    }
}
