pub const SUMMARY_WORDS: usize = 100;
pub const MAX_POST_MEDIA: usize = 9;
pub const MAX_COMMENT_MEDIA: usize = 3;

/// First [`SUMMARY_WORDS`] whitespace-separated words of a post body.
pub fn derive_summary(content: &str) -> String {
    content
        .split_whitespace()
        .take(SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `0x1234…abcd` form used when a wallet has no username or ENS name.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Canonical form for storing and comparing wallet addresses.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

pub fn same_address(a: &str, b: &str) -> bool {
    !a.is_empty() && a.trim().eq_ignore_ascii_case(b.trim())
}

/// Link used in notifications for a post or one of its comments.
pub fn post_link(post_id: &str, comment_id: Option<&str>) -> String {
    match comment_id {
        Some(cid) => format!("/post/{}#comment-{}", post_id, cid),
        None => format!("/post/{}", post_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_takes_first_hundred_words() {
        let body: String = (0..150).map(|i| format!("w{} ", i)).collect();
        let summary = derive_summary(&body);
        assert_eq!(summary.split(' ').count(), 100);
        assert!(summary.starts_with("w0 w1"));
        assert!(summary.ends_with("w99"));
        assert_eq!(derive_summary("  short\n\ttext "), "short text");
    }

    #[test]
    fn test_truncate_address() {
        assert_eq!(
            truncate_address("0x9a5cf28f9dc827a367c2a0eff4b4f02bd589db67"),
            "0x9a5c…db67"
        );
        assert_eq!(truncate_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_address_compare() {
        assert!(same_address("0xAbC", "0xabc "));
        assert!(!same_address("", ""));
    }

    #[test]
    fn test_post_link() {
        assert_eq!(post_link("p", None), "/post/p");
        assert_eq!(post_link("p", Some("c")), "/post/p#comment-c");
    }
}
