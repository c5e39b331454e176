use posthub_types::models::AgeGroup;

/// Relevance points dominate engagement: one title hit outweighs 200 likes.
pub const RELEVANCE_MULTIPLIER: i64 = 1000;
pub const TITLE_WEIGHT: i64 = 2;
pub const SUMMARY_WEIGHT: i64 = 1;
pub const LIKE_WEIGHT: i64 = 10;
pub const STAR_WEIGHT: i64 = 5;
pub const NATIONALITY_BONUS: i64 = 3;
pub const AGE_GROUP_BONUS: i64 = 2;

/// The fields of a post the ranking looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankInput<'a> {
    pub title: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub nationality: Option<&'a str>,
    pub age_group: Option<AgeGroup>,
    pub likes_count: u64,
    pub stars_count: u64,
}

/// Locale and age profile of whoever is searching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub nationality: String,
    pub age_group: AgeGroup,
}

/// Lower-cases the query and splits it on whitespace.
pub fn parse_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Composite score for one post. Higher ranks first.
///
/// Keywords are expected lower-cased (see [`parse_keywords`]); each keyword
/// counts at most once per field.
pub fn compute_search_rank(post: &RankInput<'_>, keywords: &[String], viewer: &Viewer) -> i64 {
    let title = post.title.unwrap_or_default().to_lowercase();
    let summary = post.summary.unwrap_or_default().to_lowercase();

    let relevance: i64 = keywords
        .iter()
        .map(|k| {
            let mut points = 0;
            if title.contains(k.as_str()) {
                points += TITLE_WEIGHT;
            }
            if summary.contains(k.as_str()) {
                points += SUMMARY_WEIGHT;
            }
            points
        })
        .sum();

    let mut score = relevance * RELEVANCE_MULTIPLIER;
    score += saturating_i64(post.likes_count).saturating_mul(LIKE_WEIGHT);
    score += saturating_i64(post.stars_count).saturating_mul(STAR_WEIGHT);

    match post.nationality {
        Some(n) if !n.is_empty() && !viewer.nationality.is_empty() && n == viewer.nationality => {
            score += NATIONALITY_BONUS;
        }
        _ => {}
    }
    if post.age_group == Some(viewer.age_group) {
        score += AGE_GROUP_BONUS;
    }

    score
}

/// Scores every item and sorts descending. The sort is stable, so equal
/// scores keep their input order.
pub fn rank_by<T, F>(items: Vec<T>, keywords: &[String], viewer: &Viewer, input: F) -> Vec<(T, i64)>
where
    F: Fn(&T) -> RankInput<'_>,
{
    let mut scored: Vec<(T, i64)> = items
        .into_iter()
        .map(|item| {
            let score = compute_search_rank(&input(&item), keywords, viewer);
            (item, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

fn saturating_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post<'a>(title: &'a str, summary: &'a str, likes: u64, stars: u64) -> RankInput<'a> {
        RankInput {
            title: Some(title),
            summary: Some(summary),
            likes_count: likes,
            stars_count: stars,
            ..Default::default()
        }
    }

    #[test]
    fn test_title_only_match_scores_2000_per_keyword() {
        let viewer = Viewer::default();
        let base = compute_search_rank(&post("Rust async runtime", "nothing here", 0, 0), &[], &viewer);
        let one = compute_search_rank(
            &post("Rust async runtime", "nothing here", 0, 0),
            &parse_keywords("rust"),
            &viewer,
        );
        let two = compute_search_rank(
            &post("Rust async runtime", "nothing here", 0, 0),
            &parse_keywords("rust async"),
            &viewer,
        );
        assert_eq!(one - base, 2000);
        assert_eq!(two - base, 4000);
    }

    #[test]
    fn test_summary_match_weighs_half_of_title() {
        let viewer = Viewer::default();
        let score = compute_search_rank(&post("hello", "a cat story", 0, 0), &parse_keywords("cat"), &viewer);
        assert_eq!(score, 1000);
        let both = compute_search_rank(&post("cat", "a cat story", 0, 0), &parse_keywords("CAT"), &viewer);
        assert_eq!(both, 3000);
    }

    #[test]
    fn test_engagement_weights() {
        let viewer = Viewer::default();
        assert_eq!(compute_search_rank(&post("", "", 3, 4), &[], &viewer), 50);
    }

    #[test]
    fn test_monotonic_in_counts() {
        let viewer = Viewer { nationality: "JP".into(), age_group: AgeGroup::Senior };
        let keywords = parse_keywords("night market");
        let mut last = i64::MIN;
        for likes in 0..20u64 {
            for stars in 0..20u64 {
                let p = post("Night market food", "market tour", likes, stars);
                let score = compute_search_rank(&p, &keywords, &viewer);
                let more_likes = compute_search_rank(&post("Night market food", "market tour", likes + 1, stars), &keywords, &viewer);
                let more_stars = compute_search_rank(&post("Night market food", "market tour", likes, stars + 1), &keywords, &viewer);
                assert!(more_likes >= score);
                assert!(more_stars >= score);
                if stars == 0 {
                    assert!(score >= last);
                    last = score;
                }
            }
        }
    }

    #[test]
    fn test_affinity_bonuses() {
        let viewer = Viewer { nationality: "KR".into(), age_group: AgeGroup::Minor };
        let mut p = post("", "", 0, 0);
        p.nationality = Some("KR");
        p.age_group = Some(AgeGroup::Minor);
        assert_eq!(compute_search_rank(&p, &[], &viewer), 5);

        // empty nationality on both sides is not a match
        let anonymous = Viewer::default();
        let mut q = post("", "", 0, 0);
        q.nationality = Some("");
        assert_eq!(compute_search_rank(&q, &[], &anonymous), 0);

        // default viewer is adult, so an adult post still gets the age bonus
        q.age_group = Some(AgeGroup::Adult);
        assert_eq!(compute_search_rank(&q, &[], &anonymous), 2);
    }

    #[test]
    fn test_missing_fields_score_zero_relevance() {
        let viewer = Viewer::default();
        let p = RankInput::default();
        assert_eq!(compute_search_rank(&p, &parse_keywords("anything"), &viewer), 0);
    }

    #[test]
    fn test_rank_by_is_stable_and_descending() {
        let viewer = Viewer::default();
        let items = vec![("a", 1u64), ("b", 5), ("c", 1), ("d", 0)];
        let ranked = rank_by(items, &[], &viewer, |(_, likes)| RankInput {
            likes_count: *likes,
            ..Default::default()
        });
        let order: Vec<&str> = ranked.iter().map(|((name, _), _)| *name).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_parse_keywords_drops_empty_tokens() {
        assert_eq!(parse_keywords("  Foo \t BAR  "), vec!["foo", "bar"]);
        assert!(parse_keywords("   ").is_empty());
    }
}
