use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;

/// Number of posts that enter the weekly draw.
pub const CANDIDATE_COUNT: usize = 5;

/// Engagement older than this doesn't count toward the draw.
pub const DRAW_WINDOW_DAYS: i64 = 7;

/// Counts one point per engagement row and returns the top
/// [`CANDIDATE_COUNT`] ids, highest first.
///
/// Ties keep the order in which ids were first seen, so callers should feed
/// likes before stars.
pub fn tally_engagement<I, K>(rows: I) -> Vec<(K, u64)>
where
    I: IntoIterator<Item = K>,
    K: Eq + Hash + Clone,
{
    let mut order: Vec<K> = Vec::new();
    let mut counts: HashMap<K, u64> = HashMap::new();

    for id in rows {
        let entry = counts.entry(id.clone()).or_insert_with(|| {
            order.push(id);
            0
        });
        *entry += 1;
    }

    let mut ranked: Vec<(K, u64)> = order
        .into_iter()
        .map(|id| {
            let score = counts.get(&id).copied().unwrap_or_default();
            (id, score)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(CANDIDATE_COUNT);
    ranked
}

/// Reduces a VRF output to a candidate index.
pub fn winner_index(random: u64) -> usize {
    (random % CANDIDATE_COUNT as u64) as usize
}

/// Selects the winner for `random`. Returns `None` when fewer than
/// [`CANDIDATE_COUNT`] candidates exist and the index lands on an empty slot.
pub fn pick_winner<T>(candidates: &[T], random: u64) -> Option<&T> {
    candidates.get(winner_index(random))
}

/// Slot to display when the random source is unavailable. Nothing is paid
/// out for a locally drawn slot.
pub fn fallback_slot() -> usize {
    rand::rng().random_range(0..CANDIDATE_COUNT) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_index_is_mod_five() {
        assert_eq!(winner_index(0), 0);
        assert_eq!(winner_index(7), 2);
        assert_eq!(winner_index(u64::MAX), (u64::MAX % 5) as usize);
        for r in [3u64, 12_345_678_901, u64::MAX - 1] {
            assert_eq!(winner_index(r), winner_index(r));
        }
    }

    #[test]
    fn test_pick_winner_reproducible() {
        let candidates = ["a", "b", "c", "d", "e"];
        assert_eq!(pick_winner(&candidates, 11), Some(&"b"));
        assert_eq!(pick_winner(&candidates, 11), pick_winner(&candidates, 11));
    }

    #[test]
    fn test_pick_winner_empty_slot() {
        let candidates = ["a", "b"];
        assert_eq!(pick_winner(&candidates, 4), None);
        assert_eq!(pick_winner(&candidates, 6), Some(&"b"));
    }

    #[test]
    fn test_tally_orders_by_score_then_first_seen() {
        let likes = ["p1", "p2", "p2", "p3"];
        let stars = ["p3", "p4", "p1"];
        let ranked = tally_engagement(likes.into_iter().chain(stars));
        assert_eq!(ranked, vec![("p1", 2), ("p2", 2), ("p3", 2), ("p4", 1)]);
    }

    #[test]
    fn test_tally_keeps_top_five() {
        let rows = ["a", "b", "c", "d", "e", "f", "f", "f"];
        let ranked = tally_engagement(rows);
        assert_eq!(ranked.len(), CANDIDATE_COUNT);
        assert_eq!(ranked[0], ("f", 3));
        assert!(!ranked.iter().any(|(id, _)| *id == "e"));
    }

    #[test]
    fn test_fallback_slot_in_range() {
        for _ in 0..100 {
            let slot = fallback_slot();
            assert!((1..=CANDIDATE_COUNT).contains(&slot));
        }
    }
}
