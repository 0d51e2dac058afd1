//! Achievement delta detection.
//!
//! The backend never says "you just unlocked X". The client infers it by
//! comparing achievement status before and after an action.

use std::collections::HashSet;

use lootsync_types::{PlayerAchievementStatus, UnlockedAchievement};

/// Achievements unlocked in `post` that were absent or locked in `pre`.
///
/// Matched by achievement id, so the two lists may be in any order. Output
/// follows the order of `post`; an id repeated in `post` is reported once.
pub fn detect_newly_unlocked(
    pre: &[PlayerAchievementStatus],
    post: &[PlayerAchievementStatus],
) -> Vec<UnlockedAchievement> {
    let already_unlocked: HashSet<&str> = pre
        .iter()
        .filter(|s| s.is_unlocked())
        .map(|s| s.achievement_id.as_str())
        .collect();

    let mut seen = HashSet::new();
    post.iter()
        .filter(|s| !already_unlocked.contains(s.achievement_id.as_str()))
        .filter_map(UnlockedAchievement::from_status)
        .filter(|u| seen.insert(u.achievement_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::status;

    fn codes(unlocked: &[UnlockedAchievement]) -> Vec<&str> {
        unlocked.iter().map(|u| u.code.as_str()).collect()
    }

    #[test]
    fn test_locked_to_unlocked_is_detected() {
        let pre = vec![
            status("A", 4, 5, None),
            status("B", 10, 10, Some("2024-01-01T00:00:00Z")),
        ];
        let post = vec![
            status("A", 5, 5, Some("2024-01-02T00:00:00Z")),
            status("B", 10, 10, Some("2024-01-01T00:00:00Z")),
        ];

        assert_eq!(codes(&detect_newly_unlocked(&pre, &post)), vec!["A"]);
    }

    #[test]
    fn test_unlocked_in_both_is_never_reported() {
        let both = vec![status("B", 10, 10, Some("2024-01-01T00:00:00Z"))];
        assert!(detect_newly_unlocked(&both, &both).is_empty());

        // Even if the server re-stamps the unlock time.
        let restamped = vec![status("B", 10, 10, Some("2024-03-01T00:00:00Z"))];
        assert!(detect_newly_unlocked(&both, &restamped).is_empty());
    }

    #[test]
    fn test_matches_by_id_not_position() {
        let pre = vec![status("A", 1, 5, None), status("B", 1, 5, None)];
        let post = vec![
            status("B", 5, 5, Some("2024-01-02T00:00:00Z")),
            status("A", 2, 5, None),
        ];

        assert_eq!(codes(&detect_newly_unlocked(&pre, &post)), vec!["B"]);
    }

    #[test]
    fn test_absent_from_pre_counts_as_locked() {
        let post = vec![status("NEW", 1, 1, Some("2024-01-02T00:00:00Z"))];
        assert_eq!(codes(&detect_newly_unlocked(&[], &post)), vec!["NEW"]);
    }

    #[test]
    fn test_output_keeps_post_order_without_duplicates() {
        let pre = vec![
            status("C", 0, 1, None),
            status("A", 0, 1, None),
            status("B", 0, 1, None),
        ];
        let post = vec![
            status("B", 1, 1, Some("2024-01-02T00:00:00Z")),
            status("C", 1, 1, Some("2024-01-02T00:00:00Z")),
            status("B", 1, 1, Some("2024-01-02T00:00:00Z")),
            status("A", 1, 1, Some("2024-01-02T00:00:00Z")),
        ];

        assert_eq!(
            codes(&detect_newly_unlocked(&pre, &post)),
            vec!["B", "C", "A"]
        );
    }

    #[test]
    fn test_locked_in_post_is_ignored() {
        let post = vec![status("A", 3, 5, None)];
        assert!(detect_newly_unlocked(&[], &post).is_empty());
    }
}
