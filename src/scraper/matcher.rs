use crate::scraper::types::{MediaSearchQuery, MediaSearchResult};
use std::collections::HashSet;
use tracing::debug;

/// Matcher for scoring and ranking search results
pub struct Matcher;

impl Matcher {
    /// Score every result against the query and return them best first.
    /// Ties keep the order the provider returned them in.
    #[must_use]
    pub fn rank(query: &MediaSearchQuery, results: Vec<MediaSearchResult>) -> Vec<MediaSearchResult> {
        let mut scored: Vec<MediaSearchResult> = Self::dedupe(results)
            .into_iter()
            .map(|mut result| {
                result.score = Self::score(query, &result);
                result
            })
            .collect();

        Self::sort_ranked(&mut scored);
        scored
    }

    /// Sort by score descending; stable, so equal scores keep insertion order
    pub fn sort_ranked(results: &mut [MediaSearchResult]) {
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    /// Relevance of a single result.
    ///
    /// Identifier lookups are authoritative and always score 1.0. Free-text
    /// hits score by title similarity minus the year penalty.
    pub fn score(query: &MediaSearchQuery, result: &MediaSearchResult) -> f32 {
        if result.direct_match {
            return 1.0;
        }

        let base = Self::similarity(query.query(), &result.title);
        let penalty = Self::year_penalty(query.year(), result.year);
        if penalty > 0.0 {
            debug!(
                "parsed year does not match search result year - downgrading score of {} by {}",
                result.title, penalty
            );
        }

        (base - penalty).max(0.0)
    }

    /// `base` minus the year penalty, floored at 0
    pub fn apply_year_penalty(base: f32, requested: Option<i32>, candidate: Option<i32>) -> f32 {
        (base - Self::year_penalty(requested, candidate)).max(0.0)
    }

    /// `|Δyear| / 100` when both years are known, non-zero and differ
    pub fn year_penalty(requested: Option<i32>, candidate: Option<i32>) -> f32 {
        match (requested, candidate) {
            (Some(r), Some(c)) if r > 0 && c > 0 && r != c => (r - c).unsigned_abs() as f32 / 100.0,
            _ => 0.0,
        }
    }

    /// Token-sorted normalized edit-distance ratio in `[0, 1]`
    pub fn similarity(query: &str, candidate: &str) -> f32 {
        let a = Self::token_sort(query);
        let b = Self::token_sort(candidate);

        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        strsim::normalized_levenshtein(&a, &b) as f32
    }

    /// Drop duplicate records (same provider and id); the first one wins
    pub fn dedupe(results: Vec<MediaSearchResult>) -> Vec<MediaSearchResult> {
        let mut seen = HashSet::new();
        results
            .into_iter()
            .filter(|r| seen.insert((r.provider_id.clone(), r.id.clone())))
            .collect()
    }

    fn normalize_title(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn token_sort(title: &str) -> String {
        let normalized = Self::normalize_title(title);
        let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::types::MediaKind;

    fn result(id: &str, title: &str, year: Option<i32>) -> MediaSearchResult {
        MediaSearchResult::new("test", id, title, MediaKind::Movie).with_year(year)
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(Matcher::normalize_title("The Matrix (1999)"), "the matrix 1999");
        assert_eq!(Matcher::normalize_title("Steins;Gate"), "steins gate");
    }

    #[test]
    fn test_identical_titles_score_one() {
        assert!((Matcher::similarity("The Matrix", "the matrix") - 1.0).abs() < f32::EPSILON);
        assert!((Matcher::similarity("Matrix, The", "The Matrix") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_similarity_orders_candidates() {
        let close = Matcher::similarity("The Matrix", "The Matrix Reloaded");
        let far = Matcher::similarity("The Matrix", "Inception");

        assert!(close > far);
        assert!(close < 1.0);
        assert_eq!(Matcher::similarity("", "Inception"), 0.0);
    }

    #[test]
    fn test_year_penalty() {
        assert!((Matcher::year_penalty(Some(1999), Some(2003)) - 0.04).abs() < 1e-6);
        assert_eq!(Matcher::year_penalty(Some(1999), Some(1999)), 0.0);
        assert_eq!(Matcher::year_penalty(None, Some(2003)), 0.0);
        assert_eq!(Matcher::year_penalty(Some(0), Some(2003)), 0.0);
        assert_eq!(Matcher::year_penalty(Some(1999), Some(0)), 0.0);
    }

    #[test]
    fn test_penalty_floors_at_zero() {
        assert_eq!(Matcher::apply_year_penalty(0.1, Some(1900), Some(2020)), 0.0);
        assert!((Matcher::apply_year_penalty(0.9, Some(2000), Some(2010)) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_exact_title_with_year_mismatch() {
        let query = MediaSearchQuery::new(MediaKind::Movie, "The Matrix").with_year(Some(1999));
        let score = Matcher::score(&query, &result("1", "The Matrix", Some(2021)));

        assert!((score - 0.78).abs() < 1e-6);
    }

    #[test]
    fn test_direct_match_ignores_year() {
        let query = MediaSearchQuery::new(MediaKind::Movie, "Something Else").with_year(Some(1950));
        let direct = result("1", "The Matrix", Some(1999)).direct();

        assert_eq!(Matcher::score(&query, &direct), 1.0);
    }

    #[test]
    fn test_rank_orders_and_dedupes() {
        let query = MediaSearchQuery::new(MediaKind::Movie, "The Matrix").with_year(Some(1999));
        let ranked = Matcher::rank(
            &query,
            vec![
                result("2", "The Matrix Reloaded", Some(2003)),
                result("1", "The Matrix", Some(1999)),
                result("2", "The Matrix Reloaded", Some(2003)),
                result("3", "Inception", Some(2010)),
            ],
        );

        let order: Vec<_> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
        assert_eq!(ranked[0].score, 1.0);
    }

    #[test]
    fn test_equal_scores_keep_insertion_order() {
        let query = MediaSearchQuery::new(MediaKind::Movie, "Dune");
        let ranked = Matcher::rank(
            &query,
            vec![result("a", "Dune", Some(1984)), result("b", "Dune", Some(2021))],
        );

        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "b");
    }
}
