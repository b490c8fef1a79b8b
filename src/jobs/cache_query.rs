//! Cache-backed candidate lookup
//!
//! Finds cached releases for one event: a cheap pre-filter on the indexed
//! `(sport_prefix, year)` columns, then the full match engine in memory,
//! ranked by confidence. This is what manual event searches consult before
//! going out to the indexers.

use arenarr_core::domain::repositories::ReleaseCacheRepository;
use arenarr_core::models::event::Event;
use arenarr_core::models::release::CachedRelease;
use arenarr_core::Result;
use arenarr_decision::{match_release, parse_title, MatchOutcome, SearchNormalizer};
use std::sync::Arc;

/// Candidate rows loaded per lookup.
const CANDIDATE_LIMIT: i64 = 1000;

/// Cached releases matching an event, best confidence first.
pub async fn find_matching_cached(
    cache: &Arc<dyn ReleaseCacheRepository>,
    event: &Event,
    normalizer: &dyn SearchNormalizer,
    multi_part_enabled: bool,
) -> Result<Vec<(CachedRelease, MatchOutcome)>> {
    let candidates = cache
        .find_candidates(
            event.sport_prefix.as_deref(),
            event.year(),
            CANDIDATE_LIMIT,
        )
        .await?;

    let mut matches: Vec<(CachedRelease, MatchOutcome)> = candidates
        .into_iter()
        .filter_map(|cached| {
            let parsed = parse_title(&cached.title);
            let outcome = match_release(event, &parsed, normalizer, multi_part_enabled);
            outcome.is_match.then_some((cached, outcome))
        })
        .collect();

    matches.sort_by(|a, b| {
        b.1.confidence
            .partial_cmp(&a.1.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(matches)
}
