//! Match engine
//!
//! Decides whether a parsed release corresponds to a monitored event.
//! Structural mismatches (wrong year, wrong round, wrong card number) are
//! hard rejections that short-circuit with zero confidence; otherwise a
//! weighted soft score in `[0, 100]` is compared against the acceptance
//! threshold.

use crate::aliases::{content_tokens, SearchNormalizer};
use crate::parser::{normalize_title, parse_title};
use arenarr_core::models::event::Event;
use arenarr_core::models::parsed::ParsedRelease;
use chrono::Datelike;
use std::collections::HashSet;

/// Minimum soft score for a match to be accepted.
pub const MATCH_ACCEPT_THRESHOLD: f32 = 60.0;

/// Result of matching one release against one event
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub is_match: bool,
    pub is_hard_rejection: bool,
    /// Soft score in `[0, 100]`; zero on hard rejection
    pub confidence: f32,
    pub reasons: Vec<String>,
}

impl MatchOutcome {
    fn hard_rejection(reason: String) -> Self {
        Self {
            is_match: false,
            is_hard_rejection: true,
            confidence: 0.0,
            reasons: vec![reason],
        }
    }
}

/// Tokens of a team name with stopwords removed.
fn team_tokens(normalizer: &dyn SearchNormalizer, name: &str) -> HashSet<String> {
    content_tokens(&normalizer.normalize(&normalize_title(name)))
}

/// Whether any alias variant of `value` occurs in the release title.
fn location_matches(
    normalizer: &dyn SearchNormalizer,
    value: &str,
    release_tokens: &HashSet<String>,
    normalized_release: &str,
) -> bool {
    for word in value.split_whitespace() {
        for variant in normalizer.expand(word) {
            if release_tokens.contains(&variant) {
                return true;
            }
        }
    }
    for variant in normalizer.expand(value) {
        if variant.contains(' ') {
            if normalized_release.contains(&variant) {
                return true;
            }
        } else if release_tokens.contains(&variant) {
            return true;
        }
    }
    false
}

/// Score a `(release, event)` pair.
pub fn match_release(
    event: &Event,
    parsed: &ParsedRelease,
    normalizer: &dyn SearchNormalizer,
    multi_part_enabled: bool,
) -> MatchOutcome {
    let normalized_release = normalizer.normalize(&normalize_title(&parsed.title));
    let release_tokens = content_tokens(&normalized_release);
    let normalized_event_title = normalizer.normalize(&normalize_title(&event.title));
    let event_tokens = content_tokens(&normalized_event_title);
    let event_year = event.year();

    // --- hard rejections ---

    if let (Some(release_year), Some(event_year)) = (parsed.year, event_year) {
        if release_year != event_year {
            return MatchOutcome::hard_rejection(format!(
                "year mismatch: release {release_year}, event {event_year}"
            ));
        }
    }

    if let (Some(release_prefix), Some(event_prefix)) =
        (parsed.sport_prefix.as_deref(), event.sport_prefix.as_deref())
    {
        if !release_prefix.eq_ignore_ascii_case(event_prefix) {
            return MatchOutcome::hard_rejection(format!(
                "league mismatch: release {release_prefix}, event {event_prefix}"
            ));
        }
    }

    if event.sport.is_motorsport() {
        if let (Some(release_round), Some(event_round)) = (parsed.round, event.round) {
            if release_round != event_round {
                return MatchOutcome::hard_rejection(format!(
                    "round mismatch: release round {release_round}, event round {event_round}"
                ));
            }
        }
        if let Some(location) = event.location.as_deref() {
            if !location_matches(normalizer, location, &release_tokens, &normalized_release) {
                return MatchOutcome::hard_rejection(format!(
                    "release does not mention event location '{location}'"
                ));
            }
        }
    }

    if event.sport.is_team_sport() {
        if let (Some(release_date), Some(event_date)) = (parsed.date, event.event_date) {
            if release_date.month() != event_date.month() || release_date.day() != event_date.day()
            {
                return MatchOutcome::hard_rejection(format!(
                    "date mismatch: release {release_date}, event {}",
                    event_date.date_naive()
                ));
            }
        }

        let mut home = event
            .home_team
            .as_deref()
            .map(|name| team_tokens(normalizer, name))
            .unwrap_or_default();
        let away = event
            .away_team
            .as_deref()
            .map(|name| team_tokens(normalizer, name))
            .unwrap_or_default();
        if !home.is_empty() || !away.is_empty() {
            home.extend(away);
            if home.is_disjoint(&release_tokens) {
                return MatchOutcome::hard_rejection(
                    "release does not mention either team".to_string(),
                );
            }
        }
    }

    let event_number = if event.sport.is_fighting() {
        parse_title(&event.title).event_number
    } else {
        None
    };
    if let (Some(release_number), Some(event_number)) = (parsed.event_number, event_number) {
        if release_number != event_number {
            return MatchOutcome::hard_rejection(format!(
                "card number mismatch: release {release_number}, event {event_number}"
            ));
        }
    }

    // --- soft scoring ---

    let mut confidence = 0.0f32;
    let mut reasons = Vec::new();

    let intersection = release_tokens.intersection(&event_tokens).count();
    let union = release_tokens.union(&event_tokens).count();
    if union > 0 {
        let overlap = intersection as f32 / union as f32;
        let contribution = overlap * 40.0;
        if contribution > 0.0 {
            confidence += contribution;
            reasons.push(format!("title token overlap {:.2}", overlap));
        }
    }

    if parsed.sport_prefix.is_some() && parsed.sport_prefix == event.sport_prefix {
        confidence += 10.0;
        reasons.push("league prefix agrees".to_string());
    }

    if parsed.year.is_some() && parsed.year == event_year {
        confidence += 10.0;
        reasons.push("year agrees".to_string());
    }

    if event.sport.is_fighting() {
        if let (Some(release_number), Some(number)) = (parsed.event_number, event_number) {
            if release_number == number {
                confidence += 40.0;
                reasons.push(format!("card number {number} agrees"));
            }
        }
    }

    if event.sport.is_motorsport() {
        if let (Some(release_round), Some(event_round)) = (parsed.round, event.round) {
            if release_round == event_round {
                confidence += 25.0;
                reasons.push(format!("round {event_round} agrees"));
            }
        }
        if let Some(location) = event.location.as_deref() {
            if location_matches(normalizer, location, &release_tokens, &normalized_release) {
                confidence += 25.0;
                reasons.push("event location mentioned".to_string());
            }
        }
    }

    if event.sport.is_team_sport() {
        if let (Some(release_date), Some(event_date)) = (parsed.date, event.event_date) {
            if release_date.month() == event_date.month()
                && release_date.day() == event_date.day()
            {
                confidence += 25.0;
                reasons.push("date agrees".to_string());
            }
        }
        let team_mentioned = [event.home_team.as_deref(), event.away_team.as_deref()]
            .into_iter()
            .flatten()
            .any(|name| !team_tokens(normalizer, name).is_disjoint(&release_tokens));
        if team_mentioned {
            confidence += 25.0;
            reasons.push("team name mentioned".to_string());
        }
    }

    if multi_part_enabled {
        if let Some(part) = parsed.part {
            if event.is_part_monitored(part.name()) {
                confidence += 10.0;
                reasons.push(format!("monitored part '{}' agrees", part.name()));
            }
        }
    }

    let confidence = confidence.min(100.0);
    MatchOutcome {
        is_match: confidence >= MATCH_ACCEPT_THRESHOLD,
        is_hard_rejection: false,
        confidence,
        reasons,
    }
}
