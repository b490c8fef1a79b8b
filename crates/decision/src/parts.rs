//! Fight-card part detection and motorsport session detection
//!
//! Detection tables are ordered most-specific first and the first matching
//! row wins; that ordering is what keeps `Early Prelims` from being read as
//! `Prelims`, and `Sprint Qualifying` from being read as `Sprint`.

use arenarr_core::models::parsed::{EventType, Part, SessionType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of part detection over a release title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartDetection {
    /// A named card segment
    Segment(Part),
    /// Explicit whole-card-in-one-file sentinel (`Full Event`)
    FullEvent,
    /// No part token present
    Unknown,
}

enum PartToken {
    Segment(Part),
    FullEvent,
}

/// Ordered part table. `Early Prelims` must stay above `Prelims`.
static PART_TABLE: Lazy<Vec<(Regex, PartToken)>> = Lazy::new(|| {
    vec![
        (r"\bearly prelims?\b", PartToken::Segment(Part::EarlyPrelims)),
        (r"\bprelims?\b", PartToken::Segment(Part::Prelims)),
        (
            r"\bmain card\b|\bmc\b|\bppv\b",
            PartToken::Segment(Part::MainCard),
        ),
        (
            r"\bpost show\b|\bpostshow\b|\bpost fight show\b",
            PartToken::Segment(Part::PostShow),
        ),
        (r"\bfull event\b", PartToken::FullEvent),
    ]
    .into_iter()
    .map(|(pattern, token)| (Regex::new(pattern).expect("part regex"), token))
    .collect()
});

/// Detect a fight-card part in a pre-normalised title.
pub fn detect_part(normalized_title: &str) -> PartDetection {
    for (regex, token) in PART_TABLE.iter() {
        if regex.is_match(normalized_title) {
            return match token {
                PartToken::Segment(part) => PartDetection::Segment(*part),
                PartToken::FullEvent => PartDetection::FullEvent,
            };
        }
    }
    PartDetection::Unknown
}

/// Ordered session table. `Sprint Qualifying` must stay above `Sprint`,
/// and both above `Qualifying`.
static SESSION_TABLE: Lazy<Vec<(Regex, SessionType)>> = Lazy::new(|| {
    vec![
        (
            r"\bsprint qualifying\b|\bsprint quali\b|\bsprint shootout\b",
            SessionType::SprintQualifying,
        ),
        (r"\bsprint\b", SessionType::Sprint),
        (r"\bqualifying\b|\bquali\b", SessionType::Qualifying),
        (r"\bfp1\b|\bfree practice 1\b|\bpractice 1\b", SessionType::Fp1),
        (r"\bfp2\b|\bfree practice 2\b|\bpractice 2\b", SessionType::Fp2),
        (r"\bfp3\b|\bfree practice 3\b|\bpractice 3\b", SessionType::Fp3),
        (r"\brace\b", SessionType::Race),
    ]
    .into_iter()
    .map(|(pattern, session)| (Regex::new(pattern).expect("session regex"), session))
    .collect()
});

/// Detect a motorsport session type in a pre-normalised title.
pub fn detect_session(normalized_title: &str) -> Option<SessionType> {
    SESSION_TABLE
        .iter()
        .find(|(regex, _)| regex.is_match(normalized_title))
        .map(|(_, session)| *session)
}

static CONTENDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcontender series\b|\bdwcs\b").expect("contender regex"));

static FIGHT_NIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfight night\b|\bon (?:espn|abc|fox)\b").expect("fight night regex")
});

static NUMBERED_CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:ufc|bellator|pfl) ?\d{1,3}\b").expect("numbered card regex"));

/// Infer the broadcast structure of a fighting event from its title.
pub fn infer_event_type(event_title: &str) -> EventType {
    let normalized = crate::parser::normalize_title(event_title);
    if CONTENDER_RE.is_match(&normalized) {
        return EventType::ContenderSeries;
    }
    if FIGHT_NIGHT_RE.is_match(&normalized) {
        return EventType::FightNight;
    }
    if NUMBERED_CARD_RE.is_match(&normalized) {
        return EventType::Ppv;
    }
    EventType::Ppv
}
