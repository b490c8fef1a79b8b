//! Structured metadata decoded from a release title

use super::quality::{Codec, Resolution, Source};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Named sub-broadcast of a fight card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    EarlyPrelims,
    Prelims,
    MainCard,
    PostShow,
}

impl Part {
    /// Display name as stored on event files and monitored-part sets
    pub fn name(&self) -> &'static str {
        match self {
            Part::EarlyPrelims => "Early Prelims",
            Part::Prelims => "Prelims",
            Part::MainCard => "Main Card",
            Part::PostShow => "Post Show",
        }
    }

    /// Part number within an event of the given type. Fight Night cards have
    /// no early prelims, so numbering starts at Prelims.
    pub fn number(&self, event_type: EventType) -> Option<u8> {
        match event_type {
            EventType::Ppv => Some(match self {
                Part::EarlyPrelims => 1,
                Part::Prelims => 2,
                Part::MainCard => 3,
                Part::PostShow => 4,
            }),
            EventType::FightNight => match self {
                Part::EarlyPrelims => None,
                Part::Prelims => Some(1),
                Part::MainCard => Some(2),
                Part::PostShow => Some(3),
            },
            EventType::ContenderSeries => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Part> {
        match name.trim().to_lowercase().as_str() {
            "early prelims" => Some(Part::EarlyPrelims),
            "prelims" => Some(Part::Prelims),
            "main card" => Some(Part::MainCard),
            "post show" => Some(Part::PostShow),
            _ => None,
        }
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Broadcast structure of a fighting event, inferred from its title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Numbered pay-per-view card: Early Prelims / Prelims / Main Card / Post Show
    Ppv,
    /// Fight Night style card: Prelims / Main Card only
    FightNight,
    /// Single-broadcast show; no part structure
    ContenderSeries,
}

/// Motorsport session type, used only to filter monitored sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    Fp1,
    Fp2,
    Fp3,
    Qualifying,
    SprintQualifying,
    Sprint,
    Race,
}

impl SessionType {
    pub fn name(&self) -> &'static str {
        match self {
            SessionType::Fp1 => "FP1",
            SessionType::Fp2 => "FP2",
            SessionType::Fp3 => "FP3",
            SessionType::Qualifying => "Qualifying",
            SessionType::SprintQualifying => "Sprint Qualifying",
            SessionType::Sprint => "Sprint",
            SessionType::Race => "Race",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Structured fields decoded from a release title.
///
/// Produced by the title parser; all fields are best-effort and a release
/// that defeats every rule yields the original title with everything else
/// at its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParsedRelease {
    /// Original title, always preserved verbatim
    pub title: String,
    pub year: Option<i32>,
    pub date: Option<NaiveDate>,
    /// Round or week number (`Round 24`, `Week 15`)
    pub round: Option<u32>,
    /// Canonical league/organisation token (`UFC`, `Formula1`, `NFL`, ...)
    pub sport_prefix: Option<String>,
    /// Numeric event id for numbered fight cards (`UFC 310` -> 310)
    pub event_number: Option<u32>,
    pub part: Option<Part>,
    pub session: Option<SessionType>,
    pub resolution: Resolution,
    pub source: Source,
    pub codec: Codec,
    pub language: Option<String>,
    pub release_group: Option<String>,
    /// Multi-event bundle (`NFL Week 15 complete`)
    pub is_pack: bool,
}

impl ParsedRelease {
    /// Canonical quality title for the parsed (resolution, source) pair.
    pub fn quality_title(&self) -> String {
        super::quality::QualityDefinition::resolve(self.resolution, self.source)
            .title
            .clone()
    }
}
