//! Event domain model
//!
//! An `Event` is a single monitored sporting event: one fight card, one race
//! session, one fixture. Events are created by the upstream catalogue sync
//! and mutated only by matching and import.

use super::parsed::SessionType;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sport discipline of an event. Governs part detection, match-engine rules
/// and session filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sport {
    Fighting,
    Boxing,
    Kickboxing,
    MuayThai,
    Wrestling,
    Motorsport,
    TeamSport,
    #[default]
    Other,
}

impl Sport {
    /// Fighting disciplines carry multi-part fight cards.
    pub fn is_fighting(&self) -> bool {
        matches!(
            self,
            Sport::Fighting
                | Sport::Boxing
                | Sport::Kickboxing
                | Sport::MuayThai
                | Sport::Wrestling
        )
    }

    pub fn is_motorsport(&self) -> bool {
        matches!(self, Sport::Motorsport)
    }

    pub fn is_team_sport(&self) -> bool {
        matches!(self, Sport::TeamSport)
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sport::Fighting => write!(f, "fighting"),
            Sport::Boxing => write!(f, "boxing"),
            Sport::Kickboxing => write!(f, "kickboxing"),
            Sport::MuayThai => write!(f, "muay_thai"),
            Sport::Wrestling => write!(f, "wrestling"),
            Sport::Motorsport => write!(f, "motorsport"),
            Sport::TeamSport => write!(f, "team_sport"),
            Sport::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fighting" | "mma" => Ok(Sport::Fighting),
            "boxing" => Ok(Sport::Boxing),
            "kickboxing" => Ok(Sport::Kickboxing),
            "muay_thai" | "muay thai" => Ok(Sport::MuayThai),
            "wrestling" => Ok(Sport::Wrestling),
            "motorsport" => Ok(Sport::Motorsport),
            "team_sport" | "team sport" => Ok(Sport::TeamSport),
            "other" => Ok(Sport::Other),
            other => Err(format!("unknown sport: '{other}'")),
        }
    }
}

/// A monitored sporting event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub league_id: Option<i32>,
    pub sport: Sport,
    /// Canonical league/organisation token used by the parser (`UFC`, `Formula1`)
    pub sport_prefix: Option<String>,

    // Scheduling
    pub event_date: Option<DateTime<Utc>>,
    pub season: Option<i32>,
    pub round: Option<u32>,
    pub episode_number: Option<i32>,
    /// Approximate broadcast runtime, used for per-minute size bounds
    pub runtime_mins: Option<i32>,

    // Participants / venue
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub location: Option<String>,

    // Monitoring
    pub monitored: bool,
    pub has_file: bool,
    pub quality_profile_id: Option<i32>,
    /// Monitored fight-card parts by name; empty means all parts
    pub monitored_parts: Vec<String>,
    /// Monitored motorsport sessions; `None` means all, empty means none
    pub monitored_sessions: Option<Vec<SessionType>>,
    pub tags: Vec<i32>,

    // Timestamps
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_search_time: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(title: String, sport: Sport) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            league_id: None,
            sport,
            sport_prefix: None,
            event_date: None,
            season: None,
            round: None,
            episode_number: None,
            runtime_mins: None,
            home_team: None,
            away_team: None,
            location: None,
            monitored: true,
            has_file: false,
            quality_profile_id: None,
            monitored_parts: Vec::new(),
            monitored_sessions: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            last_search_time: None,
        }
    }

    /// Calendar year of the event, from its scheduled date.
    pub fn year(&self) -> Option<i32> {
        self.event_date.map(|d| d.year())
    }

    /// Whether a named fight-card part is monitored. An empty set monitors
    /// every part (including a single full-event file).
    pub fn is_part_monitored(&self, part_name: &str) -> bool {
        self.monitored_parts.is_empty()
            || self
                .monitored_parts
                .iter()
                .any(|p| p.eq_ignore_ascii_case(part_name))
    }

    /// Whether a motorsport session type is monitored.
    pub fn is_session_monitored(&self, session: SessionType) -> bool {
        match &self.monitored_sessions {
            None => true,
            Some(sessions) => sessions.contains(&session),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One physical file imported for an event. Multi-part events may own several.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFile {
    pub id: Uuid,
    pub event_id: Uuid,
    pub file_path: String,
    pub size_bytes: i64,
    /// Canonical quality title, e.g. `"WEBDL-1080p"`
    pub quality: String,
    pub part_name: Option<String>,
    pub part_number: Option<i32>,
    pub added: DateTime<Utc>,
    pub last_verified: Option<DateTime<Utc>>,
    pub exists: bool,
}

impl EventFile {
    pub fn new(event_id: Uuid, file_path: String, size_bytes: i64, quality: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            file_path,
            size_bytes,
            quality,
            part_name: None,
            part_number: None,
            added: Utc::now(),
            last_verified: None,
            exists: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_monitored_parts_means_all() {
        let event = Event::new("UFC 310".to_string(), Sport::Fighting);
        assert!(event.is_part_monitored("Early Prelims"));
        assert!(event.is_part_monitored("Main Card"));
    }

    #[test]
    fn explicit_monitored_parts_filter() {
        let mut event = Event::new("UFC 310".to_string(), Sport::Fighting);
        event.monitored_parts = vec!["Main Card".to_string()];
        assert!(event.is_part_monitored("main card"));
        assert!(!event.is_part_monitored("Prelims"));
    }

    #[test]
    fn session_monitoring_none_all_empty_none() {
        let mut event = Event::new("Abu Dhabi Grand Prix".to_string(), Sport::Motorsport);
        assert!(event.is_session_monitored(SessionType::Fp1));

        event.monitored_sessions = Some(vec![]);
        assert!(!event.is_session_monitored(SessionType::Race));

        event.monitored_sessions = Some(vec![SessionType::Race, SessionType::Qualifying]);
        assert!(event.is_session_monitored(SessionType::Race));
        assert!(!event.is_session_monitored(SessionType::Sprint));
    }
}
