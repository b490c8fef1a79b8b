//! Delay profiles: protocol preference and propagation delay policy

use super::release::ReleaseProtocol;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-tag protocol preference and propagation-delay policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayProfile {
    pub id: i32,
    /// Priority among profiles; lower order wins
    pub order: i32,
    pub preferred_protocol: ReleaseProtocol,
    pub usenet_delay_mins: i64,
    pub torrent_delay_mins: i64,
    pub bypass_if_highest_quality: bool,
    pub bypass_if_above_custom_format_score: bool,
    pub minimum_custom_format_score: i32,
    /// Tag set this profile applies to; empty = the default profile
    pub tags: Vec<i32>,
}

impl DelayProfile {
    /// The built-in default: no delay, torrent preferred, applies everywhere.
    pub fn default_profile() -> Self {
        Self {
            id: 1,
            order: i32::MAX,
            preferred_protocol: ReleaseProtocol::Torrent,
            usenet_delay_mins: 0,
            torrent_delay_mins: 0,
            bypass_if_highest_quality: false,
            bypass_if_above_custom_format_score: false,
            minimum_custom_format_score: 0,
            tags: Vec::new(),
        }
    }

    pub fn delay_for(&self, protocol: ReleaseProtocol) -> Duration {
        match protocol {
            ReleaseProtocol::Usenet => Duration::minutes(self.usenet_delay_mins),
            ReleaseProtocol::Torrent => Duration::minutes(self.torrent_delay_mins),
        }
    }

    /// A release is delayed iff it is younger than the protocol delay and no
    /// bypass condition holds.
    pub fn is_delayed(
        &self,
        publish_date: Option<DateTime<Utc>>,
        protocol: ReleaseProtocol,
        is_highest_quality: bool,
        custom_format_score: i32,
        now: DateTime<Utc>,
    ) -> bool {
        let delay = self.delay_for(protocol);
        if delay <= Duration::zero() {
            return false;
        }
        if self.bypass_if_highest_quality && is_highest_quality {
            return false;
        }
        if self.bypass_if_above_custom_format_score
            && custom_format_score >= self.minimum_custom_format_score
        {
            return false;
        }
        match publish_date {
            // Unknown age is treated as old enough
            None => false,
            Some(published) => now - published < delay,
        }
    }

    /// Choose the applicable profile for an event: the lowest-`order` profile
    /// whose tag set intersects the event's tags, falling back to the
    /// untagged default.
    pub fn select<'a>(profiles: &'a [DelayProfile], event_tags: &[i32]) -> Option<&'a DelayProfile> {
        let mut tagged: Vec<&DelayProfile> = profiles
            .iter()
            .filter(|p| !p.tags.is_empty() && p.tags.iter().any(|t| event_tags.contains(t)))
            .collect();
        tagged.sort_by_key(|p| p.order);
        tagged
            .into_iter()
            .next()
            .or_else(|| profiles.iter().find(|p| p.tags.is_empty()))
    }
}
