//! Quality definitions and profiles
//!
//! A `QualityDefinition` is a totally-ordered quality level (resolution +
//! source family) with per-minute size bounds. A `QualityProfile` is an
//! ordered, per-user preference over definitions plus custom-format scoring.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Resolution family of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    R2160,
    R1080,
    R720,
    Sd,
    #[default]
    Unknown,
}

/// Source a release was captured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Source {
    Remux,
    Bluray,
    WebDl,
    WebRip,
    Hdtv,
    DvdRip,
    Sdtv,
    #[default]
    Unknown,
}

/// Video codec detected in a release title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Codec {
    X264,
    X265,
    Hevc,
    Av1,
    Xvid,
    #[default]
    Unknown,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::R2160 => write!(f, "2160p"),
            Resolution::R1080 => write!(f, "1080p"),
            Resolution::R720 => write!(f, "720p"),
            Resolution::Sd => write!(f, "SD"),
            Resolution::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Remux => write!(f, "Remux"),
            Source::Bluray => write!(f, "BluRay"),
            Source::WebDl => write!(f, "WEBDL"),
            Source::WebRip => write!(f, "WEBRip"),
            Source::Hdtv => write!(f, "HDTV"),
            Source::DvdRip => write!(f, "DVDRip"),
            Source::Sdtv => write!(f, "SDTV"),
            Source::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One totally-ordered quality level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDefinition {
    pub id: i32,
    /// Canonical title, e.g. `"WEBDL-1080p"`
    pub title: String,
    pub resolution: Resolution,
    pub source: Source,
    /// Position in the total order; higher is better
    pub weight: i32,
    /// Minimum acceptable size in MB per minute of runtime
    pub min_size_mb_per_min: Option<f64>,
    /// Maximum acceptable size in MB per minute of runtime
    pub max_size_mb_per_min: Option<f64>,
}

macro_rules! quality_def {
    ($id:expr, $title:expr, $res:expr, $src:expr, $weight:expr, $min:expr, $max:expr) => {
        QualityDefinition {
            id: $id,
            title: $title.to_string(),
            resolution: $res,
            source: $src,
            weight: $weight,
            min_size_mb_per_min: $min,
            max_size_mb_per_min: $max,
        }
    };
}

/// The canonical quality table, ordered worst to best.
pub static QUALITY_DEFINITIONS: Lazy<Vec<QualityDefinition>> = Lazy::new(|| {
    vec![
        quality_def!(0, "Unknown", Resolution::Unknown, Source::Unknown, 0, None, None),
        quality_def!(1, "SDTV", Resolution::Sd, Source::Sdtv, 1, Some(2.0), Some(30.0)),
        quality_def!(2, "DVDRip", Resolution::Sd, Source::DvdRip, 2, Some(2.0), Some(40.0)),
        quality_def!(3, "HDTV-720p", Resolution::R720, Source::Hdtv, 3, Some(4.0), Some(60.0)),
        quality_def!(4, "WEBRip-720p", Resolution::R720, Source::WebRip, 4, Some(4.0), Some(60.0)),
        quality_def!(5, "WEBDL-720p", Resolution::R720, Source::WebDl, 5, Some(4.0), Some(60.0)),
        quality_def!(6, "Bluray-720p", Resolution::R720, Source::Bluray, 6, Some(6.0), Some(80.0)),
        quality_def!(7, "HDTV-1080p", Resolution::R1080, Source::Hdtv, 7, Some(6.0), Some(90.0)),
        quality_def!(8, "WEBRip-1080p", Resolution::R1080, Source::WebRip, 8, Some(6.0), Some(90.0)),
        quality_def!(9, "WEBDL-1080p", Resolution::R1080, Source::WebDl, 9, Some(6.0), Some(90.0)),
        quality_def!(10, "Bluray-1080p", Resolution::R1080, Source::Bluray, 10, Some(10.0), Some(120.0)),
        quality_def!(11, "Remux-1080p", Resolution::R1080, Source::Remux, 11, Some(20.0), None),
        quality_def!(12, "HDTV-2160p", Resolution::R2160, Source::Hdtv, 12, Some(15.0), Some(160.0)),
        quality_def!(13, "WEBRip-2160p", Resolution::R2160, Source::WebRip, 13, Some(15.0), Some(160.0)),
        quality_def!(14, "WEBDL-2160p", Resolution::R2160, Source::WebDl, 14, Some(15.0), Some(160.0)),
        quality_def!(15, "Bluray-2160p", Resolution::R2160, Source::Bluray, 15, Some(25.0), Some(220.0)),
        quality_def!(16, "Remux-2160p", Resolution::R2160, Source::Remux, 16, Some(40.0), None),
    ]
});

impl QualityDefinition {
    /// Resolve the canonical definition for a parsed (resolution, source) pair.
    pub fn resolve(resolution: Resolution, source: Source) -> &'static QualityDefinition {
        QUALITY_DEFINITIONS
            .iter()
            .find(|def| def.resolution == resolution && def.source == source)
            .unwrap_or(&QUALITY_DEFINITIONS[0])
    }

    /// Look up a definition by its canonical title.
    pub fn by_title(title: &str) -> Option<&'static QualityDefinition> {
        QUALITY_DEFINITIONS
            .iter()
            .find(|def| def.title.eq_ignore_ascii_case(title))
    }

    pub fn is_unknown(&self) -> bool {
        self.weight == 0
    }
}

/// Selector for a profile item: an exact definition or a named group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QualitySelector {
    /// Matches one definition by id
    Exact { quality_id: i32 },
    /// Matches any definition with this resolution and one of these sources,
    /// e.g. `WEB 1080p` = 1080p + {WEB-DL, WEBRip}
    Group {
        name: String,
        resolution: Resolution,
        sources: Vec<Source>,
    },
}

impl QualitySelector {
    pub fn matches(&self, def: &QualityDefinition) -> bool {
        match self {
            QualitySelector::Exact { quality_id } => *quality_id == def.id,
            QualitySelector::Group {
                resolution,
                sources,
                ..
            } => def.resolution == *resolution && sources.contains(&def.source),
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, QualitySelector::Exact { .. })
    }
}

/// One entry in a profile's ordered preference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfileItem {
    pub selector: QualitySelector,
    pub allowed: bool,
    /// Position in the profile, 0 = most preferred
    pub position: i32,
}

/// Score attached to a custom format by a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatItem {
    pub custom_format_id: i32,
    pub score: i32,
}

/// Ordered preference list over quality definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i32,
    pub name: String,
    pub items: Vec<QualityProfileItem>,
    pub format_items: Vec<FormatItem>,
    /// Definitions below this id are rejected outright
    pub minimum_quality_id: Option<i32>,
    /// Once an event has a file at or above the cutoff, no further upgrades
    pub cutoff_quality_id: Option<i32>,
    pub upgrade_allowed: bool,
    pub min_format_score: i32,
    /// Preferred size in MB per minute of runtime; closer is better
    pub preferred_size_mb_per_min: Option<f64>,
    pub size_limit_min_mb_per_min: Option<f64>,
    pub size_limit_max_mb_per_min: Option<f64>,
}

impl QualityProfile {
    /// A permissive default profile allowing everything from HDTV-720p up,
    /// cutting off at WEBDL-1080p. Items are listed best-first: position 0
    /// is the most preferred quality.
    pub fn default_profile() -> Self {
        let items = QUALITY_DEFINITIONS
            .iter()
            .rev()
            .filter(|def| !def.is_unknown())
            .enumerate()
            .map(|(idx, def)| QualityProfileItem {
                selector: QualitySelector::Exact { quality_id: def.id },
                allowed: def.weight >= 3,
                position: idx as i32,
            })
            .collect();

        Self {
            id: 1,
            name: "Default".to_string(),
            items,
            format_items: Vec::new(),
            minimum_quality_id: Some(3),
            cutoff_quality_id: Some(9),
            upgrade_allowed: true,
            min_format_score: 0,
            preferred_size_mb_per_min: None,
            size_limit_min_mb_per_min: None,
            size_limit_max_mb_per_min: None,
        }
    }

    /// Find the profile item matching a definition.
    ///
    /// When both an exact item and a group item cover the same definition,
    /// the exact one wins.
    pub fn item_for(&self, def: &QualityDefinition) -> Option<&QualityProfileItem> {
        self.items
            .iter()
            .find(|item| item.selector.is_exact() && item.selector.matches(def))
            .or_else(|| self.items.iter().find(|item| item.selector.matches(def)))
    }

    pub fn is_allowed(&self, def: &QualityDefinition) -> bool {
        if let Some(min_id) = self.minimum_quality_id {
            if let Some(min_def) = QUALITY_DEFINITIONS.iter().find(|d| d.id == min_id) {
                if def.weight < min_def.weight {
                    return false;
                }
            }
        }
        self.item_for(def).map(|item| item.allowed).unwrap_or(false)
    }

    /// Rank of a definition among the allowed items: the inverse of its
    /// position, so the most-preferred allowed quality has the highest rank.
    /// `None` when the definition is not allowed by this profile.
    pub fn rank(&self, def: &QualityDefinition) -> Option<i32> {
        let item = self.item_for(def).filter(|item| item.allowed)?;
        if !self.is_allowed(def) {
            return None;
        }
        let mut allowed: Vec<&QualityProfileItem> =
            self.items.iter().filter(|i| i.allowed).collect();
        allowed.sort_by_key(|i| i.position);
        let idx = allowed
            .iter()
            .position(|i| i.position == item.position)? as i32;
        Some(allowed.len() as i32 - 1 - idx)
    }

    /// Whether a definition meets or exceeds the profile cutoff.
    pub fn meets_cutoff(&self, def: &QualityDefinition) -> bool {
        match self.cutoff_quality_id {
            Some(cutoff_id) => QUALITY_DEFINITIONS
                .iter()
                .find(|d| d.id == cutoff_id)
                .map(|cutoff| def.weight >= cutoff.weight)
                .unwrap_or(true),
            None => false,
        }
    }

    /// Score assigned by this profile to a custom format, 0 when unscored.
    pub fn format_score(&self, custom_format_id: i32) -> i32 {
        self.format_items
            .iter()
            .find(|item| item.custom_format_id == custom_format_id)
            .map(|item| item.score)
            .unwrap_or(0)
    }
}
