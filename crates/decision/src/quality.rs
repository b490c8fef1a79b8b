//! Quality resolution
//!
//! Maps parsed release fields onto the canonical quality table and ranks the
//! result within a profile.

use arenarr_core::models::parsed::ParsedRelease;
use arenarr_core::models::quality::{QualityDefinition, QualityProfile};

/// A release's quality resolved against a profile
#[derive(Debug, Clone)]
pub struct QualityResolution {
    pub definition: &'static QualityDefinition,
    /// Rank among the profile's allowed items; higher is better
    pub rank: Option<i32>,
    pub allowed: bool,
}

impl QualityResolution {
    /// Canonical quality name, e.g. `"WEBDL-1080p"`.
    pub fn name(&self) -> &str {
        &self.definition.title
    }
}

/// Resolve a parsed release's quality within a profile.
pub fn resolve_quality(parsed: &ParsedRelease, profile: &QualityProfile) -> QualityResolution {
    let definition = QualityDefinition::resolve(parsed.resolution, parsed.source);
    let allowed = profile.is_allowed(definition);
    let rank = profile.rank(definition);
    QualityResolution {
        definition,
        rank,
        allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_title;

    #[test]
    fn resolves_canonical_name_and_rank() {
        let profile = QualityProfile::default_profile();
        let parsed = parse_title("UFC.310.2024.1080p.WEB-DL-GRP");
        let resolution = resolve_quality(&parsed, &profile);
        assert_eq!(resolution.name(), "WEBDL-1080p");
        assert!(resolution.allowed);
        assert!(resolution.rank.is_some());
    }

    #[test]
    fn disallowed_quality_has_no_rank() {
        let profile = QualityProfile::default_profile();
        let parsed = parse_title("UFC.310.2024.480p.SDTV");
        let resolution = resolve_quality(&parsed, &profile);
        assert!(!resolution.allowed);
        assert_eq!(resolution.rank, None);
    }

    #[test]
    fn higher_quality_outranks_lower() {
        let profile = QualityProfile::default_profile();
        let webdl = resolve_quality(&parse_title("E.2024.1080p.WEB-DL"), &profile);
        let hdtv = resolve_quality(&parse_title("E.2024.720p.HDTV"), &profile);
        assert!(webdl.rank.unwrap() > hdtv.rank.unwrap());
    }
}
