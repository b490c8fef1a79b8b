//! Custom formats
//!
//! A custom format is a named boolean predicate over parsed release
//! metadata, scored per quality profile. Specifications are tagged variants
//! with a single match method each; no string-keyed dispatch.

use super::parsed::ParsedRelease;
use super::quality::{Codec, Resolution, Source};
use super::release::ReleaseSearchResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One matching condition inside a custom format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormatCondition {
    /// Case-insensitive regex over the raw release title
    ReleaseTitleRegex { pattern: String },
    Source { source: Source },
    Resolution { resolution: Resolution },
    Codec { codec: Codec },
    Language { language: String },
    /// Case-insensitive regex over the parsed release group
    ReleaseGroup { pattern: String },
    /// Inclusive byte bounds; either side may be open
    SizeRange {
        min_bytes: Option<i64>,
        max_bytes: Option<i64>,
    },
    IndexerFlag { flag: String },
}

impl FormatCondition {
    /// Evaluate this condition against a parsed release, ignoring negation.
    pub fn matches(&self, parsed: &ParsedRelease, release: &ReleaseSearchResult) -> bool {
        match self {
            FormatCondition::ReleaseTitleRegex { pattern } => {
                matches_regex(pattern, &release.title)
            }
            FormatCondition::Source { source } => parsed.source == *source,
            FormatCondition::Resolution { resolution } => parsed.resolution == *resolution,
            FormatCondition::Codec { codec } => parsed.codec == *codec,
            FormatCondition::Language { language } => parsed
                .language
                .as_deref()
                .map(|l| l.eq_ignore_ascii_case(language))
                .unwrap_or(false),
            FormatCondition::ReleaseGroup { pattern } => parsed
                .release_group
                .as_deref()
                .map(|group| matches_regex(pattern, group))
                .unwrap_or(false),
            FormatCondition::SizeRange {
                min_bytes,
                max_bytes,
            } => match release.size_bytes {
                Some(size) => {
                    min_bytes.map(|min| size >= min).unwrap_or(true)
                        && max_bytes.map(|max| size <= max).unwrap_or(true)
                }
                None => false,
            },
            FormatCondition::IndexerFlag { flag } => release
                .indexer_flags
                .iter()
                .any(|f| f.eq_ignore_ascii_case(flag)),
        }
    }
}

fn matches_regex(pattern: &str, haystack: &str) -> bool {
    match Regex::new(&format!("(?i){pattern}")) {
        Ok(regex) => regex.is_match(haystack),
        // An unparseable pattern degrades to a substring test
        Err(_) => haystack.to_lowercase().contains(&pattern.to_lowercase()),
    }
}

/// A condition with its negate/required flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSpecification {
    pub negate: bool,
    pub required: bool,
    pub condition: FormatCondition,
}

impl FormatSpecification {
    pub fn new(condition: FormatCondition) -> Self {
        Self {
            negate: false,
            required: false,
            condition,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_satisfied(&self, parsed: &ParsedRelease, release: &ReleaseSearchResult) -> bool {
        let matched = self.condition.matches(parsed, release);
        if self.negate {
            !matched
        } else {
            matched
        }
    }
}

/// A named, scoreable predicate over release metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFormat {
    pub id: i32,
    pub name: String,
    pub specifications: Vec<FormatSpecification>,
}

impl CustomFormat {
    /// Standard semantics: every required specification must be satisfied,
    /// and when any non-required specifications exist, at least one of them
    /// must be satisfied too.
    pub fn matches(&self, parsed: &ParsedRelease, release: &ReleaseSearchResult) -> bool {
        if self.specifications.is_empty() {
            return false;
        }

        let all_required = self
            .specifications
            .iter()
            .filter(|s| s.required)
            .all(|s| s.is_satisfied(parsed, release));
        if !all_required {
            return false;
        }

        let optional: Vec<&FormatSpecification> = self
            .specifications
            .iter()
            .filter(|s| !s.required)
            .collect();
        optional.is_empty() || optional.iter().any(|s| s.is_satisfied(parsed, release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::release::ReleaseProtocol;

    fn release(title: &str) -> ReleaseSearchResult {
        ReleaseSearchResult::new(
            1,
            "mock".to_string(),
            title.to_string(),
            format!("guid-{title}"),
            "http://example.test/dl".to_string(),
            ReleaseProtocol::Torrent,
        )
    }

    fn parsed(title: &str) -> ParsedRelease {
        ParsedRelease {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn title_regex_condition_is_case_insensitive() {
        let format = CustomFormat {
            id: 1,
            name: "Freeleech title".to_string(),
            specifications: vec![FormatSpecification::new(
                FormatCondition::ReleaseTitleRegex {
                    pattern: r"\bfreeleech\b".to_string(),
                },
            )],
        };
        let r = release("UFC.310.FREELEECH.1080p");
        assert!(format.matches(&parsed(&r.title), &r));
    }

    #[test]
    fn required_spec_failing_rejects_format() {
        let format = CustomFormat {
            id: 2,
            name: "x265 web only".to_string(),
            specifications: vec![
                FormatSpecification::new(FormatCondition::Codec { codec: Codec::X265 }).required(),
                FormatSpecification::new(FormatCondition::Source {
                    source: Source::WebDl,
                }),
            ],
        };
        let r = release("Event.2024.1080p.WEB-DL.x264");
        let mut p = parsed(&r.title);
        p.codec = Codec::X264;
        p.source = Source::WebDl;
        assert!(!format.matches(&p, &r));

        p.codec = Codec::X265;
        assert!(format.matches(&p, &r));
    }

    #[test]
    fn negated_indexer_flag() {
        let format = CustomFormat {
            id: 3,
            name: "Not internal".to_string(),
            specifications: vec![FormatSpecification::new(FormatCondition::IndexerFlag {
                flag: "internal".to_string(),
            })
            .negated()],
        };
        let mut r = release("Event.2024.1080p");
        assert!(format.matches(&parsed(&r.title), &r));

        r.indexer_flags.push("Internal".to_string());
        assert!(!format.matches(&parsed(&r.title), &r));
    }

    #[test]
    fn size_range_needs_known_size() {
        let cond = FormatCondition::SizeRange {
            min_bytes: Some(1_000),
            max_bytes: Some(5_000),
        };
        let mut r = release("Event");
        let p = parsed("Event");
        assert!(!cond.matches(&p, &r));

        r.size_bytes = Some(3_000);
        assert!(cond.matches(&p, &r));

        r.size_bytes = Some(9_000);
        assert!(!cond.matches(&p, &r));
    }

    #[test]
    fn empty_format_never_matches() {
        let format = CustomFormat {
            id: 4,
            name: "Empty".to_string(),
            specifications: vec![],
        };
        let r = release("Anything");
        assert!(!format.matches(&parsed(&r.title), &r));
    }
}
