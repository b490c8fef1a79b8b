//! Release evaluator
//!
//! Applies quality profile, custom formats, size bounds, part rules and
//! indexer-flag filters to one release, producing an approval with scores or
//! a structured list of rejection reasons. Evaluation is pure: inputs are
//! never mutated and every rejection is a human-readable string.

use crate::quality::resolve_quality;
use arenarr_core::models::custom_format::CustomFormat;
use arenarr_core::models::event::Event;
use arenarr_core::models::parsed::{ParsedRelease, Part};
use arenarr_core::models::quality::QualityProfile;
use arenarr_core::models::release::ReleaseSearchResult;

/// Weight of one quality rank step.
pub const QUALITY_RANK_WEIGHT: i32 = 100;

/// Assumed runtime when an event does not carry one, in minutes.
pub const DEFAULT_RUNTIME_MINS: i32 = 180;

/// Evaluation policy shared across the releases of one search or sync pass
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub profile: &'a QualityProfile,
    pub formats: &'a [CustomFormat],
    pub multi_part_enabled: bool,
    /// The specific card part being searched for, when any
    pub requested_part: Option<Part>,
    /// Releases carrying any of these indexer flags are rejected
    pub blocked_indexer_flags: &'a [String],
}

impl<'a> EvaluationContext<'a> {
    pub fn new(profile: &'a QualityProfile, formats: &'a [CustomFormat]) -> Self {
        Self {
            profile,
            formats,
            multi_part_enabled: false,
            requested_part: None,
            blocked_indexer_flags: &[],
        }
    }
}

/// Outcome of evaluating one release
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub approved: bool,
    pub rejections: Vec<String>,
    /// Canonical quality name
    pub quality: String,
    pub quality_score: i32,
    pub custom_format_score: i32,
    pub size_score: i32,
    pub total_score: i32,
    pub matched_formats: Vec<String>,
}

impl Evaluation {
    /// Copy the evaluation onto the release's annotation fields.
    pub fn annotate(&self, release: &mut ReleaseSearchResult, parsed: &ParsedRelease) {
        release.quality = Some(self.quality.clone());
        release.quality_score = self.quality_score;
        release.custom_format_score = self.custom_format_score;
        release.size_score = self.size_score;
        release.score = self.total_score;
        release.approved = self.approved;
        release.rejections = self.rejections.clone();
        release.matched_formats = self.matched_formats.clone();
        release.part = parsed.part;
        release.is_pack = parsed.is_pack;
    }
}

/// Evaluate one release against an event's quality policy.
pub fn evaluate_release(
    release: &ReleaseSearchResult,
    parsed: &ParsedRelease,
    event: &Event,
    ctx: &EvaluationContext<'_>,
) -> Evaluation {
    let mut rejections = Vec::new();

    // Quality profile
    let resolution = resolve_quality(parsed, ctx.profile);
    let quality = resolution.name().to_string();
    let quality_score = match resolution.rank {
        Some(rank) if resolution.allowed => rank * QUALITY_RANK_WEIGHT,
        _ => {
            rejections.push(format!("quality {quality} is not allowed by profile"));
            0
        }
    };

    // Size bounds, in MB per minute of runtime
    let runtime_mins = event
        .runtime_mins
        .filter(|mins| *mins > 0)
        .unwrap_or(DEFAULT_RUNTIME_MINS) as f64;
    let mb_per_min = release
        .size_bytes
        .filter(|size| *size > 0)
        .map(|size| size as f64 / (1024.0 * 1024.0) / runtime_mins);

    if let Some(mb_per_min) = mb_per_min {
        let min_bound = ctx
            .profile
            .size_limit_min_mb_per_min
            .or(resolution.definition.min_size_mb_per_min);
        let max_bound = ctx
            .profile
            .size_limit_max_mb_per_min
            .or(resolution.definition.max_size_mb_per_min);

        if let Some(min) = min_bound {
            if mb_per_min < min {
                rejections.push(format!(
                    "size {mb_per_min:.1} MB/min is below the {min:.1} MB/min minimum for {quality}"
                ));
            }
        }
        if let Some(max) = max_bound {
            if mb_per_min > max {
                rejections.push(format!(
                    "size {mb_per_min:.1} MB/min exceeds the {max:.1} MB/min maximum for {quality}"
                ));
            }
        }
    }

    // Custom formats
    let mut custom_format_score = 0;
    let mut matched_formats = Vec::new();
    for format in ctx.formats {
        if format.matches(parsed, release) {
            custom_format_score += ctx.profile.format_score(format.id);
            matched_formats.push(format.name.clone());
        }
    }
    if custom_format_score < ctx.profile.min_format_score {
        rejections.push(format!(
            "custom format score {custom_format_score} is below the profile minimum {}",
            ctx.profile.min_format_score
        ));
    }

    // Fight-card part rules
    if event.sport.is_fighting() {
        match parsed.part {
            Some(part) => {
                if !ctx.multi_part_enabled {
                    rejections.push(format!(
                        "release is the '{}' part but multi-part episodes are disabled",
                        part.name()
                    ));
                } else {
                    if !event.is_part_monitored(part.name()) {
                        rejections.push(format!("part '{}' is not monitored", part.name()));
                    }
                    if let Some(requested) = ctx.requested_part {
                        if requested != part {
                            rejections.push(format!(
                                "release is the '{}' part but '{}' was requested",
                                part.name(),
                                requested.name()
                            ));
                        }
                    }
                }
            }
            None => {
                // A full-event file is rejected only when specific parts are
                // wanted: an explicit requested part, or an event with an
                // explicit monitored-part selection.
                if ctx.multi_part_enabled {
                    if let Some(requested) = ctx.requested_part {
                        rejections.push(format!(
                            "release is a full event but the '{}' part was requested",
                            requested.name()
                        ));
                    } else if !event.monitored_parts.is_empty() {
                        rejections.push(
                            "release is a full event but specific parts are monitored"
                                .to_string(),
                        );
                    }
                }
            }
        }
    }

    // Indexer flag filters
    for flag in ctx.blocked_indexer_flags {
        if release
            .indexer_flags
            .iter()
            .any(|f| f.eq_ignore_ascii_case(flag))
        {
            rejections.push(format!("indexer flag '{flag}' is blocked"));
        }
    }

    // Size score: prefer the profile's target when set, otherwise bigger is
    // better up to the allowed maximum
    let size_score = match mb_per_min {
        Some(mb_per_min) => match ctx.profile.preferred_size_mb_per_min {
            Some(preferred) => -((mb_per_min - preferred).abs().round() as i32),
            None => {
                let cap = ctx
                    .profile
                    .size_limit_max_mb_per_min
                    .or(resolution.definition.max_size_mb_per_min)
                    .unwrap_or(200.0);
                mb_per_min.min(cap).round() as i32
            }
        },
        None => 0,
    };

    let total_score = quality_score + custom_format_score + size_score;
    Evaluation {
        approved: rejections.is_empty(),
        rejections,
        quality,
        quality_score,
        custom_format_score,
        size_score,
        total_score,
        matched_formats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_title;
    use arenarr_core::models::custom_format::{
        FormatCondition, FormatSpecification,
    };
    use arenarr_core::models::event::Sport;
    use arenarr_core::models::quality::FormatItem;
    use arenarr_core::models::release::ReleaseProtocol;
    use chrono::{TimeZone, Utc};

    fn ufc_event() -> Event {
        let mut event = Event::new("UFC 310: Pantoja vs Asakura".to_string(), Sport::Fighting);
        event.sport_prefix = Some("UFC".to_string());
        event.event_date = Some(Utc.with_ymd_and_hms(2024, 12, 7, 0, 0, 0).unwrap());
        event.runtime_mins = Some(300);
        event
    }

    fn release(title: &str, size_gb: f64) -> ReleaseSearchResult {
        let mut release = ReleaseSearchResult::new(
            1,
            "mock".to_string(),
            title.to_string(),
            format!("guid-{title}"),
            "http://example.test/dl".to_string(),
            ReleaseProtocol::Torrent,
        );
        release.size_bytes = Some((size_gb * 1024.0 * 1024.0 * 1024.0) as i64);
        release.seeders = Some(50);
        release
    }

    #[test]
    fn approved_release_has_no_rejections() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext {
            multi_part_enabled: true,
            ..EvaluationContext::new(&profile, &[])
        };
        let r = release("UFC.310.Early.Prelims.2024.1080p.WEB-DL-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(eval.approved, "rejections: {:?}", eval.rejections);
        assert!(eval.rejections.is_empty());
        assert_eq!(eval.quality, "WEBDL-1080p");
        assert!(eval.quality_score > 0);
    }

    #[test]
    fn disallowed_quality_rejects() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext::new(&profile, &[]);
        let r = release("UFC.310.2024.480p.SDTV", 2.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(!eval.approved);
        assert!(eval.rejections[0].contains("not allowed"));
    }

    #[test]
    fn oversized_release_rejects() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext::new(&profile, &[]);
        // 300 min * 90 MB/min max for WEBDL-1080p is ~26 GB; 100 GB is out
        let r = release("UFC.310.2024.1080p.WEB-DL-GRP", 100.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(!eval.approved);
        assert!(eval.rejections.iter().any(|r| r.contains("exceeds")));
    }

    #[test]
    fn part_not_monitored_rejects_with_reason() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext {
            multi_part_enabled: true,
            ..EvaluationContext::new(&profile, &[])
        };
        let mut event = ufc_event();
        event.monitored_parts = vec!["Main Card".to_string()];

        let r = release("UFC.310.Early.Prelims.2024.1080p.WEB-DL-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &event, &ctx);
        assert!(!eval.approved);
        assert!(eval.rejections.iter().any(|r| r.contains("not monitored")));
    }

    #[test]
    fn part_release_with_multi_part_disabled_rejects() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext::new(&profile, &[]);
        let r = release("UFC.310.Prelims.2024.1080p.WEB-DL-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(!eval.approved);
        assert!(eval.rejections.iter().any(|r| r.contains("disabled")));
    }

    #[test]
    fn full_event_accepted_when_no_part_selection() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext {
            multi_part_enabled: true,
            ..EvaluationContext::new(&profile, &[])
        };
        let r = release("UFC.310.2024.1080p.WEB-DL-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(eval.approved, "rejections: {:?}", eval.rejections);
    }

    #[test]
    fn full_event_rejected_when_parts_selected() {
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext {
            multi_part_enabled: true,
            ..EvaluationContext::new(&profile, &[])
        };
        let mut event = ufc_event();
        event.monitored_parts = vec!["Main Card".to_string()];

        let r = release("UFC.310.2024.1080p.WEB-DL-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &event, &ctx);
        assert!(!eval.approved);
        assert!(eval.rejections.iter().any(|r| r.contains("full event")));
    }

    #[test]
    fn custom_format_scoring_and_minimum() {
        let mut profile = QualityProfile::default_profile();
        let formats = vec![CustomFormat {
            id: 7,
            name: "x265".to_string(),
            specifications: vec![FormatSpecification::new(FormatCondition::ReleaseTitleRegex {
                pattern: r"\bx265\b".to_string(),
            })],
        }];
        profile.format_items = vec![FormatItem {
            custom_format_id: 7,
            score: 50,
        }];

        let ctx = EvaluationContext::new(&profile, &formats);
        let r = release("UFC.310.2024.1080p.WEB-DL.x265-GRP", 8.0);
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert_eq!(eval.custom_format_score, 50);
        assert_eq!(eval.matched_formats, vec!["x265".to_string()]);

        // Raise the floor above the achievable score
        profile.min_format_score = 100;
        let ctx = EvaluationContext::new(&profile, &formats);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(!eval.approved);
    }

    #[test]
    fn blocked_indexer_flag_rejects() {
        let profile = QualityProfile::default_profile();
        let blocked = vec!["internal".to_string()];
        let ctx = EvaluationContext {
            blocked_indexer_flags: &blocked,
            ..EvaluationContext::new(&profile, &[])
        };
        let mut r = release("UFC.310.2024.1080p.WEB-DL-GRP", 8.0);
        r.indexer_flags.push("Internal".to_string());
        let parsed = parse_title(&r.title);
        let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
        assert!(!eval.approved);
    }

    #[test]
    fn preferred_size_scores_closer_higher() {
        let mut profile = QualityProfile::default_profile();
        profile.preferred_size_mb_per_min = Some(30.0);
        let ctx = EvaluationContext::new(&profile, &[]);

        // 300 min runtime: 9 GB ~ 30.7 MB/min, 20 GB ~ 68 MB/min
        let close = release("UFC.310.2024.1080p.WEB-DL-A", 9.0);
        let far = release("UFC.310.2024.1080p.WEB-DL-B", 20.0);
        let parsed_close = parse_title(&close.title);
        let parsed_far = parse_title(&far.title);

        let eval_close = evaluate_release(&close, &parsed_close, &ufc_event(), &ctx);
        let eval_far = evaluate_release(&far, &parsed_far, &ufc_event(), &ctx);
        assert!(eval_close.size_score > eval_far.size_score);
    }

    #[test]
    fn approval_invariant_no_rejections() {
        // For any evaluated release: approved implies empty rejections
        let profile = QualityProfile::default_profile();
        let ctx = EvaluationContext::new(&profile, &[]);
        for title in [
            "UFC.310.2024.1080p.WEB-DL-GRP",
            "UFC.310.2024.480p.SDTV",
            "UFC.310.Prelims.2024.1080p.WEB-DL-GRP",
        ] {
            let r = release(title, 8.0);
            let parsed = parse_title(title);
            let eval = evaluate_release(&r, &parsed, &ufc_event(), &ctx);
            assert_eq!(eval.approved, eval.rejections.is_empty());
        }
    }
}
