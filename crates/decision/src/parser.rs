//! Release title parser
//!
//! A deterministic rule stack that decodes a raw release title into a
//! `ParsedRelease`. Rules run in fixed order and later rules may observe
//! earlier-extracted fields. The parser is pure, never panics and never
//! fails: a title that defeats every rule comes back with all fields at
//! their defaults and the original title preserved.

use arenarr_core::models::parsed::ParsedRelease;
use arenarr_core::models::quality::{Codec, Resolution, Source};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parts::{detect_part, detect_session, PartDetection};

/// Lowercase the title, replace `.`, `_` and `-` separators with spaces and
/// collapse runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut last_was_space = false;
    for ch in title.chars() {
        let mapped = match ch {
            '.' | '_' | '-' => ' ',
            other => other,
        };
        if mapped.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
            }
            last_was_space = true;
        } else {
            for lower in mapped.to_lowercase() {
                normalized.push(lower);
            }
            last_was_space = false;
        }
    }
    normalized.trim().to_string()
}

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20[2-9][0-9]|2100)\b").expect("year regex"));

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20\d{2}) (\d{1,2}) (\d{1,2})\b").expect("date regex"));

static ROUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:round|week|r|w) ?(\d{1,2})\b").expect("round regex"));

/// League/organisation detection table. Anchored on word boundaries; the
/// first matching row wins, so more specific rows go first.
static SPORT_PREFIX_TABLE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let table: Vec<(&str, &str)> = vec![
        (r"\bufc\b", "UFC"),
        (r"\bbellator\b", "Bellator"),
        (r"\bpfl\b", "PFL"),
        (r"\bwwe\b", "WWE"),
        (r"\baew\b", "AEW"),
        (r"\bnfl\b", "NFL"),
        (r"\bnba\b", "NBA"),
        (r"\bnhl\b", "NHL"),
        (r"\bmlb\b", "MLB"),
        (r"\bmls\b", "MLS"),
        (r"\bepl\b|\bpremier league\b", "EPL"),
        (r"\bucl\b|\bchampions league\b", "UCL"),
        (r"\bla ?liga\b", "LaLiga"),
        (r"\bformula ?1\b|\bf1\b", "Formula1"),
        (r"\bformula ?e\b", "FormulaE"),
        (r"\bmoto ?gp\b", "MotoGP"),
        (r"\bindy ?car\b", "IndyCar"),
        (r"\bnascar\b", "NASCAR"),
        (r"\bwec\b", "WEC"),
        (r"\bboxing\b", "Boxing"),
    ];
    table
        .into_iter()
        .map(|(pattern, canonical)| (Regex::new(pattern).expect("sport prefix regex"), canonical))
        .collect()
});

/// Organisations whose events are fight cards with part structure.
const FIGHTING_PREFIXES: &[&str] = &["UFC", "Bellator", "PFL", "WWE", "AEW", "Boxing"];

/// Organisations whose releases carry motorsport session tokens.
const MOTORSPORT_PREFIXES: &[&str] = &["Formula1", "FormulaE", "MotoGP", "IndyCar", "NASCAR", "WEC"];

static EVENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:ufc|bellator|pfl) (\d{1,3})\b").expect("event number regex"));

static RESOLUTION_TABLE: Lazy<Vec<(Regex, Resolution)>> = Lazy::new(|| {
    vec![
        (r"\b2160p\b|\buhd\b|\b4k\b", Resolution::R2160),
        (r"\b1080p\b|\bfhd\b", Resolution::R1080),
        (r"\b720p\b|\bhd\b", Resolution::R720),
        (r"\b480p\b|\b576p\b|\bsd\b", Resolution::Sd),
    ]
    .into_iter()
    .map(|(pattern, res)| (Regex::new(pattern).expect("resolution regex"), res))
    .collect()
});

static SOURCE_TABLE: Lazy<Vec<(Regex, Source)>> = Lazy::new(|| {
    vec![
        (r"\bremux\b", Source::Remux),
        (r"\bblu ?ray\b|\bbdrip\b", Source::Bluray),
        (r"\bweb ?dl\b", Source::WebDl),
        (r"\bweb ?rip\b", Source::WebRip),
        (r"\bhdtv\b", Source::Hdtv),
        (r"\bdvd ?rip\b", Source::DvdRip),
        (r"\bsdtv\b", Source::Sdtv),
    ]
    .into_iter()
    .map(|(pattern, source)| (Regex::new(pattern).expect("source regex"), source))
    .collect()
});

static CODEC_TABLE: Lazy<Vec<(Regex, Codec)>> = Lazy::new(|| {
    vec![
        (r"\bx264\b|\bh264\b|\bh 264\b", Codec::X264),
        (r"\bx265\b|\bh265\b|\bh 265\b", Codec::X265),
        (r"\bhevc\b", Codec::Hevc),
        (r"\bav1\b", Codec::Av1),
        (r"\bxvid\b", Codec::Xvid),
    ]
    .into_iter()
    .map(|(pattern, codec)| (Regex::new(pattern).expect("codec regex"), codec))
    .collect()
});

static LANGUAGE_TABLE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (r"\bmulti\b", "multi"),
        (r"\bvostfr\b", "vostfr"),
        (r"\bfrench\b", "french"),
        (r"\bgerman\b", "german"),
        (r"\bspanish\b", "spanish"),
        (r"\bitalian\b", "italian"),
        (r"\benglish\b", "english"),
    ]
    .into_iter()
    .map(|(pattern, language)| (Regex::new(pattern).expect("language regex"), language))
    .collect()
});

static PACK_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:week|round) ?\d+\b").expect("pack number regex"));

static HEAD_TO_HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bvs?\b|@").expect("head to head regex"));

static PACK_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcomplete\b|\bseason pack\b|\ball events\b").expect("pack token regex")
});

/// Tokens that can trail a title after the last `-` without being a group.
const GROUP_STOPLIST: &[&str] = &[
    "dl", "web", "webdl", "rip", "webrip", "hdtv", "bluray", "remux", "x264", "x265", "hevc",
    "av1", "xvid", "1080p", "720p", "2160p", "480p",
];

fn extract_release_group(title: &str) -> Option<String> {
    let candidate = title.rsplit('-').next()?.trim();
    // Strip a container extension if the title carries one
    let candidate = candidate
        .strip_suffix(".mkv")
        .or_else(|| candidate.strip_suffix(".mp4"))
        .unwrap_or(candidate);
    if candidate.is_empty() || candidate.len() > 24 {
        return None;
    }
    if candidate.contains(char::is_whitespace) || candidate.contains('.') {
        return None;
    }
    if !title.contains('-') {
        return None;
    }
    if GROUP_STOPLIST.contains(&candidate.to_lowercase().as_str()) {
        return None;
    }
    Some(candidate.to_string())
}

/// Decode a raw release title into structured metadata.
pub fn parse_title(title: &str) -> ParsedRelease {
    let normalized = normalize_title(title);
    let mut parsed = ParsedRelease {
        title: title.to_string(),
        ..Default::default()
    };

    // Year
    if let Some(cap) = YEAR_RE.captures(&normalized) {
        parsed.year = cap[1].parse().ok();
    }

    // Full date; a valid date also supplies the year
    if let Some(cap) = DATE_RE.captures(&normalized) {
        let year: i32 = cap[1].parse().unwrap_or(0);
        let month: u32 = cap[2].parse().unwrap_or(0);
        let day: u32 = cap[3].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            parsed.date = Some(date);
            parsed.year.get_or_insert(year);
        }
    }

    // Round / week number
    if let Some(cap) = ROUND_RE.captures(&normalized) {
        parsed.round = cap[1].parse().ok();
    }

    // Sport prefix: first match in the table wins
    for (regex, canonical) in SPORT_PREFIX_TABLE.iter() {
        if regex.is_match(&normalized) {
            parsed.sport_prefix = Some((*canonical).to_string());
            break;
        }
    }

    let is_fighting = parsed
        .sport_prefix
        .as_deref()
        .map(|p| FIGHTING_PREFIXES.contains(&p))
        .unwrap_or(false);
    let is_motorsport = parsed
        .sport_prefix
        .as_deref()
        .map(|p| MOTORSPORT_PREFIXES.contains(&p))
        .unwrap_or(false);

    if is_fighting {
        if let Some(cap) = EVENT_NUMBER_RE.captures(&normalized) {
            parsed.event_number = cap[1].parse().ok();
        }
        match detect_part(&normalized) {
            PartDetection::Segment(part) => parsed.part = Some(part),
            PartDetection::FullEvent | PartDetection::Unknown => {}
        }
    }

    if is_motorsport {
        parsed.session = detect_session(&normalized);
    }

    // Quality group and source
    for (regex, resolution) in RESOLUTION_TABLE.iter() {
        if regex.is_match(&normalized) {
            parsed.resolution = *resolution;
            break;
        }
    }
    for (regex, source) in SOURCE_TABLE.iter() {
        if regex.is_match(&normalized) {
            parsed.source = *source;
            break;
        }
    }

    // Codec, language, release group
    for (regex, codec) in CODEC_TABLE.iter() {
        if regex.is_match(&normalized) {
            parsed.codec = *codec;
            break;
        }
    }
    for (regex, language) in LANGUAGE_TABLE.iter() {
        if regex.is_match(&normalized) {
            parsed.language = Some((*language).to_string());
            break;
        }
    }
    parsed.release_group = extract_release_group(title);

    // Pack detection
    let numbered = PACK_NUMBER_RE.is_match(&normalized);
    let head_to_head = HEAD_TO_HEAD_RE.is_match(&normalized);
    parsed.is_pack = (numbered && !head_to_head) || PACK_TOKEN_RE.is_match(&normalized);

    parsed
}
