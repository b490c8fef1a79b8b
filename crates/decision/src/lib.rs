//! Arenarr decision engine
//!
//! Pure decision logic: decoding release titles into structured metadata,
//! associating releases with monitored events, evaluating them against
//! quality policy, and choosing the release to grab. Nothing in this crate
//! performs I/O.

pub mod aliases;
pub mod engine;
pub mod matching;
pub mod parser;
pub mod parts;
pub mod quality;
pub mod selector;

pub use aliases::{content_tokens, search_terms, AliasTable, SearchNormalizer};
pub use engine::{evaluate_release, Evaluation, EvaluationContext};
pub use matching::{match_release, MatchOutcome, MATCH_ACCEPT_THRESHOLD};
pub use parser::{normalize_title, parse_title};
pub use parts::{detect_part, detect_session, infer_event_type, PartDetection};
pub use quality::{resolve_quality, QualityResolution};
pub use selector::{select_best_release, sort_search_results, PROTOCOL_BONUS};
