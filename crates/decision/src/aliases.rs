//! Search normalisation and alias expansion
//!
//! The match engine compares release tokens against event metadata through a
//! `SearchNormalizer`: tokens are lowercased and diacritic-stripped, then
//! expanded with geographic and league synonyms so `Abu Dhabi` can meet
//! `AbuDhabi` or `YasMarina` half way.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Tokens carrying no matching signal
pub const STOPWORDS: &[&str] = &[
    "the", "of", "at", "and", "a", "an", "in", "on", "vs", "v", "fc", "afc", "cf", "club",
];

/// Supplies token normalisation and alias expansion to the match engine.
pub trait SearchNormalizer: Send + Sync {
    /// Lowercase and strip diacritics.
    fn normalize(&self, token: &str) -> String;

    /// All alias variants of a token, including the normalised token itself.
    fn expand(&self, token: &str) -> Vec<String>;
}

/// Strip the common Latin diacritics seen in venue and driver names.
fn strip_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            'ß' => 's',
            other => other,
        })
        .collect()
}

/// Geographic and league synonym table. Keys and values are normalised
/// single-token or joined-token forms.
static ALIASES: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let entries: Vec<(&str, Vec<&str>)> = vec![
        // Motorsport venues and national names
        ("abu dhabi", vec!["abudhabi", "yas marina", "yasmarina"]),
        ("yas marina", vec!["abu dhabi", "abudhabi"]),
        ("monaco", vec!["monte carlo", "montecarlo"]),
        ("sao paulo", vec!["interlagos", "brazil", "brazilian"]),
        ("mexico city", vec!["mexico", "mexican"]),
        ("silverstone", vec!["british", "britain"]),
        ("monza", vec!["italian", "italy"]),
        ("spa", vec!["belgian", "belgium", "spa francorchamps"]),
        ("austin", vec!["cota", "united states", "usa"]),
        ("qatar", vec!["losail", "lusail"]),
        ("suzuka", vec!["japanese", "japan"]),
        ("jeddah", vec!["saudi arabian", "saudi arabia"]),
        ("las vegas", vec!["vegas"]),
        ("melbourne", vec!["australian", "australia", "albert park"]),
        ("bahrain", vec!["sakhir"]),
        ("zandvoort", vec!["dutch", "netherlands"]),
        ("singapore", vec!["marina bay"]),
        ("baku", vec!["azerbaijan"]),
        ("imola", vec!["emilia romagna", "san marino"]),
        ("barcelona", vec!["spanish", "spain", "catalunya"]),
        ("montreal", vec!["canadian", "canada", "gilles villeneuve"]),
        ("budapest", vec!["hungarian", "hungary", "hungaroring"]),
        ("spielberg", vec!["austrian", "austria", "red bull ring"]),
        // Phrase forms
        ("grand prix", vec!["gp"]),
        ("gp", vec!["grand prix"]),
    ];
    entries.into_iter().collect()
});

/// Default `SearchNormalizer` backed by the static alias table.
#[derive(Debug, Default, Clone)]
pub struct AliasTable;

impl AliasTable {
    pub fn new() -> Self {
        Self
    }
}

impl SearchNormalizer for AliasTable {
    fn normalize(&self, token: &str) -> String {
        strip_diacritics(&token.to_lowercase()).trim().to_string()
    }

    fn expand(&self, token: &str) -> Vec<String> {
        let normalized = self.normalize(token);
        let mut variants: Vec<String> = vec![normalized.clone()];
        // A joined form without spaces helps against AbuDhabi-style tokens
        if normalized.contains(' ') {
            variants.push(normalized.replace(' ', ""));
        }
        if let Some(aliases) = ALIASES.get(normalized.as_str()) {
            for alias in aliases {
                variants.push((*alias).to_string());
                if alias.contains(' ') {
                    variants.push(alias.replace(' ', ""));
                }
            }
        }
        variants.dedup();
        variants
    }
}

/// Alias-expanded token set persisted with a cache entry so broad queries
/// can meet the release half way.
pub fn search_terms(
    normalized_title: &str,
    sport_prefix: Option<&str>,
    normalizer: &dyn SearchNormalizer,
) -> Vec<String> {
    let mut terms: HashSet<String> = HashSet::new();
    for token in content_tokens(normalized_title) {
        for variant in normalizer.expand(&token) {
            terms.insert(variant);
        }
    }
    if let Some(prefix) = sport_prefix {
        terms.insert(normalizer.normalize(prefix));
    }
    let mut terms: Vec<String> = terms.into_iter().collect();
    terms.sort();
    terms
}

/// Split a normalised string into content tokens, dropping stopwords.
pub fn content_tokens(normalized: &str) -> HashSet<String> {
    normalized
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diacritics_are_stripped() {
        let table = AliasTable::new();
        assert_eq!(table.normalize("São Paulo"), "sao paulo");
        assert_eq!(table.normalize("México"), "mexico");
        assert_eq!(table.normalize("Nürburgring"), "nurburgring");
    }

    #[test]
    fn abu_dhabi_expands_to_yas_marina_and_joined_form() {
        let table = AliasTable::new();
        let variants = table.expand("Abu Dhabi");
        assert!(variants.contains(&"abu dhabi".to_string()));
        assert!(variants.contains(&"abudhabi".to_string()));
        assert!(variants.contains(&"yasmarina".to_string()));
    }

    #[test]
    fn grand_prix_and_gp_are_interchangeable() {
        let table = AliasTable::new();
        assert!(table.expand("Grand Prix").contains(&"gp".to_string()));
        assert!(table.expand("GP").contains(&"grand prix".to_string()));
    }

    #[test]
    fn content_tokens_drop_stopwords() {
        let tokens = content_tokens("arsenal vs chelsea at the bridge");
        assert!(tokens.contains("arsenal"));
        assert!(tokens.contains("chelsea"));
        assert!(tokens.contains("bridge"));
        assert!(!tokens.contains("vs"));
        assert!(!tokens.contains("the"));
    }
}
