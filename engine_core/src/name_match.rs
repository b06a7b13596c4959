//! Name Normalizer & Fuzzy Matcher (C3).
//!
//! Binds vendor/venue team strings to a canonical key. The matching order is
//! deliberate: exact -> alias-normalized -> word-containment. A general
//! string-distance library is not a substitute for this explicit algorithm.

use std::collections::HashMap;

/// Generic organizational tokens stripped from every team name before
/// alias lookup, across all three sports.
const GENERIC_TOKENS: &[&str] = &[
    "fc", "sc", "cf", "afc", "fk", "bk", "if", "sk", "cd", "ad", "ud", "sv", "ca", "rc",
];

/// City/region words shared by more than one real club (same-city rivals),
/// excluded from the word-containment fallback in `fuzzy_team_match` so
/// "Manchester United" doesn't fuzzy-match "Manchester City" on the word
/// "manchester" alone.
const AMBIGUOUS_LOCATION_TOKENS: &[&str] = &[
    "manchester", "milan", "madrid", "london", "liverpool", "rome", "munich", "turin", "glasgow", "birmingham",
];

/// Sport-specific alias table: normalized-form -> canonical key.
/// e.g. hockey's AHL affiliate shorthand `ont reign` -> `ontario reign`.
pub type AliasTable = HashMap<&'static str, &'static str>;

pub fn hockey_aliases() -> AliasTable {
    let mut m = AliasTable::new();
    m.insert("ont reign", "ontario reign");
    m.insert("nj devils", "new jersey devils");
    m.insert("la kings", "los angeles kings");
    m.insert("tb lightning", "tampa bay lightning");
    m.insert("sj sharks", "san jose sharks");
    m
}

pub fn soccer_aliases() -> AliasTable {
    let mut m = AliasTable::new();
    m.insert("man utd", "manchester united");
    m.insert("man united", "manchester united");
    m.insert("man city", "manchester city");
    m.insert("spurs", "tottenham hotspur");
    m.insert("wolves", "wolverhampton wanderers");
    m
}

pub fn football_aliases() -> AliasTable {
    AliasTable::new()
}

fn strip_accents(c: char) -> char {
    // Cheap ASCII-folding for the common Latin diacritics seen in team names;
    // not a full Unicode normalization.
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Lowercase, strip accents/punctuation, remove generic organizational
/// tokens, collapse whitespace, then apply the sport's alias table.
pub fn normalize(name: &str, aliases: &AliasTable) -> String {
    let folded: String = name
        .chars()
        .map(|c| strip_accents(c.to_ascii_lowercase()))
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let tokens: Vec<&str> = folded
        .split_whitespace()
        .filter(|tok| !GENERIC_TOKENS.contains(tok))
        .collect();

    let collapsed = tokens.join(" ");

    if let Some(canon) = aliases.get(collapsed.as_str()) {
        canon.to_string()
    } else {
        collapsed
    }
}

/// True if either string contains the other as a substring (exact match included).
pub fn fuzzy_contains(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    a.contains(b) || b.contains(a)
}

/// Words of length >= 4 that aren't a shared city/region name — the part of
/// a club name that actually distinguishes it from a same-city rival.
fn distinctive_words(s: &str) -> impl Iterator<Item = &str> {
    s.split_whitespace()
        .filter(|w| w.len() >= 4 && !AMBIGUOUS_LOCATION_TOKENS.contains(w))
}

/// Stronger containment: exact, substring containment either direction, or
/// a distinctive word (length >= 4, not a bare city/region name) from one
/// string appearing as a substring of the other. Excluding ambiguous
/// location tokens keeps same-city rivals ("Manchester United" vs.
/// "Manchester City", "AC Milan" vs. "Inter Milan") from matching on the
/// city name alone.
pub fn fuzzy_team_match(a: &str, b: &str) -> bool {
    if fuzzy_contains(a, b) {
        return true;
    }
    distinctive_words(a).any(|w| b.contains(w)) || distinctive_words(b).any(|w| a.contains(w))
}

/// Orientation of a successful pair match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    SameOrder,
    Swapped,
}

/// `match_pair((h1,a1), (h2,a2))`: true (with orientation) if either
/// same-order or swapped fuzzy matches hold on both sides.
pub fn match_pair(
    pair_a: (&str, &str),
    pair_b: (&str, &str),
) -> Option<Orientation> {
    let (h1, a1) = pair_a;
    let (h2, a2) = pair_b;

    if fuzzy_team_match(h1, h2) && fuzzy_team_match(a1, a2) {
        return Some(Orientation::SameOrder);
    }
    if fuzzy_team_match(h1, a2) && fuzzy_team_match(a1, h2) {
        return Some(Orientation::Swapped);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_generic_tokens_and_punctuation() {
        let aliases = soccer_aliases();
        assert_eq!(normalize("Arsenal FC", &aliases), "arsenal");
        assert_eq!(normalize("AFC Bournemouth", &aliases), "bournemouth");
    }

    #[test]
    fn normalize_applies_alias_table() {
        let aliases = hockey_aliases();
        assert_eq!(normalize("Ont Reign", &aliases), "ontario reign");
    }

    #[test]
    fn fuzzy_contains_either_direction() {
        assert!(fuzzy_contains("chelsea", "chelsea fc reserves"));
        assert!(fuzzy_contains("chelsea fc reserves", "chelsea"));
        assert!(!fuzzy_contains("chelsea", "arsenal"));
    }

    #[test]
    fn fuzzy_team_match_word_containment() {
        assert!(fuzzy_team_match("manchester united", "man united fc"));
        assert!(!fuzzy_team_match("manchester united", "manchester city"));
    }

    #[test]
    fn fuzzy_team_match_rejects_same_city_rivals() {
        assert!(!fuzzy_team_match("manchester united", "manchester city"));
        assert!(!fuzzy_team_match("ac milan", "inter milan"));
        assert!(!fuzzy_team_match("real madrid", "atletico madrid"));
    }

    #[test]
    fn match_pair_detects_swapped_orientation() {
        let orientation = match_pair(("arsenal", "chelsea"), ("chelsea", "arsenal"));
        assert_eq!(orientation, Some(Orientation::Swapped));
    }

    #[test]
    fn match_pair_detects_same_order() {
        let orientation = match_pair(("arsenal", "chelsea"), ("arsenal", "chelsea"));
        assert_eq!(orientation, Some(Orientation::SameOrder));
    }

    #[test]
    fn match_pair_none_when_neither_orientation_fits() {
        assert_eq!(match_pair(("arsenal", "chelsea"), ("liverpool", "everton")), None);
    }
}
