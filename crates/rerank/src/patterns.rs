use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::lexicon::Lexicon;

/// Sentence-level constructions whose presence should agree between claim and evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum SyntacticPattern {
    Negation,
    Comparison,
    Causal,
    Temporal,
    Quantitative,
    Conditional,
    Hedge,
    Passive,
}

const PATTERN_SOURCES: &[(SyntacticPattern, &str)] = &[
    (
        SyntacticPattern::Negation,
        r"(?i)\b(not|no|never|none|neither|nor|without|cannot)\b|n['’]t\b",
    ),
    (
        SyntacticPattern::Comparison,
        r"(?i)\b(more|less|fewer|greater|higher|lower|better|worse|compared|versus|vs)\b|\b\w+er\s+than\b",
    ),
    (
        SyntacticPattern::Causal,
        r"(?i)\b(because|due\s+to|caus(e|es|ed|ing)|leads?\s+to|led\s+to|result(s|ed)?\s+in|therefore|thus|hence)\b",
    ),
    (
        SyntacticPattern::Temporal,
        r"(?i)\b(before|after|during|since|until|while|yesterday|today|tomorrow|quarter|year|month|week|annual(ly)?|(19|20)\d{2})\b",
    ),
    (
        SyntacticPattern::Quantitative,
        r"(?i)\d|%|\b(percent|million|billion|thousand|half|twice|double|triple)\b",
    ),
    (
        SyntacticPattern::Conditional,
        r"(?i)\b(if|unless|provided|whether|otherwise)\b",
    ),
    (
        SyntacticPattern::Hedge,
        r"(?i)\b(may|might|could|possibly|likely|probably|perhaps|suggests?|appears?)\b",
    ),
    (
        SyntacticPattern::Passive,
        r"(?i)\b(is|are|was|were|been|being)\s+\w+ed\b",
    ),
];

const ENTITY_SOURCE: &str = r"\b\p{Lu}[\p{L}\p{N}&'’-]*|\b\d+(?:[.,]\d+)*%?";

fn compiled_patterns() -> &'static [(SyntacticPattern, Regex)] {
    static PATTERNS: OnceLock<Vec<(SyntacticPattern, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PATTERN_SOURCES
            .iter()
            .filter_map(|(kind, source)| match Regex::new(source) {
                Ok(regex) => Some((*kind, regex)),
                Err(err) => {
                    log::error!("Syntactic pattern {kind:?} failed to compile: {err}");
                    None
                }
            })
            .collect()
    })
}

fn entity_regex() -> Option<&'static Regex> {
    static ENTITY: OnceLock<Option<Regex>> = OnceLock::new();
    ENTITY
        .get_or_init(|| match Regex::new(ENTITY_SOURCE) {
            Ok(regex) => Some(regex),
            Err(err) => {
                log::error!("Entity pattern failed to compile: {err}");
                None
            }
        })
        .as_ref()
}

pub(crate) fn detect_patterns(text: &str) -> BTreeSet<SyntacticPattern> {
    compiled_patterns()
        .iter()
        .filter(|(_, regex)| regex.is_match(text))
        .map(|(kind, _)| *kind)
        .collect()
}

/// Capitalised non-stopword words and numbers, normalised to lowercase.
pub(crate) fn extract_entities(text: &str, lexicon: &Lexicon) -> HashSet<String> {
    let Some(regex) = entity_regex() else {
        return HashSet::new();
    };

    regex
        .find_iter(text)
        .filter_map(|found| normalize_entity(found.as_str(), lexicon))
        .collect()
}

fn normalize_entity(raw: &str, lexicon: &Lexicon) -> Option<String> {
    let lowered = raw.to_lowercase();
    let trimmed = lowered
        .strip_suffix("'s")
        .or_else(|| lowered.strip_suffix("’s"))
        .unwrap_or(lowered.as_str())
        .trim_end_matches(['\'', '’', '-', '.', ',']);
    if trimmed.is_empty() || lexicon.is_stopword(trimmed) {
        return None;
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(trimmed.replace(',', ""));
    }
    Some(trimmed.to_string())
}
