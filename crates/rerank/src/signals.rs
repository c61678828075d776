use std::collections::{BTreeSet, HashSet};

use crate::lexicon::Lexicon;
use crate::patterns::{detect_patterns, extract_entities, SyntacticPattern};
use crate::text::words;

/// Score returned when a signal has nothing to compare.
pub(crate) const NEUTRAL: f32 = 0.5;

/// Everything the scorer needs to know about one side of a (claim, evidence) pair.
#[derive(Debug, Clone)]
pub(crate) struct Analysis {
    terms: HashSet<String>,
    negated: bool,
    patterns: BTreeSet<SyntacticPattern>,
    entities: HashSet<String>,
    roles: Option<Roles>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Roles {
    subject: HashSet<String>,
    verb: String,
    object: HashSet<String>,
}

impl Analysis {
    pub(crate) fn new(text: &str, lexicon: &Lexicon) -> Self {
        let words = words(text);
        Self {
            terms: content_terms(&words, lexicon),
            negated: words.iter().any(|word| lexicon.is_negation(word)),
            patterns: detect_patterns(text),
            entities: extract_entities(text, lexicon),
            roles: extract_roles(&words, lexicon),
        }
    }
}

fn is_content_word(word: &str, lexicon: &Lexicon) -> bool {
    !lexicon.is_stopword(word)
        && !lexicon.is_negation(word)
        && word.chars().any(char::is_alphanumeric)
}

fn content_terms(words: &[String], lexicon: &Lexicon) -> HashSet<String> {
    words
        .iter()
        .filter(|word| is_content_word(word, lexicon))
        .map(|word| lexicon.term(word))
        .collect()
}

fn extract_roles(words: &[String], lexicon: &Lexicon) -> Option<Roles> {
    let (mut verb_at, mut verb) = words
        .iter()
        .enumerate()
        .find_map(|(idx, word)| lexicon.verb(word).map(|verb| (idx, verb)))?;

    // "has increased", "was not approved": prefer the main verb behind the auxiliary.
    if lexicon.is_auxiliary(&words[verb_at]) {
        let main = words
            .iter()
            .enumerate()
            .skip(verb_at + 1)
            .find(|(_, word)| !lexicon.is_negation(word) && !lexicon.is_auxiliary(word));
        if let Some((idx, word)) = main {
            if let Some(main_verb) = lexicon.verb(word) {
                verb_at = idx;
                verb = main_verb;
            }
        }
    }

    Some(Roles {
        subject: content_terms(&words[..verb_at], lexicon),
        verb,
        object: content_terms(&words[verb_at + 1..], lexicon),
    })
}

fn dice(left: &HashSet<String>, right: &HashSet<String>) -> f32 {
    let total = left.len() + right.len();
    if total == 0 {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    (2 * shared) as f32 / total as f32
}

/// Dice coefficient over canonical content terms.
pub(crate) fn token_overlap(claim: &Analysis, evidence: &Analysis) -> f32 {
    dice(&claim.terms, &evidence.terms)
}

/// Jaccard index over detected sentence constructions.
pub(crate) fn syntactic_compatibility(claim: &Analysis, evidence: &Analysis) -> f32 {
    let union = claim.patterns.union(&evidence.patterns).count();
    if union == 0 {
        return NEUTRAL;
    }
    let shared = claim.patterns.intersection(&evidence.patterns).count();
    shared as f32 / union as f32
}

/// Fraction of the claim's entities that also appear in the evidence.
pub(crate) fn entity_overlap(claim: &Analysis, evidence: &Analysis) -> f32 {
    if claim.entities.is_empty() {
        return NEUTRAL;
    }
    let matched = claim
        .entities
        .iter()
        .filter(|entity| evidence.entities.contains(*entity))
        .count();
    matched as f32 / claim.entities.len() as f32
}

pub(crate) fn role_alignment(claim: &Analysis, evidence: &Analysis) -> f32 {
    let (Some(claim), Some(evidence)) = (claim.roles.as_ref(), evidence.roles.as_ref()) else {
        return NEUTRAL;
    };

    let mut parts = Vec::with_capacity(3);
    if !(claim.subject.is_empty() && evidence.subject.is_empty()) {
        parts.push(dice(&claim.subject, &evidence.subject));
    }
    parts.push(if claim.verb == evidence.verb { 1.0 } else { 0.0 });
    if !(claim.object.is_empty() && evidence.object.is_empty()) {
        parts.push(dice(&claim.object, &evidence.object));
    }

    parts.iter().sum::<f32>() / parts.len() as f32
}

/// Opposite polarity over shared content, or an antonym pair across the texts.
pub(crate) fn has_contradiction(claim: &Analysis, evidence: &Analysis, lexicon: &Lexicon) -> bool {
    let shares_term = claim.terms.intersection(&evidence.terms).next().is_some();
    if claim.negated != evidence.negated && shares_term {
        return true;
    }
    claim.terms.iter().any(|left| {
        evidence
            .terms
            .iter()
            .any(|right| lexicon.are_antonyms(left, right))
    })
}
