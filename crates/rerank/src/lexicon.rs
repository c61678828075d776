use std::collections::{HashMap, HashSet};

use crate::text::stem;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "am", "of", "to",
    "in", "on", "at", "for", "by", "with", "and", "or", "but", "this", "that", "these",
    "those", "it", "its", "as", "from", "has", "have", "had", "do", "does", "did", "will",
    "would", "should", "could", "can", "may", "might", "shall", "must", "there", "their",
    "they", "them", "he", "she", "his", "her", "we", "our", "you", "your", "i", "so",
    "than", "then", "into", "about", "also", "very", "just", "which", "who", "whom",
    "what", "all", "any", "some", "such", "each", "other", "only", "own", "same", "too",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "neither", "nor", "without", "cannot", "nobody", "nothing",
    "nowhere",
];

/// Auxiliaries and copulas, mapped onto the verb they stand for.
const AUXILIARIES: &[(&str, &str)] = &[
    ("is", "be"),
    ("are", "be"),
    ("was", "be"),
    ("were", "be"),
    ("be", "be"),
    ("been", "be"),
    ("being", "be"),
    ("am", "be"),
    ("has", "have"),
    ("have", "have"),
    ("had", "have"),
    ("do", "do"),
    ("does", "do"),
    ("did", "do"),
    ("will", "will"),
    ("would", "will"),
    ("can", "can"),
    ("could", "can"),
    ("should", "should"),
    ("may", "may"),
    ("might", "may"),
    ("must", "must"),
    ("shall", "will"),
];

/// Synonym groups; every member folds onto the first entry. Irregular verb forms are
/// listed explicitly since the stemmer only strips regular suffixes.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &[
        "increase", "rise", "rose", "risen", "grow", "grew", "grown", "climb", "gain", "surge",
        "jump", "expand",
    ],
    &[
        "decrease", "decline", "fall", "fell", "fallen", "drop", "shrink", "shrank", "shrunk",
        "reduce", "plunge", "slump",
    ],
    &["company", "firm", "business", "corporation", "enterprise"],
    &["profit", "earnings", "income"],
    &["show", "shown", "demonstrate", "indicate", "reveal", "prove", "proven"],
    &["cause", "trigger", "produce"],
    &["say", "said", "state", "claim", "announce", "report", "assert"],
    &["buy", "bought", "purchase", "acquire"],
    &["begin", "began", "begun", "start", "launch", "commence"],
    &["end", "finish", "stop", "conclude", "halt"],
    &["large", "big", "huge", "major", "substantial"],
    &["small", "little", "minor", "tiny", "slight"],
    &["fast", "rapid", "quick", "swift"],
    &["doctor", "physician"],
    &["car", "automobile", "vehicle"],
    &["people", "persons", "individuals"],
    &["study", "research", "trial", "experiment"],
];

const ANTONYMS: &[(&str, &str)] = &[
    ("increase", "decrease"),
    ("profitable", "unprofitable"),
    ("profit", "loss"),
    ("true", "false"),
    ("high", "low"),
    ("higher", "lower"),
    ("more", "less"),
    ("win", "lose"),
    ("success", "failure"),
    ("safe", "dangerous"),
    ("support", "oppose"),
    ("accept", "reject"),
    ("approve", "reject"),
    ("above", "below"),
    ("positive", "negative"),
    ("effective", "ineffective"),
    ("legal", "illegal"),
    ("possible", "impossible"),
    ("alive", "dead"),
    ("strong", "weak"),
    ("majority", "minority"),
];

/// Main verbs recognised when splitting a sentence into subject and object.
const VERBS: &[&str] = &[
    "increase", "decrease", "show", "cause", "say", "buy", "begin", "end", "make", "reach",
    "win", "lose", "support", "oppose", "accept", "reject", "approve", "contain", "include",
    "require", "remain", "become", "exceed", "beat", "miss", "sell", "hire", "cut", "raise",
    "lower", "affect", "improve", "reduce", "prevent", "confirm", "deny", "own", "employ",
    "earn", "pay", "post", "record",
];

const PAST_TENSE_MIN_CHARS: usize = 5;

/// Fixed word tables backing the heuristic scorer: stopwords, negation cues, synonym
/// folding, antonym pairs and the verbs used for role splitting.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<&'static str>,
    negations: HashSet<&'static str>,
    auxiliaries: HashMap<&'static str, &'static str>,
    /// Stemmed synonym -> stemmed canonical term.
    synonyms: HashMap<String, String>,
    antonyms: HashSet<(String, String)>,
    verbs: HashSet<String>,
}

impl Lexicon {
    pub fn new() -> Self {
        let mut synonyms = HashMap::new();
        for group in SYNONYM_GROUPS {
            let Some(canonical) = group.first() else {
                continue;
            };
            let canonical = stem(canonical);
            for member in group.iter() {
                synonyms.insert(stem(member), canonical.clone());
            }
        }

        let mut lexicon = Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            negations: NEGATIONS.iter().copied().collect(),
            auxiliaries: AUXILIARIES.iter().copied().collect(),
            synonyms,
            antonyms: HashSet::new(),
            verbs: HashSet::new(),
        };

        let mut antonyms = HashSet::with_capacity(ANTONYMS.len() * 2);
        for (left, right) in ANTONYMS {
            let left = lexicon.term(left);
            let right = lexicon.term(right);
            antonyms.insert((left.clone(), right.clone()));
            antonyms.insert((right, left));
        }
        let verbs = VERBS.iter().map(|verb| lexicon.term(verb)).collect();

        lexicon.antonyms = antonyms;
        lexicon.verbs = verbs;
        lexicon
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word) || word.ends_with("n't") || word.ends_with("n’t")
    }

    pub fn is_auxiliary(&self, word: &str) -> bool {
        self.auxiliaries.contains_key(word)
    }

    /// Canonical form of a lowercased word: stemmed, then folded through the synonym table.
    pub fn term(&self, word: &str) -> String {
        let stemmed = stem(word);
        match self.synonyms.get(&stemmed) {
            Some(canonical) => canonical.clone(),
            None => stemmed,
        }
    }

    /// Both arguments are canonical terms, as returned by [`Lexicon::term`].
    pub fn are_antonyms(&self, left: &str, right: &str) -> bool {
        self.antonyms.contains(&(left.to_string(), right.to_string()))
    }

    /// Canonical verb for a lowercased word, if the word reads as one.
    pub fn verb(&self, word: &str) -> Option<String> {
        if let Some(canonical) = self.auxiliaries.get(word) {
            return Some((*canonical).to_string());
        }
        if self.is_stopword(word) || self.is_negation(word) {
            return None;
        }
        let term = self.term(word);
        if self.verbs.contains(&term) {
            return Some(term);
        }
        let looks_past_tense =
            word.ends_with("ed") && word.chars().count() >= PAST_TENSE_MIN_CHARS;
        looks_past_tense.then_some(term)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn synonyms_fold_to_one_term() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.term("rises"), lexicon.term("increased"));
        assert_eq!(lexicon.term("firm"), lexicon.term("companies"));
        assert_eq!(lexicon.term("purchased"), lexicon.term("buy"));
    }

    #[test]
    fn irregular_past_tenses_fold_with_their_verb() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.term("grew"), lexicon.term("increased"));
        assert_eq!(lexicon.term("rose"), lexicon.term("rises"));
        assert_eq!(lexicon.term("fell"), lexicon.term("declined"));
        assert_eq!(lexicon.term("bought"), lexicon.term("acquired"));
        assert_eq!(lexicon.term("began"), lexicon.term("started"));
    }

    #[test]
    fn antonyms_are_symmetric() {
        let lexicon = Lexicon::new();
        let up = lexicon.term("increase");
        let down = lexicon.term("declined");
        assert!(lexicon.are_antonyms(&up, &down));
        assert!(lexicon.are_antonyms(&down, &up));
        assert!(!lexicon.are_antonyms(&up, &up));

        let good = lexicon.term("profitable");
        let bad = lexicon.term("unprofitable");
        assert!(lexicon.are_antonyms(&good, &bad));
    }

    #[test]
    fn negation_cues_include_contractions() {
        let lexicon = Lexicon::new();
        assert!(lexicon.is_negation("not"));
        assert!(lexicon.is_negation("isn't"));
        assert!(lexicon.is_negation("doesn’t"));
        assert!(!lexicon.is_negation("note"));
    }

    #[test]
    fn verbs_cover_auxiliaries_known_verbs_and_past_tense() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.verb("was").as_deref(), Some("be"));
        assert_eq!(lexicon.verb("had").as_deref(), Some("have"));
        assert_eq!(lexicon.verb("grew"), Some(lexicon.term("increase")));
        assert_eq!(lexicon.verb("said"), Some(lexicon.term("say")));
        assert_eq!(lexicon.verb("grows"), Some(lexicon.term("increase")));
        assert_eq!(lexicon.verb("announced"), Some(lexicon.term("say")));
        assert!(lexicon.verb("reported").is_some());
        assert_eq!(lexicon.verb("red"), None);
        assert_eq!(lexicon.verb("the"), None);
    }
}
