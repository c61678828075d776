use unicode_segmentation::UnicodeSegmentation;

const MIN_STEM_CHARS: usize = 3;

// Longest first; the first suffix leaving a long enough stem wins.
const SUFFIXES: &[&str] = &[
    "ization", "ational", "ments", "ment", "ings", "ing", "ies", "ied", "edly", "ed", "ly",
    "es", "s",
];

/// Lowercased Unicode words. Punctuation and whitespace are dropped; contractions
/// such as "isn't" stay a single word.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// Naive suffix stripping. Short words are returned unchanged.
pub(crate) fn stem(word: &str) -> String {
    if word.chars().count() <= MIN_STEM_CHARS {
        return word.to_string();
    }

    let mut stemmed = word.to_string();
    for suffix in SUFFIXES {
        if *suffix == "s" && word.ends_with("ss") {
            continue;
        }
        let Some(base) = word.strip_suffix(suffix) else {
            continue;
        };
        if base.chars().count() < MIN_STEM_CHARS {
            continue;
        }
        stemmed = match *suffix {
            "ies" | "ied" => format!("{base}y"),
            _ => base.to_string(),
        };
        break;
    }

    // "increase" / "increased" / "increases" all land on "increas".
    if stemmed.chars().count() > MIN_STEM_CHARS && stemmed.ends_with('e') {
        stemmed.pop();
    }
    stemmed
}
