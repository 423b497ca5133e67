//! Text heuristics applied to job descriptions.
//!
//! - [`extract_keywords`]: frequency-ranked content words
//! - [`split_sentences`] / [`create_summary`]: a short lead-in built from the
//!   first sentences
//! - [`normalize_whitespace`]: collapses runs of whitespace to single spaces
//!
//! These are English-only heuristics. None of them can fail: degenerate input
//! produces an empty string.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Number of keywords kept by default.
pub const DEFAULT_KEYWORD_COUNT: usize = 5;

/// Maximum summary length in characters.
pub const DEFAULT_SUMMARY_LENGTH: usize = 200;

const ELLIPSIS: &str = "...";

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z][a-z-]{2,}\b").expect("word regex is valid"));

// NLTK English stop-word list.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
        "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his",
        "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself",
        "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
        "that", "that'll", "these", "those", "am", "is", "are", "was", "were", "be", "been",
        "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an", "the",
        "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
        "with", "about", "against", "between", "into", "through", "during", "before", "after",
        "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
        "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
        "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
        "will", "just", "don", "don't", "should", "should've", "now", "d", "ll", "m", "o", "re",
        "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn", "didn't", "doesn",
        "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't", "ma",
        "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
        "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
        "wouldn't",
    ]
    .into_iter()
    .collect()
});

// Lower-cased, without the trailing period.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "cf", "vs", "dr", "mr", "mrs", "ms", "prof", "al", "fig", "no", "approx",
];

/// Return `true` if `word` (already lower-cased) is an English stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Extract the `num_keywords` most frequent content words of `text`.
///
/// Words are lower-cased alphabetic tokens of at least three characters
/// (hyphens allowed after the first letter) that are not stop words. The
/// result is ordered by descending frequency, ties broken by first
/// occurrence, and joined with `", "`.
///
/// # Examples
///
/// ```ignore
/// let kw = extract_keywords("Graph learning. Graph models for learning graphs.", 2);
/// assert_eq!(kw, "graph, learning");
/// ```
pub fn extract_keywords(text: &str, num_keywords: usize) -> String {
    let lowered = text.to_lowercase();

    // word -> (count, first position)
    let mut freq: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, m) in WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !is_stop_word(w))
        .enumerate()
    {
        freq.entry(m).or_insert((0, position)).0 += 1;
    }

    freq.into_iter()
        .sorted_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_b.cmp(count_a).then(first_a.cmp(first_b))
        })
        .take(num_keywords)
        .map(|(word, _)| word)
        .join(", ")
}

/// Byte offsets just past each sentence, the last one being `text.len()`
/// when the text does not end on a terminator.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or brackets)
/// followed by whitespace or the end of the text, unless the word before the
/// period is a common abbreviation.
fn sentence_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if matches!(next, '"' | '\'' | ')' | ']' | '’' | '”' | '.' | '!' | '?') {
                end = i + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
        if at_boundary && !(c == '.' && ends_with_abbreviation(&text[..idx])) {
            ends.push(end);
        }
    }

    let tail_start = ends.last().copied().unwrap_or(0);
    if !text[tail_start..].trim().is_empty() {
        ends.push(text.len());
    }
    ends
}

fn ends_with_abbreviation(before_period: &str) -> bool {
    let word = before_period
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}

/// Split `text` into trimmed sentences.
///
/// Text after the last terminator forms a final sentence of its own.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_ends(text)
        .into_iter()
        .scan(0usize, |start, end| {
            let sentence = text[*start..end].trim();
            *start = end;
            Some(sentence)
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build a short summary from the first two sentences of `text`.
///
/// Sentences keep their inner whitespace as written; only the gap between
/// the two is collapsed to a single space. When the result exceeds
/// `max_length` characters it is cut to `max_length - 3` characters followed
/// by `...`, so the result never exceeds `max_length` characters.
pub fn create_summary(text: &str, max_length: usize) -> String {
    let lead = split_sentences(text.trim()).into_iter().take(2).join(" ");
    truncate_chars(&lead, max_length)
}

/// Truncate to at most `max_length` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&ELLIPSIS[..ELLIPSIS.len().min(max_length)]);
    out
}
