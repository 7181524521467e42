//! Single-word keyword extraction.

use std::collections::HashMap;

/// Keywords kept per envelope.
pub const MAX_KEYWORDS: usize = 5;

const MIN_WORD_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "aren't",
    "because", "been", "before", "being", "below", "between", "both", "but", "can", "can't",
    "could", "couldn't", "did", "didn't", "does", "doesn't", "doing", "don't", "down", "during",
    "each", "even", "few", "for", "from", "further", "get", "got", "had", "hadn't", "has",
    "hasn't", "have", "haven't", "having", "her", "here", "hers", "herself", "him", "himself",
    "his", "how", "i'm", "i've", "into", "isn't", "it's", "its", "itself", "just", "let's",
    "like", "more", "most", "much", "must", "myself", "nor", "not", "now", "off", "once", "one",
    "only", "other", "our", "ours", "ourselves", "out", "over", "own", "really", "same", "she",
    "should", "shouldn't", "some", "still", "such", "than", "that", "that's", "the", "their",
    "theirs", "them", "themselves", "then", "there", "there's", "these", "they", "they're",
    "this", "those", "through", "too", "under", "until", "very", "was", "wasn't", "way", "we're",
    "were", "weren't", "what", "what's", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "won't", "would", "wouldn't", "yet", "you", "you're", "your", "yours",
    "yourself", "yourselves", "http", "https", "www", "com",
];

/// Top `limit` lowercase keywords of `text`, most frequent first.
///
/// Words are split on anything that is not alphanumeric or an apostrophe.
/// Stopwords, purely numeric tokens, and words shorter than three characters
/// are skipped. Ties keep first-occurrence order.
#[must_use]
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    let words = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '\u{2019}').to_lowercase())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()));

    for (position, word) in words.enumerate() {
        counts
            .entry(word)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(limit).map(|(word, _, _)| word).collect()
}
