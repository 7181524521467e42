//! General-purpose English lexicon scorer.

/// Word valences on a `[-4, 4]` scale.
///
/// Keys are lowercase single words. The summed valence of a text is squashed
/// into `(-1, 1)` so that a handful of strong words saturates toward the ends.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 3.2),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("fantastic", 2.6),
    ("wonderful", 2.7),
    ("love", 3.2),
    ("loved", 2.9),
    ("lovely", 2.8),
    ("like", 1.5),
    ("happy", 2.7),
    ("glad", 2.0),
    ("best", 3.2),
    ("better", 1.9),
    ("beautiful", 2.9),
    ("nice", 1.8),
    ("fun", 2.3),
    ("enjoy", 2.2),
    ("enjoyed", 2.3),
    ("win", 2.8),
    ("won", 2.7),
    ("success", 2.7),
    ("proud", 2.1),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("safe", 1.9),
    ("support", 1.7),
    ("recommend", 1.5),
    ("helpful", 1.8),
    ("hope", 1.9),
    ("free", 1.5),
    ("fair", 1.3),
    ("improve", 1.9),
    ("improved", 2.1),
    ("delicious", 2.7),
    ("brilliant", 2.8),
    ("perfect", 2.7),
    // Negative
    ("bad", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("horrible", -2.5),
    ("hate", -2.7),
    ("hated", -3.2),
    ("sad", -2.1),
    ("angry", -2.3),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("problem", -1.7),
    ("problems", -1.7),
    ("crisis", -3.1),
    ("dangerous", -2.1),
    ("danger", -2.4),
    ("unsafe", -2.2),
    ("expensive", -1.1),
    ("broken", -2.2),
    ("delay", -1.3),
    ("delays", -1.3),
    ("cancelled", -1.0),
    ("poor", -2.1),
    ("wrong", -2.1),
    ("scam", -2.8),
    ("corrupt", -3.0),
    ("disaster", -3.1),
    ("killed", -3.5),
    ("dead", -3.3),
    ("death", -2.9),
    ("worried", -1.2),
    ("fear", -2.2),
    ("annoying", -1.7),
    ("stupid", -2.4),
    ("useless", -1.8),
];

/// Words that flip the valence of the next scored word.
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "without", "isn't", "aren't", "wasn't", "weren't",
    "don't", "doesn't", "didn't", "can't", "cannot", "won't", "wouldn't", "shouldn't",
];

/// Words that amplify the valence of the next scored word.
const BOOSTERS: &[&str] = &[
    "very", "really", "extremely", "so", "incredibly", "absolutely", "totally", "super",
];

const NEGATION_FACTOR: f64 = -0.74;
const BOOSTER_FACTOR: f64 = 1.3;
/// Squashing constant: `sum / sqrt(sum^2 + ALPHA)`.
const ALPHA: f64 = 15.0;

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words with surrounding punctuation removed,
/// sums the valence of lexicon words (a preceding negation flips and damps
/// it, a preceding booster amplifies it), then squashes the sum into
/// `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut sum = 0.0_f64;
    let mut modifier = 1.0_f64;

    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic() && c != '\'')
            .to_lowercase()
            .replace('\u{2019}', "'");

        if NEGATIONS.contains(&w.as_str()) {
            modifier *= NEGATION_FACTOR;
            continue;
        }
        if BOOSTERS.contains(&w.as_str()) {
            modifier *= BOOSTER_FACTOR;
            continue;
        }

        if let Some(&(_, valence)) = LEXICON.iter().find(|(lex, _)| *lex == w) {
            sum += valence * modifier;
        }
        modifier = 1.0;
    }

    if sum.abs() < f64::EPSILON {
        return 0.0;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}
