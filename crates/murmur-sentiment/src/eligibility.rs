//! Which texts are worth scoring.
//!
//! The lexicon is English, so text must be long enough to carry sentiment and
//! written predominantly in Latin script.

use std::fmt;

pub const MIN_CHARS: usize = 10;

/// Minimum share of letters that must be Latin script.
const MIN_LATIN_SHARE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ineligible {
    TooShort { chars: usize },
    NoLetters,
    NonLatin { latin_share: f64 },
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::TooShort { chars } => {
                write!(f, "only {chars} characters (minimum {MIN_CHARS})")
            }
            Ineligible::NoLetters => write!(f, "no letters"),
            Ineligible::NonLatin { latin_share } => {
                write!(f, "{:.0}% Latin letters", latin_share * 100.0)
            }
        }
    }
}

/// # Errors
///
/// Returns the reason `text` should not be scored.
pub fn check_eligible(text: &str) -> Result<(), Ineligible> {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_CHARS {
        return Err(Ineligible::TooShort { chars });
    }

    let (letters, latin) = trimmed
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(letters, latin), c| {
            (letters + 1, latin + usize::from(is_latin(c)))
        });
    if letters == 0 {
        return Err(Ineligible::NoLetters);
    }

    #[allow(clippy::cast_precision_loss)]
    let latin_share = latin as f64 / letters as f64;
    if latin_share < MIN_LATIN_SHARE {
        return Err(Ineligible::NonLatin { latin_share });
    }
    Ok(())
}

/// Basic Latin, Latin-1 Supplement, and Latin Extended-A/B letters.
fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_text_is_eligible() {
        assert!(check_eligible("Ferry delays again this morning").is_ok());
        assert!(check_eligible("Café in Fitzroy is très bon").is_ok());
    }

    #[test]
    fn short_text_is_rejected_after_trimming() {
        assert_eq!(
            check_eligible("   hi there   "),
            Err(Ineligible::TooShort { chars: 8 })
        );
    }

    #[test]
    fn non_latin_text_is_rejected() {
        assert!(matches!(
            check_eligible("東京の天気はとても良いです"),
            Err(Ineligible::NonLatin { .. })
        ));
        assert!(matches!(
            check_eligible("Привет, как дела сегодня?"),
            Err(Ineligible::NonLatin { .. })
        ));
    }

    #[test]
    fn punctuation_only_is_rejected() {
        assert_eq!(check_eligible("!!! ??? 123 ..."), Err(Ineligible::NoLetters));
    }
}
