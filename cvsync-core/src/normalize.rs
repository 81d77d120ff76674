//! Field normalizer.
//!
//! CVSecurity rejects person names containing anything but ASCII letters and
//! whitespace, and its API (not its UI) caps each name field at 25 characters.
//! Department names may additionally carry digits.

use std::fmt;
use std::str::FromStr;

use crate::error::NormalizeError;

/// Maximum length CVSecurity accepts for `name` / `lastName`.
pub const NAME_MAX_LEN: usize = 25;

/// Which characters [`clean_string`] keeps besides whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    /// `[A-Za-z0-9]` plus whitespace.
    Alphanumeric,
    /// `[A-Za-z]` plus whitespace.
    Alphabetic,
}

impl CleanMode {
    fn keeps(self, c: char) -> bool {
        match self {
            CleanMode::Alphanumeric => c.is_ascii_alphanumeric() || c.is_whitespace(),
            CleanMode::Alphabetic => c.is_ascii_alphabetic() || c.is_whitespace(),
        }
    }
}

impl fmt::Display for CleanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanMode::Alphanumeric => write!(f, "alphanumeric"),
            CleanMode::Alphabetic => write!(f, "alphabetic"),
        }
    }
}

impl FromStr for CleanMode {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alphanumeric" => Ok(CleanMode::Alphanumeric),
            "alphabetic" => Ok(CleanMode::Alphabetic),
            other => Err(NormalizeError::InvalidMode(other.to_owned())),
        }
    }
}

/// Drop every character `mode` does not keep, then trim surrounding whitespace.
///
/// Inner whitespace survives untouched: `"Dept #1 (North)"` becomes
/// `"Dept 1 North"`.
pub fn clean_string(text: &str, mode: CleanMode) -> String {
    let kept: String = text.chars().filter(|c| mode.keeps(*c)).collect();
    kept.trim().to_owned()
}

/// Clean both name parts as alphabetic and cap each at [`NAME_MAX_LEN`].
pub fn normalize_full_name(first_name: &str, last_name: &str) -> (String, String) {
    normalize_full_name_with(first_name, last_name, NAME_MAX_LEN)
}

/// [`normalize_full_name`] with an explicit per-field limit.
///
/// Truncation runs after cleaning so stripped characters never count against
/// the limit.
pub fn normalize_full_name_with(
    first_name: &str,
    last_name: &str,
    max_len: usize,
) -> (String, String) {
    (
        truncate_chars(&clean_string(first_name, CleanMode::Alphabetic), max_len),
        truncate_chars(&clean_string(last_name, CleanMode::Alphabetic), max_len),
    )
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("O'Brien-Smith 2nd", CleanMode::Alphabetic, "OBrienSmith nd")]
    #[case("Dept #1 (North)", CleanMode::Alphanumeric, "Dept 1 North")]
    #[case("  José  Núñez ", CleanMode::Alphabetic, "Jos  Nez")]
    #[case("\tTabs\nand lines\t", CleanMode::Alphabetic, "Tabs\nand lines")]
    #[case("!!!", CleanMode::Alphanumeric, "")]
    #[case("", CleanMode::Alphabetic, "")]
    fn clean_string_cases(#[case] input: &str, #[case] mode: CleanMode, #[case] expected: &str) {
        assert_eq!(clean_string(input, mode), expected);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "numeric".parse::<CleanMode>().unwrap_err();
        assert_eq!(err, NormalizeError::InvalidMode("numeric".to_string()));
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn mode_names_round_trip_through_display() {
        for mode in [CleanMode::Alphanumeric, CleanMode::Alphabetic] {
            assert_eq!(mode.to_string().parse::<CleanMode>(), Ok(mode));
        }
    }

    #[test]
    fn long_names_are_capped_independently() {
        let (first, last) = normalize_full_name(&"A".repeat(30), &"B".repeat(30));
        assert_eq!(first, "A".repeat(25));
        assert_eq!(last, "B".repeat(25));
    }

    #[test]
    fn stripped_characters_do_not_count_against_the_limit() {
        let first = format!("{}{}", "-".repeat(10), "C".repeat(25));
        let (first, _) = normalize_full_name(&first, "x");
        assert_eq!(first, "C".repeat(25));
    }

    #[test]
    fn short_names_pass_through() {
        assert_eq!(
            normalize_full_name("Ana", "García López"),
            ("Ana".to_string(), "Garca Lpez".to_string())
        );
    }

    #[test]
    fn custom_limit_is_honoured() {
        let (first, last) = normalize_full_name_with("Maximilian", "Featherstone", 4);
        assert_eq!(first, "Maxi");
        assert_eq!(last, "Feat");
    }
}
