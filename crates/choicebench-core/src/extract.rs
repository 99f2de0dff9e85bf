//! Answer extraction from free-form model output.
//!
//! Two strategies of decreasing precision:
//! - strict: the trimmed text is exactly one of `1`, `2`, `3`, `4`
//! - tolerant: the leftmost character in `1..=4` anywhere in the text
//!
//! [`parse_with_retry`] tries strict first and falls back to tolerant.

use thiserror::Error;

/// Failure to extract an option number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("strict parse failed for '{raw}'")]
    Strict { raw: String },

    #[error("tolerant parse failed for '{raw}'")]
    Tolerant { raw: String },
}

/// Accept only a bare option number, ignoring surrounding whitespace.
pub fn strict_parse(raw: &str) -> Result<u8, ExtractError> {
    match raw.trim() {
        "1" => Ok(1),
        "2" => Ok(2),
        "3" => Ok(3),
        "4" => Ok(4),
        _ => Err(ExtractError::Strict {
            raw: raw.to_string(),
        }),
    }
}

/// Return the first digit in `1..=4` scanning left to right.
pub fn tolerant_parse(raw: &str) -> Result<u8, ExtractError> {
    raw.chars()
        .find(|c| matches!(c, '1'..='4'))
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
        .ok_or_else(|| ExtractError::Tolerant {
            raw: raw.to_string(),
        })
}

/// Strict parse, falling back to tolerant parse.
///
/// When both fail the tolerant error is returned.
pub fn parse_with_retry(raw: &str) -> Result<u8, ExtractError> {
    strict_parse(raw).or_else(|_| tolerant_parse(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accepts_bare_digits() {
        for (raw, expected) in [("1", 1), ("2", 2), ("3", 3), ("4", 4)] {
            assert_eq!(strict_parse(raw), Ok(expected));
        }
        assert_eq!(strict_parse("  3\n"), Ok(3));
        assert_eq!(strict_parse("\t4 "), Ok(4));
    }

    #[test]
    fn strict_rejects_anything_else() {
        for raw in ["", "0", "5", "12", "3.", "Answer: 2", "option 1", "one"] {
            assert!(
                matches!(strict_parse(raw), Err(ExtractError::Strict { .. })),
                "strict parse should reject {raw:?}"
            );
        }
    }

    #[test]
    fn tolerant_takes_leftmost_digit() {
        assert_eq!(tolerant_parse("I think 2 or maybe 3"), Ok(2));
        assert_eq!(tolerant_parse("The answer is 4."), Ok(4));
        assert_eq!(tolerant_parse("Option 0, no wait, 5... 3"), Ok(3));
        assert_eq!(tolerant_parse("12"), Ok(1));
    }

    #[test]
    fn tolerant_fails_without_candidate_digit() {
        assert!(matches!(
            tolerant_parse("I don't know"),
            Err(ExtractError::Tolerant { .. })
        ));
        assert!(tolerant_parse("0 5 6 7 8 9").is_err());
    }

    #[test]
    fn combined_policy() {
        assert_eq!(parse_with_retry("  3  "), Ok(3));
        assert_eq!(parse_with_retry("The answer is 4."), Ok(4));
        assert_eq!(
            parse_with_retry("I don't know"),
            Err(ExtractError::Tolerant {
                raw: "I don't know".into()
            })
        );
    }

    #[test]
    fn extraction_is_pure() {
        let raw = "Most likely 3, though 1 is tempting";
        let first = parse_with_retry(raw);
        for _ in 0..5 {
            assert_eq!(parse_with_retry(raw), first);
        }
    }
}
