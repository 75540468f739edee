//! Time-stamped download tokens.
//!
//! A token is the standard base64 encoding of the decimal millisecond
//! timestamp at which the page offering the download was rendered. Browsers
//! produce it with `btoa(Date.now().toString())`, and some clients strip the
//! trailing `=` padding before sending it.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

/// Milliseconds since the Unix epoch, as carried inside a token.
pub type IssuedAtMillis = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid download token")]
pub struct InvalidToken;

/// Encode a timestamp the same way the front end does.
pub fn encode(issued_at: IssuedAtMillis) -> String {
    STANDARD.encode(issued_at.to_string())
}

/// Decode a token back into the timestamp it carries.
pub fn decode(token: &str) -> Result<IssuedAtMillis, InvalidToken> {
    let padded = restore_padding(token);
    let bytes = STANDARD.decode(padded.as_bytes()).map_err(|_| InvalidToken)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| InvalidToken)?;

    text.trim().parse::<IssuedAtMillis>().map_err(|_| InvalidToken)
}

fn restore_padding(token: &str) -> String {
    let missing = (4 - token.len() % 4) % 4;
    let mut padded = String::with_capacity(token.len() + missing);
    padded.push_str(token);
    padded.extend(std::iter::repeat('=').take(missing));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for millis in [0, 1, 42, 1_700_000_000_000, i64::MAX] {
            assert_eq!(decode(&encode(millis)), Ok(millis));
        }
    }

    #[test]
    fn test_browser_token() {
        // btoa("1700000000000")
        assert_eq!(decode("MTcwMDAwMDAwMDAwMA=="), Ok(1_700_000_000_000));
    }

    #[test]
    fn test_missing_padding_is_restored() {
        assert_eq!(decode("MTcwMDAwMDAwMDAwMA"), Ok(1_700_000_000_000));
        assert_eq!(decode("MTcwMDAwMDAwMDAwMA="), Ok(1_700_000_000_000));
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(decode("not-a-number-base64"), Err(InvalidToken));
        // base64 of "hello"
        assert_eq!(decode("aGVsbG8="), Err(InvalidToken));
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(decode(""), Err(InvalidToken));
    }

    #[test]
    fn test_non_utf8_payload() {
        assert_eq!(decode(&STANDARD.encode([0xff, 0xfe, 0x31])), Err(InvalidToken));
    }

    #[test]
    fn test_impossible_length() {
        // a single trailing sextet can never be valid base64
        assert_eq!(decode("MTcwM"), Err(InvalidToken));
    }
}
