//! Text-line samples as emitted by the acquisition board
//!
//! The board prints one decimal voltage per line. Anything that is not a
//! single finite number is malformed and gets dropped by the caller.

use crate::error::{EcgError, EcgResult};

/// Decode a raw line read from the device, dropping invalid UTF-8 sequences
/// and surrounding whitespace (including the `\r` of CRLF endings).
pub fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse one line into a voltage sample.
///
/// Empty lines and non-finite values (`NaN`, `inf`) are rejected.
pub fn parse_sample(line: &str) -> EcgResult<f32> {
    let trimmed = line.trim();
    match trimmed.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(EcgError::MalformedSample {
            line: trimmed.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_samples() {
        assert_eq!(parse_sample("1.234"), Ok(1.234));
        assert_eq!(parse_sample("  0.5\r"), Ok(0.5));
        assert_eq!(parse_sample("-0.25"), Ok(-0.25));
        assert_eq!(parse_sample("3"), Ok(3.0));
        assert_eq!(parse_sample("1e-3"), Ok(0.001));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for line in ["", "   ", "abc", "1.2.3", "1,5", "0.5 0.6", "NaN", "inf", "-inf"] {
            assert!(
                matches!(parse_sample(line), Err(EcgError::MalformedSample { .. })),
                "line {:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_decode_line_drops_invalid_bytes() {
        assert_eq!(decode_line(b"1.25\r\n"), "1.25");
        assert_eq!(decode_line(b"\xff1.5\xfe"), "1.5");
        assert_eq!(decode_line(b""), "");
    }
}
