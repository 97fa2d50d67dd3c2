//! Plain-text extraction with encoding detection.
//!
//! Résumés saved as `.txt` arrive in whatever code page the author's editor
//! used. Detection runs in three tiers:
//!
//! 1. A byte-order mark is authoritative (confidence 1.0).
//! 2. Input that is valid UTF-8 is UTF-8 (1.0 if pure ASCII, else 0.99).
//! 3. Anything else goes to `chardetng`; its guess is scored by how much of
//!    the decoded text is printable, capped at 0.73.
//!
//! If the chosen encoding still cannot decode the bytes, the text is decoded
//! as lossy UTF-8 and the detection confidence drops to 0.5.

use super::postprocess::clean_text;
use super::Extraction;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::path::Path;
use tracing::{debug, info, warn};

/// Text confidence never exceeds this; detection is always a guess.
pub const TEXT_MAX_CONFIDENCE: f32 = 0.95;

/// Detection confidence after a failed decode.
pub const FALLBACK_DETECTION_CONFIDENCE: f32 = 0.5;

const GUESSED_DETECTION_CEILING: f32 = 0.73;

/// Result of encoding detection.
#[derive(Debug, Clone, Copy)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    pub confidence: f32,
    /// Length of the byte-order mark to skip, 0 if none.
    pub bom_len: usize,
}

/// Guess the encoding of `bytes`.
pub fn detect_encoding(bytes: &[u8]) -> DetectedEncoding {
    if bytes.is_empty() {
        return DetectedEncoding {
            encoding: UTF_8,
            confidence: FALLBACK_DETECTION_CONFIDENCE,
            bom_len: 0,
        };
    }
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return DetectedEncoding {
            encoding,
            confidence: 1.0,
            bom_len,
        };
    }
    if std::str::from_utf8(bytes).is_ok() {
        let confidence = if bytes.is_ascii() { 1.0 } else { 0.99 };
        return DetectedEncoding {
            encoding: UTF_8,
            confidence,
            bom_len: 0,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (preview, _) = encoding.decode_without_bom_handling(bytes);
    let confidence = GUESSED_DETECTION_CEILING * printable_ratio(&preview);
    debug!(
        "chardetng guessed {} (confidence {:.2})",
        encoding.name(),
        confidence
    );
    DetectedEncoding {
        encoding,
        confidence,
        bom_len: 0,
    }
}

/// Decode `bytes` strictly; on failure fall back to lossy UTF-8.
///
/// Returns the text and the detection confidence to use.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding, confidence: f32) -> (String, f32) {
    match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => (text.into_owned(), confidence),
        None => {
            warn!(
                "Decoding as {} failed, falling back to lossy UTF-8",
                encoding.name()
            );
            (
                String::from_utf8_lossy(bytes).into_owned(),
                FALLBACK_DETECTION_CONFIDENCE,
            )
        }
    }
}

fn printable_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if c != char::REPLACEMENT_CHARACTER
            && (!c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        {
            printable += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        printable as f32 / total as f32
    }
}

/// Extract text from the plain-text file at `path`.
///
/// Confidence is `min(0.95, detection_confidence + 0.1)`.
pub fn extract_plain_text(path: &Path) -> Result<Extraction, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read text file: {e}"))?;
    let detected = detect_encoding(&bytes);
    let (raw, detection_confidence) = decode_text(
        &bytes[detected.bom_len..],
        detected.encoding,
        detected.confidence,
    );
    let text = clean_text(&raw);
    let confidence = (detection_confidence + 0.1).min(TEXT_MAX_CONFIDENCE);

    info!(
        "Plain text: encoding {}, {} chars, confidence {:.2}",
        detected.encoding.name(),
        text.len(),
        confidence
    );
    Ok(Extraction {
        text,
        confidence,
        page_errors: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16LE, WINDOWS_1252};

    #[test]
    fn ascii_is_certain() {
        let d = detect_encoding(b"Jane Doe\nPython developer");
        assert_eq!(d.encoding, UTF_8);
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn utf8_multibyte() {
        let d = detect_encoding("José Núñez, Ingeniero".as_bytes());
        assert_eq!(d.encoding, UTF_8);
        assert_eq!(d.confidence, 0.99);
    }

    #[test]
    fn bom_wins() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        let d = detect_encoding(&bytes);
        assert_eq!(d.encoding, UTF_16LE);
        assert_eq!(d.bom_len, 2);
        let (text, conf) = decode_text(&bytes[d.bom_len..], d.encoding, d.confidence);
        assert_eq!(text, "hi");
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn latin1_is_guessed() {
        // accented Latin-1 letters are invalid UTF-8
        let (bytes, _, _) = WINDOWS_1252.encode("Résumé of a café owner in Montréal");
        let d = detect_encoding(&bytes);
        assert_ne!(d.encoding, UTF_8);
        // every byte decodes to a printable character, so the guess scores the ceiling
        assert!((d.confidence - GUESSED_DETECTION_CEILING).abs() < 1e-6);
        let (text, _) = decode_text(&bytes, d.encoding, d.confidence);
        assert!(text.contains("caf"));
    }

    #[test]
    fn failed_decode_falls_back_to_lossy_utf8() {
        let (text, conf) = decode_text(b"ab\xffcd", UTF_8, 0.9);
        assert_eq!(text, "ab\u{FFFD}cd");
        assert_eq!(conf, FALLBACK_DETECTION_CONFIDENCE);
    }

    #[test]
    fn confidence_formula() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "Senior Rust Engineer\r\n").unwrap();
        let out = extract_plain_text(tmp.path()).unwrap();
        assert_eq!(out.text, "Senior Rust Engineer");
        assert_eq!(out.confidence, TEXT_MAX_CONFIDENCE);
    }

    #[test]
    fn empty_file_uses_fallback_confidence() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let out = extract_plain_text(tmp.path()).unwrap();
        assert_eq!(out.text, "");
        assert!((out.confidence - 0.6).abs() < 1e-6);
    }
}
