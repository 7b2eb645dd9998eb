//! Character-encoding detection for text-like uploads.
//!
//! Detection is statistical (`chardetng`) with a few hard rules in front of it:
//! a byte-order mark wins outright, valid UTF-8 is taken as UTF-8, and byte streams that are
//! clearly binary (images, archives, NUL-heavy data) get no guess at all, so callers never
//! decode an embedded image into mojibake.

use crate::config::env_f32;
use docxmart_core::{EncodingGuess, Error, Result};
use encoding_rs::Encoding;

/// Bytes inspected by the binary sniff; decoding still covers the whole input.
const SNIFF_BYTES: usize = 8 * 1024;
/// Share of disallowed control bytes above which input is treated as binary.
const MAX_CONTROL_RATIO: f32 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct EncodingPolicy {
    /// Guesses below this confidence are rejected. 0.0 accepts any non-absent guess.
    pub min_confidence: f32,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
        }
    }
}

impl EncodingPolicy {
    pub fn from_env() -> Self {
        Self {
            min_confidence: env_f32("DOCXMART_MIN_ENCODING_CONFIDENCE", 0.0).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub guess: EncodingGuess,
}

/// Best-effort sniff for common image formats.
pub fn bytes_look_like_image(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return true;
    }
    if bytes.starts_with(b"\xff\xd8\xff") {
        return true;
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return true;
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return true;
    }
    false
}

/// Zip containers (docx, epub, odt, ...).
pub fn bytes_look_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

fn is_disallowed_control(b: u8) -> bool {
    // Tab, LF, FF, CR and ESC show up in real text files.
    (b < 0x20 && !matches!(b, b'\t' | b'\n' | 0x0c | b'\r' | 0x1b)) || b == 0x7f
}

/// True when `bytes` are clearly not text in any single- or multi-byte ASCII-compatible encoding.
///
/// UTF-16 without a BOM trips the NUL rule; BOM-marked UTF-16 is handled before this is called.
/// Empty input is not binary.
pub fn bytes_look_binary(bytes: &[u8]) -> bool {
    if bytes_look_like_image(bytes) || bytes_look_like_zip(bytes) {
        return true;
    }
    let head = sniff_head(bytes);
    head.contains(&0) || control_heavy(head)
}

fn sniff_head(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(SNIFF_BYTES)]
}

fn control_heavy(head: &[u8]) -> bool {
    if head.is_empty() {
        return false;
    }
    let controls = head.iter().filter(|b| is_disallowed_control(**b)).count();
    (controls as f32 / head.len() as f32) > MAX_CONTROL_RATIO
}

/// Share of decoded characters that are plausible text (not U+FFFD, not stray controls).
fn plausible_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut good = 0usize;
    for ch in text.chars() {
        total += 1;
        let bad = ch == char::REPLACEMENT_CHARACTER
            || (ch.is_control() && !matches!(ch, '\t' | '\n' | '\r' | '\u{000C}' | '\u{001B}'));
        if !bad {
            good += 1;
        }
    }
    if total == 0 {
        return 1.0;
    }
    good as f32 / total as f32
}

/// Infer the encoding of `bytes`.
///
/// Empty input is reported as UTF-8 with full confidence: there is nothing to misdecode.
pub fn detect(bytes: &[u8]) -> EncodingGuess {
    if let Some((enc, _bom_len)) = Encoding::for_bom(bytes) {
        return EncodingGuess {
            encoding: Some(enc.name().to_string()),
            confidence: 1.0,
        };
    }
    if bytes_look_like_image(bytes) || bytes_look_like_zip(bytes) {
        return EncodingGuess::absent();
    }
    // A stray NUL does not disqualify valid UTF-8; a control-dominated stream (BOM-less
    // UTF-16, packed binary) still does.
    if std::str::from_utf8(bytes).is_ok() && !control_heavy(sniff_head(bytes)) {
        return EncodingGuess {
            encoding: Some(encoding_rs::UTF_8.name().to_string()),
            confidence: 1.0,
        };
    }
    if bytes_look_binary(bytes) {
        return EncodingGuess::absent();
    }

    let mut det = chardetng::EncodingDetector::new();
    det.feed(bytes, true);
    let enc = det.guess(None, true);
    let (decoded, _had_errors) = enc.decode_without_bom_handling(bytes);
    EncodingGuess {
        encoding: Some(enc.name().to_string()),
        confidence: plausible_ratio(&decoded),
    }
}

/// Detect, apply the confidence policy, then decode strictly.
///
/// Fails with `EncodingUndetected` when there is no guess and with `Decode` when the input
/// contains sequences that are malformed under the guessed encoding.
pub fn decode(bytes: &[u8], policy: &EncodingPolicy) -> Result<DecodedText> {
    let guess = detect(bytes);
    let Some(name) = guess.encoding.clone() else {
        return Err(Error::EncodingUndetected);
    };
    if guess.confidence < policy.min_confidence {
        return Err(Error::LowConfidence {
            encoding: name,
            confidence: guess.confidence,
            min: policy.min_confidence,
        });
    }
    let enc = Encoding::for_label(name.as_bytes())
        .ok_or_else(|| Error::Decode(format!("unknown encoding label {name}")))?;
    // `decode` strips a matching BOM; the guess already reflects it.
    let (text, _used, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(Error::Decode(format!("input is not valid {name}")));
    }
    Ok(DecodedText {
        text: text.into_owned(),
        guess,
    })
}
