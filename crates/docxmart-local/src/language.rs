//! Language identification over normalized document text.
//!
//! `whatlang` reports ISO 639-3 codes; we surface ISO 639-1 where one exists and resolve a
//! display name from a static table. Codes missing from the table pass through verbatim as
//! their own display name.

use crate::textprep;
use docxmart_core::LanguageGuess;

pub const DEFAULT_SAMPLE_CHARS: usize = 2_000;

/// ISO 639-3 (as reported by whatlang) -> ISO 639-1.
const ISO639_3_TO_1: &[(&str, &str)] = &[
    ("afr", "af"),
    ("aka", "ak"),
    ("amh", "am"),
    ("ara", "ar"),
    ("aze", "az"),
    ("bel", "be"),
    ("ben", "bn"),
    ("bul", "bg"),
    ("cat", "ca"),
    ("ces", "cs"),
    ("cmn", "zh"),
    ("dan", "da"),
    ("deu", "de"),
    ("ell", "el"),
    ("eng", "en"),
    ("epo", "eo"),
    ("est", "et"),
    ("fin", "fi"),
    ("fra", "fr"),
    ("guj", "gu"),
    ("heb", "he"),
    ("hin", "hi"),
    ("hrv", "hr"),
    ("hun", "hu"),
    ("hye", "hy"),
    ("ind", "id"),
    ("ita", "it"),
    ("jav", "jv"),
    ("jpn", "ja"),
    ("kan", "kn"),
    ("kat", "ka"),
    ("khm", "km"),
    ("kor", "ko"),
    ("lat", "la"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mal", "ml"),
    ("mar", "mr"),
    ("mkd", "mk"),
    ("mya", "my"),
    ("nep", "ne"),
    ("nld", "nl"),
    ("nob", "nb"),
    ("ori", "or"),
    ("pan", "pa"),
    ("pes", "fa"),
    ("pol", "pl"),
    ("por", "pt"),
    ("ron", "ro"),
    ("rus", "ru"),
    ("sin", "si"),
    ("slk", "sk"),
    ("slv", "sl"),
    ("sna", "sn"),
    ("spa", "es"),
    ("srp", "sr"),
    ("swe", "sv"),
    ("tam", "ta"),
    ("tel", "te"),
    ("tgl", "tl"),
    ("tha", "th"),
    ("tuk", "tk"),
    ("tur", "tr"),
    ("ukr", "uk"),
    ("urd", "ur"),
    ("uzb", "uz"),
    ("vie", "vi"),
    ("yid", "yi"),
    ("zul", "zu"),
];

/// ISO 639-1 -> English display name.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("ak", "Akan"),
    ("am", "Amharic"),
    ("ar", "Arabic"),
    ("az", "Azerbaijani"),
    ("be", "Belarusian"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("eo", "Esperanto"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("gu", "Gujarati"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("jv", "Javanese"),
    ("ka", "Georgian"),
    ("km", "Khmer"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("la", "Latin"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("my", "Burmese"),
    ("nb", "Norwegian Bokmål"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("or", "Odia"),
    ("pa", "Punjabi"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("si", "Sinhala"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sn", "Shona"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tk", "Turkmen"),
    ("tl", "Tagalog"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("uz", "Uzbek"),
    ("vi", "Vietnamese"),
    ("yi", "Yiddish"),
    ("zh", "Chinese"),
    ("zu", "Zulu"),
];

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Prefer the two-letter code; unknown three-letter codes are kept as-is.
pub fn normalize_code(raw: &str) -> String {
    let raw = raw.trim().to_ascii_lowercase();
    lookup(ISO639_3_TO_1, &raw)
        .map(str::to_string)
        .unwrap_or(raw)
}

/// Display name for `code`; unrecognized codes are their own name.
pub fn display_name(code: &str) -> String {
    lookup(LANGUAGE_NAMES, code)
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string())
}

#[derive(Debug, Clone)]
pub struct LanguageIdentifier {
    sample_chars: usize,
}

impl Default for LanguageIdentifier {
    fn default() -> Self {
        Self {
            sample_chars: DEFAULT_SAMPLE_CHARS,
        }
    }
}

impl LanguageIdentifier {
    pub fn new(sample_chars: usize) -> Self {
        Self {
            sample_chars: sample_chars.clamp(16, 200_000),
        }
    }

    /// Best-guess language of `text`. Never fails: blank or unclassifiable input yields
    /// the `unknown` sentinel.
    pub fn identify(&self, text: &str) -> LanguageGuess {
        let sample = textprep::detection_sample(text, self.sample_chars);
        if !textprep::has_any_text(&sample) {
            return LanguageGuess::unknown();
        }
        let Some(info) = whatlang::detect(&sample) else {
            return LanguageGuess::unknown();
        };
        let code = normalize_code(info.lang().code());
        LanguageGuess {
            name: display_name(&code),
            code,
            confidence: info.confidence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRENCH: &str = "Bonjour, comment allez-vous? Je suis très heureux de vous voir \
        aujourd'hui. Nous allons parler de la littérature française et de l'histoire de la \
        ville de Paris, qui est une des plus belles villes du monde.";

    const ENGLISH: &str = "The quick brown fox jumps over the lazy dog. This document explains \
        how the quarterly report was prepared and which figures should be reviewed first.";

    #[test]
    fn identifies_french_text() {
        let g = LanguageIdentifier::default().identify(FRENCH);
        assert_eq!(g.code, "fr");
        assert_eq!(g.name, "French");
        assert!(g.confidence > 0.0);
    }

    #[test]
    fn identifies_english_text() {
        let g = LanguageIdentifier::default().identify(ENGLISH);
        assert_eq!(g.code, "en");
        assert_eq!(g.name, "English");
    }

    #[test]
    fn identification_is_deterministic() {
        let id = LanguageIdentifier::default();
        let a = id.identify(FRENCH);
        let b = id.identify(FRENCH);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_and_symbol_only_text_is_unknown() {
        let id = LanguageIdentifier::default();
        assert!(id.identify("").is_unknown());
        assert!(id.identify("  \n 42 -- 3.14 ").is_unknown());
    }

    #[test]
    fn unrecognized_codes_pass_through_as_names() {
        assert_eq!(normalize_code("fra"), "fr");
        assert_eq!(normalize_code("XYZ"), "xyz");
        assert_eq!(display_name("xyz"), "xyz");
        assert_eq!(display_name("ur"), "Urdu");
    }
}
