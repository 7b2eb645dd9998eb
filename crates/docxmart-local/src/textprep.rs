//! Minimal, deterministic text helpers.
//!
//! `detection_sample` builds the bounded input fed to the language identifier. It is lossy on
//! purpose (markup, URLs and numbers carry no language signal) and is never shown to users.

pub fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// First `max_chars` characters of `s`, plus whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => (s[..byte].to_string(), true),
        None => (s.to_string(), false),
    }
}

fn looks_like_url(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    t.starts_with("http://") || t.starts_with("https://") || t.starts_with("www.")
}

/// Bounded, markup-free sample of `text` for language identification.
///
/// - drops URL tokens and tokens without any alphabetic character
/// - strips leading/trailing markdown punctuation (`#`, `*`, `_`, `` ` ``, `>`, `[`, `]`, ...)
/// - joins surviving tokens with single spaces and stops once `max_chars` is reached
pub fn detection_sample(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut n = 0usize;
    for raw in text.split_whitespace() {
        if n >= max_chars {
            break;
        }
        if looks_like_url(raw) {
            continue;
        }
        let token = raw.trim_matches(|c: char| {
            matches!(
                c,
                '#' | '*' | '_' | '`' | '>' | '[' | ']' | '(' | ')' | '|' | '~' | '-' | '='
            )
        });
        if !token.chars().any(char::is_alphabetic) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
            n += 1;
        }
        for ch in token.chars() {
            if n >= max_chars {
                break;
            }
            out.push(ch);
            n += 1;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_counts_characters_not_bytes() {
        let (t, cut) = truncate_chars("héllo wörld", 4);
        assert_eq!(t, "héll");
        assert!(cut);
        let (t, cut) = truncate_chars("abc", 3);
        assert_eq!(t, "abc");
        assert!(!cut);
        let (t, cut) = truncate_chars("abc", 0);
        assert_eq!(t, "");
        assert!(cut);
    }

    #[test]
    fn detection_sample_drops_markup_urls_and_numbers() {
        let md = "# Titre\n\n**Bonjour** à tous, voir https://example.com 2024 [lien](x)\n> citation";
        let s = detection_sample(md, 1000);
        assert_eq!(s, "Titre Bonjour à tous, voir lien](x citation");
        assert!(!s.contains("http"));
        assert!(!s.contains("2024"));
    }

    #[test]
    fn detection_sample_is_bounded() {
        let long = "mot ".repeat(10_000);
        let s = detection_sample(&long, 100);
        assert!(s.chars().count() <= 100);
        assert!(s.starts_with("mot mot"));
    }

    #[test]
    fn detection_sample_of_blank_text_is_empty() {
        assert_eq!(detection_sample("   \n\t 12 34 -- ", 100), "");
        assert!(!has_any_text(" \n "));
    }
}
