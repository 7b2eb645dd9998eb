use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no character encoding could be detected")]
    EncodingUndetected,
    #[error("encoding guess {encoding} below confidence threshold ({confidence:.2} < {min:.2})")]
    LowConfidence {
        encoding: String,
        confidence: f32,
        min: f32,
    },
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("unsupported upload: {0}")]
    Unsupported(String),
    #[error("chat failed: {0}")]
    Chat(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Upload kinds the extractor knows how to handle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Plain text, markdown, and anything else that is decoded as characters.
    Text,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Pdf => "pdf",
        }
    }
}

/// One upload event: raw bytes plus what the client told us about them.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub filename: String,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type,
            filename: filename.into(),
        }
    }

    /// Lowercased extension of `filename`, without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.rsplit(['/', '\\']).next().unwrap_or("");
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodingGuess {
    /// WHATWG encoding name (e.g. "UTF-8", "windows-1252"); `None` when nothing fit.
    pub encoding: Option<String>,
    /// Share of the input that decodes to plausible text under `encoding`, in [0, 1].
    pub confidence: f32,
}

impl EncodingGuess {
    pub fn absent() -> Self {
        Self {
            encoding: None,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageGuess {
    /// ISO 639-1 code when one exists, the detector's raw code otherwise, or "unknown".
    pub code: String,
    pub name: String,
    pub confidence: f64,
}

pub const UNKNOWN_LANGUAGE: &str = "unknown";

impl LanguageGuess {
    pub fn unknown() -> Self {
        Self {
            code: UNKNOWN_LANGUAGE.to_string(),
            name: UNKNOWN_LANGUAGE.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.code == UNKNOWN_LANGUAGE
    }
}

/// The session's canonical view of the last successfully ingested upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedDocument {
    pub filename: String,
    pub kind: DocumentKind,
    pub text: String,
    /// Only set for text uploads; PDFs carry their own text encoding.
    pub encoding: Option<EncodingGuess>,
    pub language: LanguageGuess,
}

impl NormalizedDocument {
    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The remote conversational completion service.
///
/// Implementations receive an already-bounded `context_text`; bounding and response cleanup
/// are the caller's job.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, context_text: &str, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_ignores_directories() {
        let d = UploadedDocument::new("notes/Report.PDF", None, Vec::new());
        assert_eq!(d.extension().as_deref(), Some("pdf"));
        let d = UploadedDocument::new("dir.v2/README", None, Vec::new());
        assert_eq!(d.extension(), None);
        let d = UploadedDocument::new(".bashrc", None, Vec::new());
        assert_eq!(d.extension(), None);
    }

    #[test]
    fn chat_turns_serialize_with_lowercase_roles() {
        let v = serde_json::to_value(ChatTurn::assistant("hi")).unwrap();
        assert_eq!(v["role"].as_str(), Some("assistant"));
        assert_eq!(v["content"].as_str(), Some("hi"));
    }

    #[test]
    fn unknown_language_sentinel_is_recognized() {
        assert!(LanguageGuess::unknown().is_unknown());
        assert_eq!(LanguageGuess::unknown().name, "unknown");
    }
}
