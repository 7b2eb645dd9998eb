//! Per-session conversation context.
//!
//! A `Session` owns the active document (at most one; last successful upload wins) and the
//! append-only chat log. It is created when a user starts interacting and dropped when they
//! leave; nothing in it is shared across sessions.
//!
//! Ordering rules for a prompt: the user turn is appended first, then either the assistant
//! turn or nothing (a failed call never leaves a partial assistant turn behind). A prompt with
//! no document is refused before anything is appended or sent.

use crate::config::env_usize;
use crate::pipeline::{IngestConfig, IngestPipeline, PipelineState};
use crate::textprep::truncate_chars;
use docxmart_core::{ChatBackend, ChatTurn, NormalizedDocument, UploadedDocument};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4_000;

pub const GREETING: &str = "Hi! This is docXmart. Please upload your document and mention what \
you need help with. For example; 'Please summarize this document' or 'Translate this document to \
French'.";

const RESPONSE_ARTIFACT: &str = "user:";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A user-visible message produced by a session transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn level(&self) -> &'static str {
        match self {
            Notice::Success(_) => "success",
            Notice::Warning(_) => "warning",
            Notice::Error(_) => "error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub notice: Notice,
    pub state: PipelineState,
    pub warnings: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The cleaned assistant reply, also appended to the log.
    Answered(String),
    /// Refused before contacting the chat backend.
    Rejected(Notice),
    /// The chat backend failed; only the user turn was appended.
    Failed(Notice),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ingest: IngestConfig,
    pub max_context_chars: usize,
    pub greeting: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            greeting: true,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            ingest: IngestConfig::from_env(),
            max_context_chars: env_usize("DOCXMART_MAX_CONTEXT_CHARS", DEFAULT_MAX_CONTEXT_CHARS),
            greeting: true,
        }
    }
}

/// Bounded prefix of the document text handed to the chat backend.
pub fn bound_context(text: &str, max_chars: usize) -> String {
    truncate_chars(text, max_chars).0
}

/// Remove trailing `user:` artifacts (any case) and trailing whitespace from a reply.
///
/// The artifact must stand alone: `superuser:` is part of the reply, `. user:` is not.
pub fn strip_response_artifact(reply: &str) -> String {
    let mut s = reply.trim_end();
    while let Some(head) = artifact_head(s) {
        s = head.trim_end();
    }
    s.to_string()
}

fn artifact_head(s: &str) -> Option<&str> {
    let k = RESPONSE_ARTIFACT.len();
    let cut = s.len().checked_sub(k)?;
    if !s.is_char_boundary(cut) || !s[cut..].eq_ignore_ascii_case(RESPONSE_ARTIFACT) {
        return None;
    }
    let head = &s[..cut];
    match head.chars().next_back() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(head),
    }
}

#[derive(Debug)]
pub struct Session {
    id: u64,
    cfg: SessionConfig,
    pipeline: IngestPipeline,
    document: Option<NormalizedDocument>,
    turns: Vec<ChatTurn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(cfg: SessionConfig) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let mut turns = Vec::new();
        if cfg.greeting {
            turns.push(ChatTurn::assistant(GREETING));
        }
        tracing::debug!(session = id, "session started");
        Self {
            id,
            pipeline: IngestPipeline::new(cfg.ingest.clone()),
            cfg,
            document: None,
            turns,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn document(&self) -> Option<&NormalizedDocument> {
        self.document.as_ref()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn max_context_chars(&self) -> usize {
        self.cfg.max_context_chars
    }

    /// Ingest a new upload. On success it replaces the active document; on failure the
    /// previous document (if any) is kept and an error notice is returned.
    pub fn upload(&mut self, upload: UploadedDocument) -> UploadReport {
        match self.pipeline.ingest(&upload) {
            Ok(ingested) => {
                self.document = Some(ingested.document);
                UploadReport {
                    notice: Notice::Success("File uploaded and decoded successfully!".to_string()),
                    state: self.pipeline.state(),
                    warnings: ingested.warnings,
                }
            }
            Err(e) => UploadReport {
                notice: Notice::Error(format!(
                    "An error occurred while reading the file: {e}"
                )),
                state: self.pipeline.state(),
                warnings: Vec::new(),
            },
        }
    }

    /// Ask `backend` about the active document.
    pub async fn submit_prompt(
        &mut self,
        prompt: &str,
        backend: &dyn ChatBackend,
    ) -> PromptOutcome {
        if prompt.trim().is_empty() {
            return PromptOutcome::Rejected(Notice::Warning("Please enter a question.".to_string()));
        }
        let Some(doc) = self.document.as_ref() else {
            tracing::debug!(session = self.id, "prompt refused: no document");
            return PromptOutcome::Rejected(Notice::Warning(
                "Please upload a document before asking about it.".to_string(),
            ));
        };
        let context = bound_context(&doc.text, self.cfg.max_context_chars);

        self.turns.push(ChatTurn::user(prompt));
        match backend.complete(&context, prompt).await {
            Ok(reply) => {
                let reply = strip_response_artifact(&reply);
                self.turns.push(ChatTurn::assistant(reply.clone()));
                PromptOutcome::Answered(reply)
            }
            Err(e) => {
                tracing::warn!(session = self.id, backend = backend.name(), error = %e, "chat call failed");
                PromptOutcome::Failed(Notice::Error(format!("An error occurred: {e}")))
            }
        }
    }

    /// Dispose of the session, returning its transcript.
    pub fn end(self) -> Vec<ChatTurn> {
        tracing::debug!(session = self.id, turns = self.turns.len(), "session ended");
        self.turns
    }
}
