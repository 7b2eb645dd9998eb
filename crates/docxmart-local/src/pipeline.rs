//! Ingestion pipeline: upload bytes → extracted text → language tag.
//!
//! The pipeline is a small state machine. A run always starts from `Extracting` (a new upload
//! discards whatever the previous run left behind) and ends in `Ready` or `Failed`. Language
//! detection cannot fail a run; it degrades to the `unknown` sentinel with a warning.

use crate::encoding::EncodingPolicy;
use crate::extract;
use crate::language::LanguageIdentifier;
use docxmart_core::{NormalizedDocument, Result, UploadedDocument};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    LanguageDetecting,
    Ready,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracting => "extracting",
            PipelineState::LanguageDetecting => "language_detecting",
            PipelineState::Ready => "ready",
            PipelineState::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle | Ready | Failed | Extracting | LanguageDetecting, Extracting)
                | (Extracting, LanguageDetecting)
                | (Extracting | LanguageDetecting, Failed)
                | (LanguageDetecting, Ready)
        )
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub encoding: EncodingPolicy,
    pub language_sample_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingPolicy::default(),
            language_sample_chars: crate::language::DEFAULT_SAMPLE_CHARS,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        Self {
            encoding: EncodingPolicy::from_env(),
            language_sample_chars: crate::config::env_usize(
                "DOCXMART_LANGUAGE_SAMPLE_CHARS",
                crate::language::DEFAULT_SAMPLE_CHARS,
            ),
        }
    }
}

/// A successful run.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub document: NormalizedDocument,
    pub warnings: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct IngestPipeline {
    cfg: IngestConfig,
    language: LanguageIdentifier,
    state: PipelineState,
    /// States visited by the most recent run, in order.
    trail: Vec<PipelineState>,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(IngestConfig::default())
    }
}

impl IngestPipeline {
    pub fn new(cfg: IngestConfig) -> Self {
        let language = LanguageIdentifier::new(cfg.language_sample_chars);
        Self {
            cfg,
            language,
            state: PipelineState::Idle,
            trail: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn last_run(&self) -> &[PipelineState] {
        &self.trail
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid pipeline transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "pipeline transition");
        self.state = next;
        self.trail.push(next);
    }

    /// Run one upload through the pipeline.
    ///
    /// On error the pipeline ends in `Failed` and nothing is returned for the caller to store;
    /// the caller's previous document stays as it was.
    pub fn ingest(&mut self, upload: &UploadedDocument) -> Result<Ingested> {
        self.trail.clear();
        self.enter(PipelineState::Extracting);

        let extracted = match extract::extract(upload, &self.cfg.encoding) {
            Ok(x) => x,
            Err(e) => {
                tracing::warn!(file = %upload.filename, error = %e, "ingestion failed");
                self.enter(PipelineState::Failed);
                return Err(e);
            }
        };

        self.enter(PipelineState::LanguageDetecting);
        let mut warnings = extracted.warnings;
        let language = self.language.identify(&extracted.text);
        if language.is_unknown() {
            warnings.push("language_undetected");
        }

        let document = NormalizedDocument {
            filename: upload.filename.clone(),
            kind: extracted.kind,
            text: extracted.text,
            encoding: extracted.encoding,
            language,
        };
        self.enter(PipelineState::Ready);
        tracing::info!(
            file = %document.filename,
            kind = document.kind.as_str(),
            chars = document.text_chars(),
            language = %document.language.code,
            "document ingested"
        );
        Ok(Ingested { document, warnings })
    }
}
