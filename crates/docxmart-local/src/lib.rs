//! Local implementations for docxmart: in-process extraction and detection, plus an
//! HTTP chat backend.

pub mod config;
pub mod encoding;
pub mod extract;
pub mod language;
pub mod openai_compat;
pub mod pipeline;
pub mod session;
pub mod textprep;

pub use pipeline::{IngestConfig, IngestPipeline, Ingested, PipelineState};
pub use session::{Notice, PromptOutcome, Session, SessionConfig, UploadReport};
