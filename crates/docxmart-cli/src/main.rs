use anyhow::Result;
use clap::{Parser, Subcommand};
use docxmart_core::{ChatBackend, NormalizedDocument, UploadedDocument};
use docxmart_local::openai_compat::{self, OpenAiCompatClient};
use docxmart_local::{extract, PromptOutcome, Session, SessionConfig, UploadReport};
use std::path::{Path, PathBuf};
mod chat;

#[derive(Parser, Debug)]
#[command(name = "docxmart")]
#[command(about = "Ask questions about a document (txt, md, pdf, docx)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract text from a document and detect its language (no chat call).
    Ingest(IngestCmd),
    /// Ingest a document, then ask one question about it.
    Ask(AskCmd),
    /// Interactive session over stdin (`:upload <path>`, `:history`, `:quit`).
    Chat(ChatCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct IngestCmd {
    /// Document to ingest.
    file: PathBuf,
    /// Declared MIME type (default: derived from the extension).
    #[arg(long)]
    mime: Option<String>,
    /// Include the full extracted text in the output.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    include_text: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    /// Document to ask about.
    file: PathBuf,
    /// The question.
    #[arg(long, short)]
    prompt: String,
    #[arg(long)]
    mime: Option<String>,
    /// Model identifier.
    #[arg(long, env = "DOCXMART_MODEL")]
    model: Option<String>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ChatCmd {
    /// Optional document to upload before the first prompt.
    pub(crate) file: Option<PathBuf>,
    #[arg(long, env = "DOCXMART_MODEL")]
    pub(crate) model: Option<String>,
    /// Output format: text|json (json emits one event per line).
    #[arg(long = "output", alias = "format", default_value = "text")]
    pub(crate) output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

pub(crate) fn is_text_output(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("text")
}

/// Read a file into an upload, deriving the MIME type from the extension when not given.
pub(crate) fn read_upload(path: &Path, mime: Option<String>) -> Result<UploadedDocument> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mut upload = UploadedDocument::new(filename, mime, bytes);
    if upload.mime_type.is_none() {
        upload.mime_type = upload
            .extension()
            .and_then(|e| extract::mime_for_extension(&e))
            .map(str::to_string);
    }
    Ok(upload)
}

pub(crate) fn document_json(doc: &NormalizedDocument, include_text: bool) -> serde_json::Value {
    let mut v = serde_json::json!({
        "filename": doc.filename,
        "kind": doc.kind.as_str(),
        "encoding": doc.encoding.as_ref().and_then(|g| g.encoding.clone()),
        "encoding_confidence": doc.encoding.as_ref().map(|g| g.confidence),
        "language_code": doc.language.code,
        "language_name": doc.language.name,
        "text_chars": doc.text_chars(),
    });
    if include_text {
        v["text"] = serde_json::Value::String(doc.text.clone());
    }
    v
}

pub(crate) fn upload_json(
    report: &UploadReport,
    doc: Option<&NormalizedDocument>,
    include_text: bool,
) -> serde_json::Value {
    let ok = !report.notice.is_error();
    let document = if ok {
        doc.map(|d| document_json(d, include_text))
    } else {
        None
    };
    serde_json::json!({
        "schema_version": 1,
        "kind": "ingest",
        "ok": ok,
        "notice": report.notice,
        "state": report.state,
        "warnings": report.warnings,
        "document": document,
    })
}

pub(crate) fn document_text_summary(doc: &NormalizedDocument) -> String {
    let enc = match &doc.encoding {
        Some(g) => format!(
            ", {} @ {:.2}",
            g.encoding.as_deref().unwrap_or("?"),
            g.confidence
        ),
        None => String::new(),
    };
    format!(
        "file: {} ({}{enc})\nlanguage: {} ({})\nchars: {}",
        doc.filename,
        doc.kind.as_str(),
        doc.language.name,
        doc.language.code,
        doc.text_chars()
    )
}

pub(crate) fn chat_backend(model: Option<String>) -> docxmart_core::Result<Box<dyn ChatBackend>> {
    let client = OpenAiCompatClient::from_env(reqwest::Client::new(), model)?;
    tracing::debug!(base_url = client.base_url(), model = client.model(), "chat backend ready");
    Ok(Box::new(client))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional env-file loader (opt-in). Never overrides the process env.
    if let Some(p) = docxmart_local::config::env("DOCXMART_ENV_FILE") {
        if let Err(e) = docxmart_local::config::load_env_file(Path::new(&p)) {
            eprintln!("docxmart: could not read DOCXMART_ENV_FILE ({p}): {e}");
        }
    }
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest(args) => {
            let upload = read_upload(&args.file, args.mime)?;
            let mut session = Session::new(SessionConfig::from_env());
            let report = session.upload(upload);
            let ok = !report.notice.is_error();
            if is_text_output(&args.output) {
                println!("docxmart ingest: {}", report.notice.message());
                if let Some(doc) = session.document() {
                    println!("{}", document_text_summary(doc));
                    if args.include_text {
                        println!("---\n{}", doc.text);
                    }
                }
                for w in &report.warnings {
                    println!("warning: {w}");
                }
            } else {
                println!(
                    "{}",
                    upload_json(&report, session.document(), args.include_text)
                );
            }
            if !ok {
                anyhow::bail!("{}", report.notice.message());
            }
        }
        Commands::Ask(args) => {
            let upload = read_upload(&args.file, args.mime)?;
            let mut session = Session::new(SessionConfig::from_env());
            let report = session.upload(upload);
            if report.notice.is_error() {
                if !is_text_output(&args.output) {
                    println!("{}", upload_json(&report, None, false));
                }
                anyhow::bail!("{}", report.notice.message());
            }
            let backend = chat_backend(args.model).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let outcome = session.submit_prompt(&args.prompt, backend.as_ref()).await;
            let (ok, reply, notice) = match &outcome {
                PromptOutcome::Answered(r) => (true, Some(r.clone()), None),
                PromptOutcome::Rejected(n) | PromptOutcome::Failed(n) => (false, None, Some(n)),
            };
            if is_text_output(&args.output) {
                match (&reply, notice) {
                    (Some(r), _) => println!("{r}"),
                    (None, Some(n)) => println!("{}: {}", n.level(), n.message()),
                    (None, None) => {}
                }
            } else {
                let doc = session.document().map(|d| document_json(d, false));
                let v = serde_json::json!({
                    "schema_version": 1,
                    "kind": "ask",
                    "ok": ok,
                    "reply": reply,
                    "notice": notice,
                    "document": doc,
                    "turns": session.turns(),
                });
                println!("{v}");
            }
            if let Some(n) = notice {
                anyhow::bail!("{}", n.message());
            }
        }
        Commands::Chat(args) => {
            chat::run(args).await?;
        }
        Commands::Doctor(args) => {
            let cfg = SessionConfig::from_env();
            let api_key = openai_compat::api_key_from_env().is_some();
            let base_url = openai_compat::base_url_from_env();
            let chat_ready = chat_backend(None).is_ok();
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": true,
                "name": "docxmart",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "api_key": api_key,
                    "chat_ready": chat_ready,
                    "base_url": base_url,
                    "model": openai_compat::model_from_env(),
                    "timeout_ms": openai_compat::timeout_ms_from_env(),
                    "max_context_chars": cfg.max_context_chars,
                    "min_encoding_confidence": cfg.ingest.encoding.min_confidence,
                    "language_sample_chars": cfg.ingest.language_sample_chars,
                },
                "accepted_extensions": extract::ACCEPTED_EXTENSIONS,
            });
            if is_text_output(&args.output) {
                println!("docxmart {}", env!("CARGO_PKG_VERSION"));
                println!("api_key: {}", if api_key { "set" } else { "missing" });
                println!("chat_ready: {chat_ready}");
                println!("base_url: {base_url}");
                println!("model: {}", openai_compat::model_from_env());
                println!("max_context_chars: {}", cfg.max_context_chars);
            } else {
                println!("{v}");
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "docxmart",
                "version": env!("CARGO_PKG_VERSION"),
            });
            if is_text_output(&args.output) {
                println!("docxmart {}", env!("CARGO_PKG_VERSION"));
            } else {
                println!("{v}");
            }
        }
    }

    Ok(())
}
