//! Interactive session over stdin.
//!
//! One process is one session: the `Session` is built before the first line is read and
//! dropped when stdin closes or `:quit` is entered.

use crate::{
    chat_backend, document_text_summary, is_text_output, read_upload, upload_json, ChatCmd,
};
use docxmart_core::{ChatBackend, ChatTurn};
use docxmart_local::{Notice, PromptOutcome, Session, SessionConfig};
use std::io::BufRead;
use std::path::Path;

enum Line<'a> {
    Upload(&'a str),
    History,
    Document,
    Quit,
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    let t = line.trim();
    let Some(cmd) = t.strip_prefix(':') else {
        return Line::Prompt(t);
    };
    let (name, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
    match name {
        "upload" | "u" => Line::Upload(rest.trim()),
        "history" | "h" => Line::History,
        "document" | "doc" => Line::Document,
        "quit" | "q" | "exit" => Line::Quit,
        _ => Line::Unknown(name),
    }
}

struct Printer {
    json: bool,
}

impl Printer {
    fn turn(&self, turn: &ChatTurn) {
        if self.json {
            println!(
                "{}",
                serde_json::json!({ "event": "turn", "role": turn.role, "content": turn.content })
            );
        } else {
            println!("{}> {}", turn.role.as_str(), turn.content);
        }
    }

    fn notice(&self, notice: &Notice) {
        if self.json {
            println!("{}", serde_json::json!({ "event": "notice", "notice": notice }));
        } else {
            println!("[{}] {}", notice.level(), notice.message());
        }
    }
}

fn upload(session: &mut Session, printer: &Printer, path: &str) {
    if path.is_empty() {
        printer.notice(&Notice::Warning("usage: :upload <path>".to_string()));
        return;
    }
    let upload = match read_upload(Path::new(path), None) {
        Ok(u) => u,
        Err(e) => {
            printer.notice(&Notice::Error(e.to_string()));
            return;
        }
    };
    let report = session.upload(upload);
    if printer.json {
        println!(
            "{}",
            serde_json::json!({
                "event": "upload",
                "result": upload_json(&report, session.document(), false),
            })
        );
        return;
    }
    printer.notice(&report.notice);
    if !report.notice.is_error() {
        if let Some(doc) = session.document() {
            println!("{}", document_text_summary(doc));
        }
    }
    for w in &report.warnings {
        println!("warning: {w}");
    }
}

async fn prompt(session: &mut Session, printer: &Printer, backend: &dyn ChatBackend, text: &str) {
    match session.submit_prompt(text, backend).await {
        PromptOutcome::Answered(reply) => printer.turn(&ChatTurn::assistant(reply)),
        PromptOutcome::Rejected(n) | PromptOutcome::Failed(n) => printer.notice(&n),
    }
}

/// Backend used when none could be configured: prompts still go through the session's
/// gating, and calls fail with the configuration error.
struct Unconfigured(String);

#[async_trait::async_trait]
impl ChatBackend for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn complete(&self, _context_text: &str, _prompt: &str) -> docxmart_core::Result<String> {
        Err(docxmart_core::Error::NotConfigured(self.0.clone()))
    }
}

pub(crate) async fn run(args: ChatCmd) -> anyhow::Result<()> {
    let printer = Printer {
        json: !is_text_output(&args.output),
    };
    let backend: Box<dyn ChatBackend> = match chat_backend(args.model.clone()) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "chat backend unavailable; uploads still work");
            Box::new(Unconfigured(e.to_string()))
        }
    };

    let mut session = Session::new(SessionConfig::from_env());
    for turn in session.turns() {
        printer.turn(turn);
    }
    if let Some(file) = &args.file {
        upload(&mut session, &printer, &file.to_string_lossy());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_line(&line) {
            Line::Prompt("") => continue,
            Line::Prompt(text) => prompt(&mut session, &printer, backend.as_ref(), text).await,
            Line::Upload(path) => upload(&mut session, &printer, path),
            Line::History => {
                for turn in session.turns() {
                    printer.turn(turn);
                }
            }
            Line::Document => match session.document() {
                Some(doc) if printer.json => println!(
                    "{}",
                    serde_json::json!({ "event": "document", "document": crate::document_json(doc, false) })
                ),
                Some(doc) => println!("{}", document_text_summary(doc)),
                None => printer.notice(&Notice::Warning("no document uploaded".to_string())),
            },
            Line::Quit => break,
            Line::Unknown(name) => {
                printer.notice(&Notice::Warning(format!("unknown command :{name}")))
            }
        }
    }

    let turns = session.end();
    tracing::debug!(turns = turns.len(), "chat finished");
    Ok(())
}
