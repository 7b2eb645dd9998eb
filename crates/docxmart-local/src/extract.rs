use crate::encoding::{self, EncodingPolicy};
use docxmart_core::{DocumentKind, EncodingGuess, Error, Result, UploadedDocument};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Extensions the upload surface accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "pdf" => Some("application/pdf"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => None,
    }
}

fn content_type_lc_prefix(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Decide how an upload is extracted.
///
/// An extension outside `ACCEPTED_EXTENSIONS` is rejected; a name without one needs a declared
/// MIME type matching an accepted extension. Anything not recognizably PDF (by MIME,
/// extension, or magic) is treated as text, docx included.
pub fn kind_for(upload: &UploadedDocument) -> Result<DocumentKind> {
    let ext = upload.extension();
    let ct = content_type_lc_prefix(upload.mime_type.as_deref());
    match ext.as_deref() {
        Some(ext) if !ACCEPTED_EXTENSIONS.contains(&ext) => {
            return Err(Error::Unsupported(format!(
                "extension .{ext} (accepted: {})",
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }
        None if !ACCEPTED_EXTENSIONS
            .iter()
            .any(|e| mime_for_extension(e) == Some(ct.as_str())) =>
        {
            let declared = if ct.is_empty() { "none" } else { ct.as_str() };
            return Err(Error::Unsupported(format!(
                "{} has no extension and MIME type {declared} (accepted: {})",
                upload.filename,
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }
        _ => {}
    }
    if ct == "application/pdf" || ext.as_deref() == Some("pdf") || bytes_look_like_pdf(&upload.bytes)
    {
        return Ok(DocumentKind::Pdf);
    }
    Ok(DocumentKind::Text)
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub kind: DocumentKind,
    pub text: String,
    pub encoding: Option<EncodingGuess>,
    pub warnings: Vec<&'static str>,
}

/// Turn upload bytes into text, dispatching on the upload kind.
pub fn extract(upload: &UploadedDocument, policy: &EncodingPolicy) -> Result<ExtractedText> {
    match kind_for(upload)? {
        DocumentKind::Pdf => {
            let (text, warnings) = pdf_to_text(&upload.bytes)?;
            Ok(ExtractedText {
                kind: DocumentKind::Pdf,
                text,
                encoding: None,
                warnings,
            })
        }
        DocumentKind::Text => {
            let decoded = encoding::decode(&upload.bytes, policy)?;
            Ok(ExtractedText {
                kind: DocumentKind::Text,
                text: decoded.text,
                encoding: Some(decoded.guess),
                warnings: Vec::new(),
            })
        }
    }
}

/// Per-page text in page order. `None` marks a page whose text could not be extracted.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<Option<String>>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::Extraction(format!("unreadable pdf: {e}")))?;
    // `get_pages` is keyed by 1-based page number, so iteration is page order.
    let pages = doc.get_pages();
    let mut out = Vec::with_capacity(pages.len());
    for page_no in pages.keys() {
        match doc.extract_text(&[*page_no]) {
            Ok(t) => out.push(Some(t.trim().to_string())),
            Err(e) => {
                tracing::debug!(page = *page_no, error = %e, "pdf page text extraction failed");
                out.push(None);
            }
        }
    }
    Ok(out)
}

/// Whole-document text via `pdf-extract`, used when per-page extraction loses a page.
fn pdf_to_text_whole(bytes: &[u8]) -> std::result::Result<String, String> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(t)) => Ok(t.trim().to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked".to_string()),
    }
}

/// Extract the text of every page, joined by a single space.
///
/// Zero-page and image-only PDFs yield an empty string. Only a document that cannot be
/// opened at all is an error.
pub fn pdf_to_text(bytes: &[u8]) -> Result<(String, Vec<&'static str>)> {
    let pages = match catch_unwind(AssertUnwindSafe(|| pdf_pages(bytes))) {
        Ok(r) => r?,
        Err(_) => return Err(Error::Extraction("pdf parser panicked".to_string())),
    };
    let mut warnings: Vec<&'static str> = Vec::new();

    if pages.iter().any(Option::is_none) {
        warnings.push("pdf_page_text_failed");
        match pdf_to_text_whole(bytes) {
            Ok(text) => {
                warnings.push("pdf_extract_fallback_used");
                return Ok((text, warnings));
            }
            Err(e) => {
                tracing::debug!(error = %e, "pdf-extract fallback failed");
                warnings.push("pdf_extract_fallback_failed");
            }
        }
    }

    let text = pages
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join(" ");
    Ok((text, warnings))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>, bytes: &[u8]) -> UploadedDocument {
        UploadedDocument::new(name, mime.map(str::to_string), bytes.to_vec())
    }

    #[test]
    fn bytes_look_like_pdf_sniffs_magic_header() {
        assert!(bytes_look_like_pdf(b"%PDF-1.7\n%..."));
        assert!(!bytes_look_like_pdf(b"<!doctype html><html>"));
        assert!(!bytes_look_like_pdf(b""));
    }

    #[test]
    fn kind_dispatch_uses_mime_extension_and_magic() {
        let k = |u: UploadedDocument| kind_for(&u).unwrap();
        assert_eq!(k(upload("a.pdf", None, b"")), DocumentKind::Pdf);
        assert_eq!(
            k(upload("a", Some("application/pdf; charset=binary"), b"")),
            DocumentKind::Pdf
        );
        assert_eq!(k(upload("a.txt", Some("text/plain"), b"%PDF-1.4")), DocumentKind::Pdf);
        assert_eq!(k(upload("notes.md", Some("text/markdown"), b"# hi")), DocumentKind::Text);
        assert_eq!(k(upload("memo.docx", None, b"PK\x03\x04")), DocumentKind::Text);
        assert_eq!(k(upload("README", Some("text/plain"), b"hi")), DocumentKind::Text);
    }

    #[test]
    fn name_without_extension_needs_an_accepted_mime() {
        for mime in [None, Some("image/png"), Some("")] {
            let err = kind_for(&upload("README", mime, b"plain words")).unwrap_err();
            assert!(matches!(err, Error::Unsupported(_)), "mime={mime:?}");
            assert!(err.to_string().contains("README"));
        }
    }

    #[test]
    fn unaccepted_extensions_are_rejected() {
        let err = kind_for(&upload("photo.png", Some("image/png"), b"\x89PNG")).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(err.to_string().contains("png"));
    }

    #[test]
    fn text_uploads_decode_verbatim() {
        let src = "# Notes\n\nBonjour, comment allez-vous?\n";
        let ex = extract(&upload("n.md", None, src.as_bytes()), &EncodingPolicy::default()).unwrap();
        assert_eq!(ex.kind, DocumentKind::Text);
        assert_eq!(ex.text, src);
        assert_eq!(
            ex.encoding.and_then(|g| g.encoding).as_deref(),
            Some("UTF-8")
        );
    }

    #[test]
    fn docx_bytes_fall_back_to_text_and_fail_encoding() {
        let err = extract(
            &upload("memo.docx", None, b"PK\x03\x04\x14\x00\x06\x00\x08\x00\x00\x00!\x00"),
            &EncodingPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EncodingUndetected));
    }

    #[test]
    fn multi_page_pdf_joins_pages_with_single_spaces() {
        let bytes = test_pdf::build(&[Some("First page"), Some("Second page"), Some("Third")]);
        let pages = pdf_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 3);
        let expected = pages
            .iter()
            .map(|p| p.clone().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ");
        let (text, warnings) = pdf_to_text(&bytes).unwrap();
        assert!(warnings.is_empty(), "warnings={warnings:?}");
        assert_eq!(text, expected);
        assert_eq!(text, "First page Second page Third");
    }

    #[test]
    fn zero_page_pdf_is_empty_text() {
        let bytes = test_pdf::build(&[]);
        let (text, _warnings) = pdf_to_text(&bytes).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn image_only_pages_contribute_empty_text() {
        let bytes = test_pdf::build(&[None]);
        let (text, _warnings) = pdf_to_text(&bytes).unwrap();
        assert!(text.trim().is_empty());
    }

    #[test]
    fn malformed_pdf_is_an_extraction_error() {
        let err = pdf_to_text(b"%PDF-1.1\nnot actually a real pdf\n").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
