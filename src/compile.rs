//! Remote LaTeX compilation.
//!
//! The document is POSTed as a multipart form to a `latexcgi`-style service
//! (texlive.net by default), which answers with either the PDF or the
//! compiler log. Requests are never retried: a preview that fails is shown
//! as failed, and the next request simply replaces it.

use crate::config::{CompileConfig, Engine, ReturnFormat};
use crate::document::TexDirectives;
use crate::error::Tab2TexError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name the source is uploaded under.
pub const SOURCE_FILENAME: &str = "document.tex";

/// Lines of log kept when no `!` error line is found.
const FALLBACK_TAIL_LINES: usize = 20;

/// Upper bound on excerpt length, in lines.
const MAX_EXCERPT_LINES: usize = 40;

/// Characters of an error-status body kept in the error.
const MAX_STATUS_BODY: usize = 500;

static LINE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^l\.\d+").expect("valid regex"));

/// What the service sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutput {
    /// PDF bytes.
    Pdf(Vec<u8>),
    /// Log or PDF.js page, when one was asked for via
    /// [`ReturnFormat::Log`] / [`ReturnFormat::PdfJs`].
    Text(String),
}

impl CompileOutput {
    pub fn into_pdf(self) -> Option<Vec<u8>> {
        match self {
            CompileOutput::Pdf(bytes) => Some(bytes),
            CompileOutput::Text(_) => None,
        }
    }
}

/// Engine for `source`: explicit override, else the magic comment or
/// package heuristics, else [`Engine::UpLatex`].
pub fn resolve_engine(source: &str, requested: Option<&Engine>) -> Engine {
    requested
        .cloned()
        .or_else(|| TexDirectives::scan(source).engine)
        .unwrap_or_default()
}

/// Build the multipart form the service expects.
pub fn build_form(source: &str, engine: &Engine, return_format: ReturnFormat) -> Form {
    let directives = TexDirectives::scan(source);
    let mut form = Form::new()
        .text("filecontents[]", source.to_string())
        .text("filename[]", SOURCE_FILENAME)
        .text("engine", engine.as_str().to_string())
        .text("return", return_format.as_str());
    if let Some(bib) = directives.bibcmd {
        form = form.text("bibcmd", bib);
    }
    if let Some(gloss) = directives.makeglossaries {
        form = form.text("makeglossaries", gloss);
    }
    for idx in directives.makeindex {
        form = form.text("makeindex[]", idx);
    }
    form
}

/// Compile a complete LaTeX document.
///
/// # Errors
/// * [`Tab2TexError::CompileRequestFailed`] when the service is unreachable
/// * [`Tab2TexError::CompileTimeout`] after `config.timeout_secs`
/// * [`Tab2TexError::CompileHttpStatus`] on a non-2xx answer
/// * [`Tab2TexError::CompileFailed`] when a PDF was requested but a log came
///   back
pub async fn compile(source: &str, config: &CompileConfig) -> Result<CompileOutput, Tab2TexError> {
    let engine = resolve_engine(source, config.engine.as_ref());
    info!(
        "Compiling {} bytes with {} via {}",
        source.len(),
        engine,
        config.endpoint
    );

    let request_failed = |e: reqwest::Error| {
        if e.is_timeout() {
            Tab2TexError::CompileTimeout {
                secs: config.timeout_secs,
            }
        } else {
            Tab2TexError::CompileRequestFailed {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(request_failed)?;

    let response = client
        .post(&config.endpoint)
        .multipart(build_form(source, &engine, config.return_format))
        .send()
        .await
        .map_err(request_failed)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await.map_err(request_failed)?;
    debug!(
        "Compile service answered {} ({:?}, {} bytes)",
        status,
        content_type,
        body.len()
    );

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        return Err(Tab2TexError::CompileHttpStatus {
            status: status.as_u16(),
            body: text.chars().take(MAX_STATUS_BODY).collect(),
        });
    }

    if is_pdf(content_type.as_deref(), &body) {
        info!("Received PDF ({} bytes)", body.len());
        return Ok(CompileOutput::Pdf(body.to_vec()));
    }

    let log = String::from_utf8_lossy(&body).into_owned();
    if config.return_format != ReturnFormat::Pdf {
        return Ok(CompileOutput::Text(log));
    }
    let excerpt = extract_log_excerpt(&log);
    warn!("LaTeX compilation failed");
    Err(Tab2TexError::CompileFailed { excerpt, log })
}

/// PDF by content type or by `%PDF` magic.
pub fn is_pdf(content_type: Option<&str>, body: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/pdf"))
        || body.starts_with(b"%PDF")
}

/// Key lines of a TeX log: every `!` error line plus the `l.<n>` line that
/// locates it. Falls back to the last non-empty lines when no error line
/// exists.
pub fn extract_log_excerpt(log: &str) -> String {
    let lines: Vec<&str> = log.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut picked: Vec<&str> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.starts_with('!') {
            continue;
        }
        picked.push(*line);
        if let Some(context) = lines[i + 1..]
            .iter()
            .take_while(|l| !l.starts_with('!'))
            .find(|l| LINE_NUMBER_RE.is_match(l))
        {
            picked.push(*context);
        }
        if picked.len() >= MAX_EXCERPT_LINES {
            break;
        }
    }

    if picked.is_empty() {
        let tail: Vec<&str> = lines
            .iter()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .take(FALLBACK_TAIL_LINES)
            .copied()
            .collect();
        picked = tail.into_iter().rev().collect();
    }
    picked.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "This is pdfTeX, Version 3.141592653\n\
                       (./document.tex\n\
                       ! Undefined control sequence.\n\
                       <recently read> \\foo\n\
                       \n\
                       l.7 \\foo\n\
                       \n\
                       ! Missing $ inserted.\n\
                       <inserted text>\n\
                       l.12 a_b\n\
                       No pages of output.\n";

    #[test]
    fn excerpt_pairs_errors_with_line_numbers() {
        assert_eq!(
            extract_log_excerpt(LOG),
            "! Undefined control sequence.\nl.7 \\foo\n! Missing $ inserted.\nl.12 a_b"
        );
    }

    #[test]
    fn excerpt_falls_back_to_tail() {
        let log = "line one\n\nline two\nline three\n\n";
        assert_eq!(extract_log_excerpt(log), "line one\nline two\nline three");
    }

    #[test]
    fn error_without_location_is_kept_alone() {
        let log = "! Emergency stop.\n! Another.\nl.3 x";
        assert_eq!(extract_log_excerpt(log), "! Emergency stop.\n! Another.\nl.3 x");
    }

    #[test]
    fn pdf_detection() {
        assert!(is_pdf(Some("application/pdf"), b""));
        assert!(is_pdf(Some("Application/PDF; charset=binary"), b""));
        assert!(is_pdf(Some("application/octet-stream"), b"%PDF-1.5"));
        assert!(!is_pdf(Some("text/plain"), b"This is pdfTeX"));
        assert!(!is_pdf(None, b""));
    }

    #[test]
    fn engine_resolution_order() {
        let src = "% !TEX xelatex\n";
        assert_eq!(resolve_engine(src, Some(&Engine::PdfLatex)), Engine::PdfLatex);
        assert_eq!(resolve_engine(src, None), Engine::XeLatex);
        assert_eq!(resolve_engine("plain", None), Engine::UpLatex);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_failure() {
        let config = CompileConfig::builder()
            .endpoint("http://127.0.0.1:9/latexcgi")
            .timeout_secs(5)
            .build()
            .unwrap();
        let err = compile("x", &config).await.unwrap_err();
        assert!(
            matches!(
                err,
                Tab2TexError::CompileRequestFailed { .. } | Tab2TexError::CompileTimeout { .. }
            ),
            "got {err:?}"
        );
    }
}
