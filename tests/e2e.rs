//! End-to-end integration tests for tab2tex.
//!
//! Library flows run fully offline. The compile-service tests talk to a
//! one-shot HTTP stub bound to 127.0.0.1, so no network access is needed.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use std::time::Duration;
use tab2tex::compile::{compile, CompileOutput};
use tab2tex::{
    convert, convert_to_file, gen_tikz_graph_with_regression, inspect, parse, preview_pdf,
    save_csv_download, CompileConfig, ConversionConfig, Engine, NumberFormat, OutputTarget,
    RegressionModel, ReturnFormat, ScaleMode, Tab2TexError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SPREADSHEET_PASTE: &str = "time_s\tdistance_m\tspeed_m/s\n\
                                 0\t0\t0\n\
                                 1\t4.9\t9.8\n\
                                 2\t19.6\t19.6\n\
                                 3\t44.1\t29.4\n";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Canned answer of the stub compile service.
struct StubResponse {
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    /// Hold the connection open this long before answering.
    delay: Duration,
}

impl StubResponse {
    fn new(status: &'static str, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }
}

/// Serve exactly one request; the raw request text is sent back through the
/// returned channel.
async fn spawn_stub(response: StubResponse) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = tx.send(request);

        tokio::time::sleep(response.delay).await;
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            response.status,
            response.content_type,
            response.body.len()
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&response.body).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{addr}/cgi-bin/latexcgi"), rx)
}

/// Read headers, then the body by Content-Length or until the multipart
/// closing boundary.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let headers = text[..header_end].to_ascii_lowercase();
            let body_len = buf.len() - header_end - 4;
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let done = match content_length {
                Some(len) => body_len >= len,
                None => text.ends_with("--\r\n") || text.ends_with("0\r\n\r\n"),
            };
            if done {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn compile_config(endpoint: &str) -> CompileConfig {
    CompileConfig::builder()
        .endpoint(endpoint)
        .timeout_secs(10)
        .build()
        .unwrap()
}

// ── Library flows ────────────────────────────────────────────────────────────

#[test]
fn test_paste_to_rounded_latex_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/table.tex");
    let config = ConversionConfig::builder()
        .number_format(NumberFormat::FixedDecimals(1))
        .build()
        .unwrap();

    let info = convert_to_file(SPREADSHEET_PASTE, &path, &config).unwrap();
    assert_eq!((info.rows, info.columns), (5, 3));

    let tex = std::fs::read_to_string(&path).unwrap();
    assert!(tex.starts_with("\\begin{tabular}{ccc}\n\\hline\n"));
    assert!(tex.contains("time\\_s & distance\\_m & speed\\_m/s \\\\"));
    assert!(tex.contains("1.0 & 4.9 & 9.8 \\\\"));
    assert!(tex.ends_with("\\hline\n\\end{tabular}"));
    assert!(!dir.path().join("out/table.tex.tmp").exists());
}

#[test]
fn test_chart_with_header_and_trend() {
    let config = ConversionConfig::builder()
        .target(OutputTarget::Tikz)
        .data_filename("fall.csv")
        .trend(Some(RegressionModel::Power))
        .build()
        .unwrap();
    let out = convert(SPREADSHEET_PASTE, &config).unwrap();

    assert!(out.content.contains("xlabel={time\\_s},"));
    assert!(out.content.contains("table [col sep=comma, x index=0, y index=2] {fall.csv};"));
    assert!(out.content.contains("\\addlegendentry{speed\\_m/s}"));
    assert_eq!(out.content.matches("dashed]").count(), 2);
    assert_eq!(out.regressions.len(), 2);
    assert!(out.regressions.iter().all(|r| r.valid));

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["target"], "tikz");
    assert_eq!(json["table"]["has_header"], true);
}

#[test]
fn test_string_api_matches_typed_api() {
    let via_strings =
        gen_tikz_graph_with_regression(SPREADSHEET_PASTE, "data", 3, "south east", "linear", "linear")
            .unwrap();
    let config = ConversionConfig::builder()
        .target(OutputTarget::Tikz)
        .legend_position("south east".parse().unwrap())
        .scale_mode(ScaleMode::Linear)
        .trend(Some(RegressionModel::Linear))
        .build()
        .unwrap();
    assert_eq!(via_strings, convert(SPREADSHEET_PASTE, &config).unwrap().content);
}

#[test]
fn test_csv_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConversionConfig::builder()
        .target(OutputTarget::Csv)
        .build()
        .unwrap();
    let csv = convert("name,note\nalpha,\"a, b\"\nbeta,plain", &config)
        .unwrap()
        .content;

    let path = save_csv_download(dir.path(), &csv).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    let without_bom = saved.strip_prefix('\u{feff}').unwrap();
    assert_eq!(without_bom, csv);
    assert_eq!(parse(without_bom).unwrap().rows()[1][1], "a, b");
}

#[test]
fn test_errors_are_user_facing() {
    let chart = ConversionConfig::builder()
        .target(OutputTarget::TikzPreview)
        .build()
        .unwrap();
    let one_column = convert("1\n2\n3", &chart).unwrap_err();
    assert!(matches!(one_column, Tab2TexError::TooFewColumns { columns: 1 }));
    assert!(one_column.to_string().contains("at least 2 columns"));

    assert!(matches!(
        inspect("\n\n"),
        Err(Tab2TexError::EmptyInput)
    ));
}

// ── Compile service ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preview_pdf_posts_form_and_returns_pdf() {
    let (endpoint, request) = spawn_stub(StubResponse::new(
        "200 OK",
        "application/pdf",
        b"%PDF-1.5\n%fake\n".to_vec(),
    ))
    .await;

    let config = ConversionConfig::builder()
        .target(OutputTarget::Tikz)
        .build()
        .unwrap();
    let pdf = preview_pdf(SPREADSHEET_PASTE, &config, &compile_config(&endpoint))
        .await
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /cgi-bin/latexcgi"));
    assert!(request.contains("name=\"filecontents[]\""));
    assert!(request.contains("name=\"filename[]\""));
    assert!(request.contains("document.tex"));
    assert!(request.contains("name=\"engine\"\r\n\r\nuplatex"));
    assert!(request.contains("name=\"return\"\r\n\r\npdf"));
    assert!(request.contains("\\pgfplotsset{compat=1.18}"));
    assert!(request.contains("coordinates {"));
}

#[tokio::test]
async fn test_compile_forwards_directives() {
    let (endpoint, request) =
        spawn_stub(StubResponse::new("200 OK", "application/pdf", b"%PDF-1.7".to_vec())).await;

    let source = "% !TEX lualatex\n% !TEX bibcmd biber\n% !TEX makeindex -s a.ist\n\\documentclass{article}\n";
    let out = compile(source, &compile_config(&endpoint)).await.unwrap();
    assert_eq!(out, CompileOutput::Pdf(b"%PDF-1.7".to_vec()));

    let request = request.await.unwrap();
    assert!(request.contains("name=\"engine\"\r\n\r\nlualatex"));
    assert!(request.contains("name=\"bibcmd\"\r\n\r\nbiber"));
    assert!(request.contains("name=\"makeindex[]\"\r\n\r\n-s a.ist"));
}

#[tokio::test]
async fn test_compiler_log_becomes_compile_failed() {
    let log = "This is e-upTeX\n! Undefined control sequence.\n<recently read> \\foo\nl.9 \\foo\nNo pages of output.\n";
    let (endpoint, _request) =
        spawn_stub(StubResponse::new("200 OK", "text/plain; charset=UTF-8", log)).await;

    let err = compile("\\foo", &compile_config(&endpoint))
        .await
        .unwrap_err();
    match &err {
        Tab2TexError::CompileFailed { excerpt, .. } => {
            assert_eq!(excerpt, "! Undefined control sequence.\nl.9 \\foo");
        }
        other => panic!("expected CompileFailed, got {other:?}"),
    }
    assert!(err.compile_log().unwrap().contains("e-upTeX"));
}

#[tokio::test]
async fn test_log_return_format_yields_text() {
    let (endpoint, _request) =
        spawn_stub(StubResponse::new("200 OK", "text/plain", "Output written")).await;
    let config = CompileConfig::builder()
        .endpoint(endpoint)
        .return_format(ReturnFormat::Log)
        .engine(Engine::PdfLatex)
        .build()
        .unwrap();
    let out = compile("x", &config).await.unwrap();
    assert_eq!(out, CompileOutput::Text("Output written".into()));
}

#[tokio::test]
async fn test_http_error_status() {
    let (endpoint, _request) =
        spawn_stub(StubResponse::new("503 Service Unavailable", "text/plain", "busy")).await;
    let err = compile("x", &compile_config(&endpoint)).await.unwrap_err();
    assert!(
        matches!(&err, Tab2TexError::CompileHttpStatus { status: 503, body } if body == "busy"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let mut slow = StubResponse::new("200 OK", "application/pdf", b"%PDF".to_vec());
    slow.delay = Duration::from_secs(5);
    let (endpoint, _request) = spawn_stub(slow).await;

    let config = CompileConfig::builder()
        .endpoint(endpoint)
        .timeout_secs(1)
        .build()
        .unwrap();
    let err = compile("x", &config).await.unwrap_err();
    assert!(
        matches!(err, Tab2TexError::CompileTimeout { secs: 1 }),
        "got {err:?}"
    );
}
