//! # tab2tex
//!
//! Turn tabular text pasted from a spreadsheet into LaTeX tables, CSV and
//! PGFPlots charts.
//!
//! ## Why this crate?
//!
//! Copying a range out of Excel or LibreOffice yields tab-separated text;
//! getting it into a paper means retyping it as `a & b \\` rows, escaping
//! every `%` and `_`, and rounding numbers by hand. This crate does that in
//! one pure function call, and can optionally hand the result to a remote
//! TeX Live service to check that it compiles.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pasted text
//!  │
//!  ├─ 1. Parse    infer tab / comma / whitespace per line, pad rows
//!  ├─ 2. Format   round numbers (decimals, sig figs, scientific)
//!  ├─ 3. Render   tabular · CSV · PGFPlots figure (+ trend lines)
//!  └─ 4. Preview  wrap in a document, compile remotely (optional, async)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tab2tex::{convert, ConversionConfig, NumberFormat};
//!
//! let config = ConversionConfig::builder()
//!     .number_format(NumberFormat::FixedDecimals(2))
//!     .build()?;
//! let output = convert("x\ty\n1\t3.14159", &config)?;
//! assert!(output.content.contains("1.00 & 3.14 \\\\"));
//! # Ok::<(), tab2tex::Tab2TexError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tab2tex` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tab2tex = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compile;
pub mod config;
pub mod convert;
pub mod document;
pub mod download;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compile::{compile, CompileOutput};
pub use config::{
    CompileConfig, CompileConfigBuilder, ConversionConfig, ConversionConfigBuilder, Engine,
    LegendPosition, NumberFormat, OutputTarget, RegressionModel, ReturnFormat, ScaleMode,
};
pub use convert::{
    convert, convert_to_file, gen_all_regressions, gen_csv, gen_csv_rounded, gen_csv_sig_figs,
    gen_latex, gen_latex_rounded, gen_latex_sig_figs, gen_regression, gen_regression_comparison,
    gen_tikz_graph, gen_tikz_graph_preview, gen_tikz_graph_with_regression,
    gen_tikz_graph_with_regression_preview, inspect, preview_pdf, read_input,
};
pub use document::TexDirectives;
pub use download::save_csv_download;
pub use error::Tab2TexError;
pub use output::{ConversionOutput, TableInfo};
pub use pipeline::parse::{parse, Table};
