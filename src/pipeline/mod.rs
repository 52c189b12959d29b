//! Pipeline stages for table conversion.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//!                       ┌──▶ latex ──▶ tabular
//! text ──▶ parse ──▶ Table ──▶ csv   ──▶ comma-separated values
//!            (format)   └──▶ tikz  ──▶ PGFPlots figure / preview
//!                              ▲
//!                          regression
//! ```
//!
//! 1. [`parse`]: split pasted text into a rectangular [`parse::Table`]
//! 2. [`format`]: number rounding plus LaTeX and CSV escaping, per cell
//! 3. [`latex`], [`csv`]: render the table
//! 4. [`tikz`]: render a chart; column 0 is the x axis
//! 5. [`regression`]: least-squares trend lines used by charts and reports

pub mod csv;
pub mod format;
pub mod latex;
pub mod parse;
pub mod regression;
pub mod tikz;
