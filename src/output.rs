//! Result types returned by the typed conversion API.

use crate::config::OutputTarget;
use crate::pipeline::format::is_numeric;
use crate::pipeline::parse::{Delimiter, Table};
use crate::pipeline::regression::RegressionReport;
use crate::pipeline::tikz::detect_header;
use serde::Serialize;

/// Generated artifact plus what was learned about the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionOutput {
    pub target: OutputTarget,
    /// LaTeX, CSV or PGFPlots source.
    pub content: String,
    pub table: TableInfo,
    /// One report per value column when a trend model was configured.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regressions: Vec<RegressionReport>,
}

/// Shape of a parsed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: usize,
    /// First row reads as column titles.
    pub has_header: bool,
    pub numeric_cells: usize,
    pub empty_cells: usize,
    /// Lines split on tabs, commas and whitespace respectively.
    pub tab_lines: usize,
    pub comma_lines: usize,
    pub whitespace_lines: usize,
}

impl TableInfo {
    pub fn from_table(table: &Table) -> Self {
        let cells = table.rows().iter().flatten();
        let count = |d: Delimiter| table.delimiters().iter().filter(|x| **x == d).count();
        Self {
            rows: table.height(),
            columns: table.width(),
            has_header: detect_header(table).is_some(),
            numeric_cells: cells.clone().filter(|c| is_numeric(c)).count(),
            empty_cells: cells.filter(|c| c.is_empty()).count(),
            tab_lines: count(Delimiter::Tab),
            comma_lines: count(Delimiter::Comma),
            whitespace_lines: count(Delimiter::Whitespace),
        }
    }
}
