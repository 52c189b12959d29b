//! Parsing: pasted text → rectangular [`Table`].
//!
//! Spreadsheets put tabs between cells when copying, CSV files use commas and
//! hand-aligned listings use runs of spaces. The delimiter is inferred per
//! line, in that order of preference, so a paste mixing a tab-separated body
//! with a space-separated header still lines up.

use crate::error::Tab2TexError;
use ::csv::{ReaderBuilder, Trim};
use serde::Serialize;
use tracing::debug;

/// Cell separator detected on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Tab,
    Comma,
    Whitespace,
}

impl Delimiter {
    /// Tab wins over comma, comma over whitespace.
    pub fn infer(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }
}

/// Ordered rows of string cells, all of the same width.
///
/// Constructed only through [`parse`] or [`Table::from_rows`], both of which
/// pad short rows with empty cells. A `Table` always has at least one row and
/// one column.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    rows: Vec<Vec<String>>,
    #[serde(skip)]
    delimiters: Vec<Delimiter>,
}

// Two tables are equal when their cells are; how each line was delimited
// is parse bookkeeping.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Eq for Table {}

impl Table {
    /// Build a table from already-split rows, padding to the widest row.
    ///
    /// Returns [`Tab2TexError::EmptyInput`] when there is no row.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, Tab2TexError> {
        let delimiters = vec![Delimiter::Tab; rows.len()];
        Self::with_delimiters(rows, delimiters)
    }

    fn with_delimiters(
        mut rows: Vec<Vec<String>>,
        delimiters: Vec<Delimiter>,
    ) -> Result<Self, Tab2TexError> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            return Err(Tab2TexError::EmptyInput);
        }
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Ok(Self { rows, delimiters })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns shared by every row.
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Delimiter detected on each parsed line, in row order.
    pub fn delimiters(&self) -> &[Delimiter] {
        &self.delimiters
    }

    /// Iterate over the cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index).map(String::as_str))
    }
}

/// Parse pasted text into a [`Table`].
///
/// * Lines are split on `\n` (a trailing `\r` is ignored).
/// * Lines that are empty after trimming are skipped.
/// * Each line is split on its inferred [`Delimiter`]; every cell is
///   trimmed, quoted or not. The line itself is not trimmed first, so a
///   leading empty cell survives.
/// * Comma lines are read as RFC 4180 records, so `"a, b"` is one cell.
/// * Short rows are padded with empty cells to the widest row.
///
/// # Errors
/// [`Tab2TexError::EmptyInput`] when no non-blank line exists.
pub fn parse(input: &str) -> Result<Table, Tab2TexError> {
    let mut rows = Vec::new();
    let mut delimiters = Vec::new();

    for line in input.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        let delimiter = Delimiter::infer(line);
        let cells = match delimiter {
            Delimiter::Tab => line.split('\t').map(|c| c.trim().to_string()).collect(),
            Delimiter::Comma => split_csv_line(line)?,
            Delimiter::Whitespace => line.split_whitespace().map(str::to_string).collect(),
        };
        rows.push(cells);
        delimiters.push(delimiter);
    }

    let table = Table::with_delimiters(rows, delimiters)?;
    debug!(
        "Parsed {} rows × {} columns",
        table.height(),
        table.width()
    );
    Ok(table)
}

/// Read one comma line as a CSV record with trimmed fields.
fn split_csv_line(line: &str) -> Result<Vec<String>, Tab2TexError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => {
            let record =
                record.map_err(|e| Tab2TexError::Internal(format!("CSV read: {e}")))?;
            Ok(record.iter().map(str::to_string).collect())
        }
        None => Ok(vec![String::new()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(table: &Table) -> Vec<Vec<&str>> {
        table
            .rows()
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn tab_lines_split_on_tabs_only() {
        let t = parse("a b\tc\n1\t2").unwrap();
        assert_eq!(cells(&t), vec![vec!["a b", "c"], vec!["1", "2"]]);
        assert_eq!(t.delimiters(), &[Delimiter::Tab, Delimiter::Tab]);
    }

    #[test]
    fn comma_lines_trim_cells() {
        let t = parse(" x , y \n1,2").unwrap();
        assert_eq!(cells(&t), vec![vec!["x", "y"], vec!["1", "2"]]);
    }

    #[test]
    fn whitespace_runs_are_one_delimiter() {
        let t = parse("x    y  z\n1 2 3").unwrap();
        assert_eq!(cells(&t), vec![vec!["x", "y", "z"], vec!["1", "2", "3"]]);
        assert_eq!(t.delimiters()[0], Delimiter::Whitespace);
    }

    #[test]
    fn delimiter_is_inferred_per_line() {
        let t = parse("time value\n0\t1.5\n1,2.5").unwrap();
        assert_eq!(
            t.delimiters(),
            &[Delimiter::Whitespace, Delimiter::Tab, Delimiter::Comma]
        );
        assert_eq!(t.width(), 2);
    }

    #[test]
    fn short_rows_are_padded() {
        let t = parse("a,b,c\n1\n2,3").unwrap();
        assert_eq!(
            cells(&t),
            vec![vec!["a", "b", "c"], vec!["1", "", ""], vec!["2", "3", ""]]
        );
    }

    #[test]
    fn blank_lines_and_crlf_are_skipped() {
        let t = parse("\r\n  \na,b\r\n\n\t\n1,2\r\n").unwrap();
        assert_eq!(cells(&t), vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn leading_empty_cell_is_kept() {
        let t = parse("\tB\tC\nx\t1\t2").unwrap();
        assert_eq!(cells(&t)[0], vec!["", "B", "C"]);
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(parse(""), Err(Tab2TexError::EmptyInput)));
        assert!(matches!(parse(" \n\t\r\n"), Err(Tab2TexError::EmptyInput)));
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let t = parse(r#"name,"a, b","say ""hi""",plain"#).unwrap();
        assert_eq!(
            cells(&t),
            vec![vec!["name", "a, b", r#"say "hi""#, "plain"]]
        );
    }

    #[test]
    fn quoted_fields_are_trimmed_too() {
        let t = parse(r#"" padded ",x"#).unwrap();
        assert_eq!(cells(&t), vec![vec!["padded", "x"]]);
    }

    #[test]
    fn lone_comma_gives_two_empty_cells() {
        let t = parse("a,b
,").unwrap();
        assert_eq!(cells(&t)[1], vec!["", ""]);
    }

    #[test]
    fn column_iterates_top_to_bottom() {
        let t = parse("a,b\n1,2\n3,4").unwrap();
        assert_eq!(t.column(1).collect::<Vec<_>>(), vec!["b", "2", "4"]);
        assert_eq!(t.column(5).count(), 0);
    }

    #[test]
    fn from_rows_pads_and_rejects_empty() {
        let t = Table::from_rows(vec![vec!["a".into()], vec!["b".into(), "c".into()]]).unwrap();
        assert_eq!(t.width(), 2);
        assert!(matches!(
            Table::from_rows(vec![]),
            Err(Tab2TexError::EmptyInput)
        ));
        assert!(matches!(
            Table::from_rows(vec![vec![]]),
            Err(Tab2TexError::EmptyInput)
        ));
    }
}
