//! CSV emission.

use crate::config::NumberFormat;
use crate::error::Tab2TexError;
use crate::pipeline::format::{render_cell, CellTarget};
use crate::pipeline::parse::Table;
use ::csv::{QuoteStyle, Terminator, WriterBuilder};

/// Emit comma-joined rows separated by `\n`, quoting fields only when they
/// contain a comma, quote or line break.
///
/// There is no trailing newline; the download writer adds none either, which
/// keeps `pgfplots` from reading a phantom empty row.
pub fn generate_csv(table: &Table, mode: NumberFormat) -> Result<String, Tab2TexError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| render_cell(cell, mode, CellTarget::Csv)))
            .map_err(|e| Tab2TexError::Internal(format!("CSV write: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Tab2TexError::Internal(format!("CSV flush: {}", e.error())))?;
    let mut out = String::from_utf8(bytes)
        .map_err(|e| Tab2TexError::Internal(format!("CSV encoding: {e}")))?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}
