//! LaTeX `tabular` emission.

use crate::config::NumberFormat;
use crate::pipeline::format::{render_cell, CellTarget};
use crate::pipeline::parse::Table;

/// Emit a `tabular` environment with one centred column per table column.
///
/// ```text
/// \begin{tabular}{cc}
/// \hline
/// x & y \\
/// 1 & 2 \\
/// \hline
/// \end{tabular}
/// ```
pub fn generate_latex(table: &Table, mode: NumberFormat) -> String {
    let spec = "c".repeat(table.width());
    let mut out = format!("\\begin{{tabular}}{{{spec}}}\n\\hline\n");
    for row in table.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| render_cell(cell, mode, CellTarget::Latex))
            .collect();
        out.push_str(&cells.join(" & "));
        out.push_str(" \\\\\n");
    }
    out.push_str("\\hline\n\\end{tabular}");
    out
}
