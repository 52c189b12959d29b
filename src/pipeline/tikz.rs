//! PGFPlots chart generation.
//!
//! Column 0 is the key (x) column; every further column becomes one
//! `\addplot`. Two flavours share the same axis setup:
//!
//! * [`generate_tikz`] emits a `figure` whose plots read `<filename>.csv`,
//!   meant to be pasted into a document next to the downloaded CSV.
//! * [`generate_tikz_preview`] emits a bare `tikzpicture` with the data
//!   inlined as `coordinates {…}`, so it compiles on its own.

use crate::config::{
    ConversionConfig, LegendPosition, RegressionModel, ScaleMode, DEFAULT_TICK_PRECISION,
    MAX_TICK_PRECISION,
};
use crate::error::Tab2TexError;
use crate::pipeline::format::{escape_latex, is_numeric, parse_number};
use crate::pipeline::parse::Table;
use crate::pipeline::regression::{self, Fit};
use tracing::{debug, warn};

/// Chart options independent of where the data comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    /// Tick label precision; values below 1 mean [`DEFAULT_TICK_PRECISION`],
    /// values above [`MAX_TICK_PRECISION`] are clamped.
    pub tick_precision: u32,
    pub legend_position: LegendPosition,
    pub scale_mode: ScaleMode,
    /// When set, plots become marks-only and each gets a dashed fit line.
    pub trend: Option<RegressionModel>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            tick_precision: DEFAULT_TICK_PRECISION,
            legend_position: LegendPosition::default(),
            scale_mode: ScaleMode::default(),
            trend: None,
        }
    }
}

impl From<&ConversionConfig> for ChartOptions {
    fn from(c: &ConversionConfig) -> Self {
        Self {
            tick_precision: c.tick_precision,
            legend_position: c.legend_position,
            scale_mode: c.scale_mode,
            trend: c.trend,
        }
    }
}

/// Where `\addplot` takes its points from.
enum PlotSource<'a> {
    File(&'a str),
    Inline,
}

/// Indentation of the two output flavours.
struct Indent {
    base: &'static str,
    unit: &'static str,
}

impl Indent {
    fn at(&self, level: usize) -> String {
        format!("{}{}", self.base, self.unit.repeat(level))
    }
}

const FIGURE_INDENT: Indent = Indent {
    base: "    ",
    unit: "    ",
};
const PREVIEW_INDENT: Indent = Indent {
    base: "",
    unit: "  ",
};

/// Figure referencing `<filename>.csv`.
///
/// # Errors
/// [`Tab2TexError::TooFewColumns`] below two columns,
/// [`Tab2TexError::NoNumericData`] when the key column or every value column
/// lacks a plottable number.
pub fn generate_tikz(
    table: &Table,
    options: &ChartOptions,
    filename: &str,
) -> Result<String, Tab2TexError> {
    let picture = render_picture(table, options, PlotSource::File(filename), &FIGURE_INDENT)?;
    let mut out = String::from("\\begin{figure}[H]\n    \\centering\n");
    out.push_str(&picture);
    out.push_str("    \\caption{Caption}\n");
    out.push_str("    \\label{fig:label}\n");
    out.push_str("\\end{figure}\n");
    Ok(out)
}

/// Self-contained `tikzpicture` with inline coordinates.
pub fn generate_tikz_preview(table: &Table, options: &ChartOptions) -> Result<String, Tab2TexError> {
    render_picture(table, options, PlotSource::Inline, &PREVIEW_INDENT)
}

/// First row, when it reads as column titles: some cell is non-empty and
/// not a number.
pub fn detect_header(table: &Table) -> Option<&[String]> {
    let first = table.rows().first()?;
    first
        .iter()
        .any(|c| !c.is_empty() && !is_numeric(c))
        .then_some(first.as_slice())
}

// ── Axis limits ──────────────────────────────────────────────────────────

/// Limits (and explicit ticks on linear axes) of one axis.
#[derive(Debug, Clone, PartialEq)]
struct AxisLimits {
    min: f64,
    max: f64,
    min_label: String,
    max_label: String,
    ticks: Option<Vec<f64>>,
}

/// `⌊min⌋ … ⌊max⌋+1`, ticked every `max(1, ⌊span/5⌋)`.
///
/// Computed in `f64` throughout: cells like `6.02e23` are valid input. Past
/// 2^53 `⌊max⌋+1` no longer moves, so the upper limit is then nudged by a
/// relative amount instead.
fn linear_limits(min: f64, max: f64) -> AxisLimits {
    let lo = min.floor();
    let mut hi = max.floor() + 1.0;
    if hi <= lo {
        hi = lo + (lo.abs() * 1e-12).max(1.0);
    }
    let span = hi - lo;
    let ticks = if span.is_finite() {
        let step = (span / 5.0).floor().max(1.0);
        // At most ten steps for any finite span.
        let count = (span / step).floor() as usize;
        (0..=count).map(|k| lo + step * k as f64).collect()
    } else {
        vec![lo, hi]
    };
    AxisLimits {
        min: lo,
        max: hi,
        min_label: number_label(lo),
        max_label: number_label(hi),
        ticks: Some(ticks),
    }
}

/// Whole numbers print plainly up to 1e15, in exponent form beyond.
fn number_label(value: f64) -> String {
    let value = value + 0.0;
    if value.abs() < 1e15 {
        format!("{value}")
    } else {
        format!("{value:e}")
    }
}

/// Whole decades around the positive values; `None` when there are none.
fn log_limits(values: &[f64]) -> Option<AxisLimits> {
    let (min, max) = bounds(values.iter().copied().filter(|v| *v > 0.0))?;
    let lo = min.log10().floor() as i32;
    let mut hi = max.log10().ceil() as i32;
    if hi <= lo {
        hi = lo + 1;
    }
    Some(AxisLimits {
        min: 10f64.powi(lo),
        max: 10f64.powi(hi),
        min_label: format!("1e{lo}"),
        max_label: format!("1e{hi}"),
        ticks: None,
    })
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn axis_limits(values: &[f64], log: bool, column: usize) -> Result<AxisLimits, Tab2TexError> {
    let limits = if log {
        log_limits(values)
    } else {
        bounds(values.iter().copied()).map(|(lo, hi)| linear_limits(lo, hi))
    };
    limits.ok_or(Tab2TexError::NoNumericData { column })
}

// ── Rendering ────────────────────────────────────────────────────────────

fn render_picture(
    table: &Table,
    options: &ChartOptions,
    source: PlotSource<'_>,
    indent: &Indent,
) -> Result<String, Tab2TexError> {
    let width = table.width();
    if width < 2 {
        return Err(Tab2TexError::TooFewColumns { columns: width });
    }
    let precision = if options.tick_precision < 1 {
        DEFAULT_TICK_PRECISION
    } else {
        options.tick_precision.min(MAX_TICK_PRECISION)
    };

    let header = detect_header(table);
    let data = &table.rows()[usize::from(header.is_some())..];

    let xs: Vec<f64> = data.iter().filter_map(|r| parse_number(&r[0])).collect();
    let ys: Vec<f64> = data
        .iter()
        .flat_map(|r| r[1..].iter().filter_map(|c| parse_number(c)))
        .collect();
    let x_limits = axis_limits(&xs, options.scale_mode.x_is_log(), 0)?;
    let y_limits = axis_limits(&ys, options.scale_mode.y_is_log(), 1)?;
    debug!(
        "Chart: {} series, x {}..{}, y {}..{}",
        width - 1,
        x_limits.min_label,
        x_limits.max_label,
        y_limits.min_label,
        y_limits.max_label
    );

    let (x_label, y_label) = match header {
        Some(h) => (
            label_or(&h[0], "x"),
            if width == 2 {
                label_or(&h[1], "y")
            } else {
                "y".to_string()
            },
        ),
        None => ("x".to_string(), "y".to_string()),
    };

    let pic = indent.at(0);
    let axis = indent.at(1);
    let opt = indent.at(2);

    let mut out = String::new();
    out.push_str(&format!("{pic}\\begin{{tikzpicture}}\n"));
    out.push_str(&format!("{axis}\\begin{{axis}}[\n"));
    for line in [
        "width=0.8\\textwidth,",
        "height=0.6\\textwidth,",
        "minor tick num=1,",
        "tick style={major tick length=5pt, minor tick length=3pt, tick pos=both, color=black, line width=0.5pt},",
        "tick align=inside,",
        "xmajorgrids=false,",
        "ymajorgrids=false,",
        "xminorgrids=false,",
        "yminorgrids=false,",
        "axis line style={-},",
        "scaled ticks=false,",
        "xticklabel style={/pgf/number format/fixed},",
        "yticklabel style={/pgf/number format/fixed},",
    ] {
        out.push_str(&format!("{opt}{line}\n"));
    }
    out.push_str(&format!(
        "{opt}xticklabel style = {{/pgf/number format/precision={precision}}},\n"
    ));
    out.push_str(&format!(
        "{opt}yticklabel style = {{/pgf/number format/precision={precision}}},\n"
    ));
    out.push_str(&format!("{opt}legend cell align = {{left}},\n"));
    out.push_str(&format!(
        "{opt}legend pos = {},\n",
        options.legend_position.as_pgf()
    ));
    if options.scale_mode.x_is_log() {
        out.push_str(&format!("{opt}xmode=log,\n"));
    }
    if options.scale_mode.y_is_log() {
        out.push_str(&format!("{opt}ymode=log,\n"));
    }
    out.push_str(&format!("{opt}xlabel={{{x_label}}},\n"));
    out.push_str(&format!("{opt}ylabel={{{y_label}}},\n"));
    out.push_str(&format!(
        "{opt}xmin={}, xmax={},\n",
        x_limits.min_label, x_limits.max_label
    ));
    out.push_str(&format!(
        "{opt}ymin={}, ymax={},\n",
        y_limits.min_label, y_limits.max_label
    ));
    let tick_lines: Vec<String> = [("xtick", &x_limits), ("ytick", &y_limits)]
        .iter()
        .filter_map(|(key, limits)| {
            limits.ticks.as_ref().map(|t| {
                let list: Vec<String> = t.iter().copied().map(number_label).collect();
                format!("{opt}{key}={{{}}}", list.join(","))
            })
        })
        .collect();
    // The last key in the option list carries no trailing comma.
    if tick_lines.is_empty() {
        trim_trailing_comma(&mut out);
    } else {
        out.push_str(&tick_lines.join(",\n"));
        out.push('\n');
    }
    out.push_str(&format!("{axis}]\n"));

    let plot_style = if options.trend.is_some() {
        "only marks, mark=*, draw"
    } else {
        "smooth, mark=*, draw"
    };
    for col in 1..width {
        let legend = header
            .map(|h| h[col].as_str())
            .filter(|s| !s.is_empty())
            .map(escape_latex)
            .unwrap_or_else(|| format!("Series {col}"));

        match source {
            PlotSource::File(filename) => out.push_str(&format!(
                "{opt}\\addplot [{plot_style}] table [col sep=comma, x index=0, y index={col}] {{{filename}.csv}};\n"
            )),
            PlotSource::Inline => {
                let point = indent.at(3);
                out.push_str(&format!("{opt}\\addplot [{plot_style}] coordinates {{\n"));
                for row in data {
                    if is_numeric(&row[0]) && is_numeric(&row[col]) {
                        out.push_str(&format!("{point}({},{})\n", row[0], row[col]));
                    }
                }
                out.push_str(&format!("{opt}}};\n"));
            }
        }
        out.push_str(&format!("{opt}\\addlegendentry{{{legend}}}\n"));

        if let Some(model) = options.trend {
            let (cx, cy): (Vec<f64>, Vec<f64>) = data
                .iter()
                .filter_map(|r| Some((parse_number(&r[0])?, parse_number(&r[col])?)))
                .unzip();
            match regression::fit(model, &cx, &cy) {
                Some(fit) => out.push_str(&trend_plot(&fit, &x_limits, precision, &opt)),
                None => warn!("No {model} trend line for column {col}: not enough usable points"),
            }
        }
    }

    out.push_str(&format!("{axis}\\end{{axis}}\n"));
    out.push_str(&format!("{pic}\\end{{tikzpicture}}\n"));
    Ok(out)
}

/// Dashed fit over the x axis range plus its legend entry.
fn trend_plot(fit: &Fit, x_limits: &AxisLimits, precision: u32, opt: &str) -> String {
    let needs_positive_x = matches!(
        fit.model,
        RegressionModel::Logarithmic | RegressionModel::Power
    );
    let lo = if needs_positive_x {
        x_limits.min.max(0.01)
    } else {
        x_limits.min
    };
    let d = precision.min(MAX_TICK_PRECISION) as usize;
    format!(
        "{opt}\\addplot [no markers, domain={lo}:{hi}, samples=100, dashed] {{{expr}}};\n\
         {opt}\\addlegendentry{{{name} (${eq}$, $R^2={r2:.d$}$)}}\n",
        lo = number_label(lo),
        hi = number_label(x_limits.max),
        expr = fit.pgf_expression(),
        name = fit.model,
        eq = fit.latex_equation(precision),
        r2 = fit.r_squared,
    )
}

fn label_or(cell: &str, fallback: &str) -> String {
    if cell.is_empty() {
        fallback.to_string()
    } else {
        escape_latex(cell)
    }
}

fn trim_trailing_comma(out: &mut String) {
    if out.ends_with(",\n") {
        out.truncate(out.len() - 2);
        out.push('\n');
    }
}
