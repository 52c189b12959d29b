//! Conversion entry points.
//!
//! Two layers share the same pipeline:
//!
//! * the string API (`gen_*`), mirroring the loosely typed boundary a web
//!   front end calls: option values arrive as strings, an empty string means
//!   "use the default";
//! * the typed API ([`convert`], [`convert_to_file`], [`inspect`],
//!   [`preview_pdf`]) driven by [`ConversionConfig`].

use crate::compile::{self, CompileOutput};
use crate::config::{
    CompileConfig, ConversionConfig, Engine, LegendPosition, NumberFormat, OutputTarget,
    validate_data_filename, RegressionModel, ReturnFormat, ScaleMode, DEFAULT_DATA_FILENAME,
    MAX_TICK_PRECISION,
};
use crate::document;
use crate::download::write_atomic;
use crate::error::Tab2TexError;
use crate::output::{ConversionOutput, TableInfo};
use crate::pipeline::parse::{parse, Table};
use crate::pipeline::tikz::{self, ChartOptions};
use crate::pipeline::{csv, latex, regression};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

// ── String API ───────────────────────────────────────────────────────────

/// Pasted text → `tabular`.
pub fn gen_latex(input: &str) -> Result<String, Tab2TexError> {
    Ok(latex::generate_latex(&parse(input)?, NumberFormat::None))
}

/// Pasted text → CSV.
pub fn gen_csv(input: &str) -> Result<String, Tab2TexError> {
    csv::generate_csv(&parse(input)?, NumberFormat::None)
}

pub fn gen_latex_rounded(input: &str, decimals: u32) -> Result<String, Tab2TexError> {
    Ok(latex::generate_latex(
        &parse(input)?,
        NumberFormat::FixedDecimals(decimals),
    ))
}

pub fn gen_latex_sig_figs(input: &str, sig_figs: u32) -> Result<String, Tab2TexError> {
    Ok(latex::generate_latex(
        &parse(input)?,
        NumberFormat::SignificantFigures(sig_figs),
    ))
}

pub fn gen_csv_rounded(input: &str, decimals: u32) -> Result<String, Tab2TexError> {
    csv::generate_csv(&parse(input)?, NumberFormat::FixedDecimals(decimals))
}

pub fn gen_csv_sig_figs(input: &str, sig_figs: u32) -> Result<String, Tab2TexError> {
    csv::generate_csv(&parse(input)?, NumberFormat::SignificantFigures(sig_figs))
}

/// Chart figure reading `<filename>.csv`.
///
/// `sig_figs` is the tick label precision (0 means 3). Empty `legend_pos`,
/// `scale_mode` or `filename` select the defaults.
pub fn gen_tikz_graph(
    input: &str,
    filename: &str,
    sig_figs: u32,
    legend_pos: &str,
    scale_mode: &str,
) -> Result<String, Tab2TexError> {
    let options = chart_options(sig_figs, legend_pos, scale_mode, None)?;
    tikz::generate_tikz(&parse(input)?, &options, &data_filename(filename)?)
}

/// Chart with inline coordinates, compilable on its own.
pub fn gen_tikz_graph_preview(
    input: &str,
    sig_figs: u32,
    legend_pos: &str,
    scale_mode: &str,
) -> Result<String, Tab2TexError> {
    let options = chart_options(sig_figs, legend_pos, scale_mode, None)?;
    tikz::generate_tikz_preview(&parse(input)?, &options)
}

/// [`gen_tikz_graph`] plus a dashed trend line per value column.
/// An empty `regression_type` means `auto`.
pub fn gen_tikz_graph_with_regression(
    input: &str,
    filename: &str,
    sig_figs: u32,
    legend_pos: &str,
    scale_mode: &str,
    regression_type: &str,
) -> Result<String, Tab2TexError> {
    let model = parse_option::<RegressionModel>(regression_type)?;
    let options = chart_options(sig_figs, legend_pos, scale_mode, Some(model))?;
    tikz::generate_tikz(&parse(input)?, &options, &data_filename(filename)?)
}

pub fn gen_tikz_graph_with_regression_preview(
    input: &str,
    sig_figs: u32,
    legend_pos: &str,
    scale_mode: &str,
    regression_type: &str,
) -> Result<String, Tab2TexError> {
    let model = parse_option::<RegressionModel>(regression_type)?;
    let options = chart_options(sig_figs, legend_pos, scale_mode, Some(model))?;
    tikz::generate_tikz_preview(&parse(input)?, &options)
}

/// One fit as a JSON object
/// (`{"column","type","a","b","r_squared","equation","valid"}`).
pub fn gen_regression(
    input: &str,
    x_col: usize,
    y_col: usize,
    model_type: &str,
) -> Result<String, Tab2TexError> {
    let model = parse_option::<RegressionModel>(model_type)?;
    let report = regression::regress_pair(&parse(input)?, x_col, y_col, model)?;
    to_json(&report)
}

/// JSON array with one fit per value column against column 0.
pub fn gen_all_regressions(input: &str, model_type: &str) -> Result<String, Tab2TexError> {
    let model = parse_option::<RegressionModel>(model_type)?;
    to_json(&regression::regress_columns(&parse(input)?, model))
}

/// JSON array with the linear, exponential, logarithmic and power fits.
pub fn gen_regression_comparison(
    input: &str,
    x_col: usize,
    y_col: usize,
) -> Result<String, Tab2TexError> {
    to_json(&regression::compare_models(&parse(input)?, x_col, y_col)?)
}

fn chart_options(
    sig_figs: u32,
    legend_pos: &str,
    scale_mode: &str,
    trend: Option<RegressionModel>,
) -> Result<ChartOptions, Tab2TexError> {
    Ok(ChartOptions {
        tick_precision: sig_figs.min(MAX_TICK_PRECISION),
        legend_position: parse_option::<LegendPosition>(legend_pos)?,
        scale_mode: parse_option::<ScaleMode>(scale_mode)?,
        trend,
    })
}

/// Empty means default; anything else must parse.
fn parse_option<T>(value: &str) -> Result<T, Tab2TexError>
where
    T: FromStr<Err = Tab2TexError> + Default,
{
    if value.trim().is_empty() {
        Ok(T::default())
    } else {
        value.parse()
    }
}

/// Empty means the default name; braces and newlines are rejected like
/// [`ConversionConfigBuilder::build`](crate::config::ConversionConfigBuilder::build) does.
fn data_filename(name: &str) -> Result<String, Tab2TexError> {
    let name = name.trim();
    let name = name.strip_suffix(".csv").unwrap_or(name);
    if name.is_empty() {
        return Ok(DEFAULT_DATA_FILENAME.to_string());
    }
    validate_data_filename(name)?;
    Ok(name.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, Tab2TexError> {
    serde_json::to_string(value).map_err(|e| Tab2TexError::Internal(format!("JSON: {e}")))
}

// ── Typed API ────────────────────────────────────────────────────────────

/// Convert pasted text according to `config`.
///
/// # Errors
/// [`Tab2TexError::EmptyInput`] for blank input; chart targets additionally
/// fail with [`Tab2TexError::TooFewColumns`] or
/// [`Tab2TexError::NoNumericData`].
pub fn convert(input: &str, config: &ConversionConfig) -> Result<ConversionOutput, Tab2TexError> {
    let table = parse(input)?;
    let info = TableInfo::from_table(&table);
    debug!("Converting {}×{} table to {:?}", info.rows, info.columns, config.target);

    let content = render(&table, config)?;
    let regressions = match (config.target, config.trend) {
        (OutputTarget::Tikz | OutputTarget::TikzPreview, Some(model)) => {
            regression::regress_columns(&table, model)
        }
        _ => Vec::new(),
    };

    info!(
        "Generated {} bytes of {:?} from {} rows",
        content.len(),
        config.target,
        info.rows
    );
    Ok(ConversionOutput {
        target: config.target,
        content,
        table: info,
        regressions,
    })
}

fn render(table: &Table, config: &ConversionConfig) -> Result<String, Tab2TexError> {
    match config.target {
        OutputTarget::Latex => Ok(latex::generate_latex(table, config.number_format)),
        OutputTarget::Csv => csv::generate_csv(table, config.number_format),
        OutputTarget::Tikz => {
            tikz::generate_tikz(table, &ChartOptions::from(config), &config.data_filename)
        }
        OutputTarget::TikzPreview => {
            tikz::generate_tikz_preview(table, &ChartOptions::from(config))
        }
    }
}

/// Convert and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn convert_to_file(
    input: &str,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<TableInfo, Tab2TexError> {
    let output = convert(input, config)?;
    let path = output_path.as_ref();
    write_atomic(path, output.content.as_bytes())?;
    info!("Wrote {}", path.display());
    Ok(output.table)
}

/// Read pasted text saved to a file.
pub fn read_input(path: impl AsRef<Path>) -> Result<String, Tab2TexError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| Tab2TexError::InputReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse only, reporting the table's shape.
pub fn inspect(input: &str) -> Result<TableInfo, Tab2TexError> {
    Ok(TableInfo::from_table(&parse(input)?))
}

/// Render `input` as a standalone document and compile it to PDF.
///
/// Charts are previewed with inline data since the CSV they would reference
/// does not exist on the service; CSV targets are previewed as a table.
pub async fn preview_pdf(
    input: &str,
    config: &ConversionConfig,
    compile_config: &CompileConfig,
) -> Result<Vec<u8>, Tab2TexError> {
    let table = parse(input)?;
    let engine = compile_config.engine.clone().unwrap_or_default();
    let source = preview_source(&table, config, &engine)?;

    let mut request = compile_config.clone();
    request.engine = Some(engine);
    request.return_format = ReturnFormat::Pdf;
    match compile::compile(&source, &request).await? {
        CompileOutput::Pdf(bytes) => Ok(bytes),
        CompileOutput::Text(_) => Err(Tab2TexError::Internal(
            "compile service returned text for a PDF request".into(),
        )),
    }
}

/// Standalone document used by [`preview_pdf`].
pub fn preview_source(
    table: &Table,
    config: &ConversionConfig,
    engine: &Engine,
) -> Result<String, Tab2TexError> {
    Ok(match config.target {
        OutputTarget::Latex | OutputTarget::Csv => {
            document::wrap_table(&latex::generate_latex(table, config.number_format), engine)
        }
        OutputTarget::Tikz | OutputTarget::TikzPreview => {
            let chart = tikz::generate_tikz_preview(table, &ChartOptions::from(config))?;
            document::wrap_figure(&chart, engine)
        }
    })
}
