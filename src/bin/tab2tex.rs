//! CLI binary for tab2tex.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` / `CompileConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tab2tex::config::DEFAULT_COMPILE_ENDPOINT;
use tab2tex::pipeline::regression::regress_columns;
use tab2tex::{
    convert, convert_to_file, inspect, parse, preview_pdf, read_input, save_csv_download,
    CompileConfig, ConversionConfig, Engine, LegendPosition, NumberFormat, OutputTarget,
    RegressionModel, ScaleMode, Tab2TexError, TableInfo,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Spreadsheet paste to a LaTeX table (stdout)
  pbpaste | tab2tex -

  # Round to 2 decimals and write to a file
  tab2tex measurements.txt --decimals 2 -o table.tex

  # CSV with 3 significant figures, plus a timestamped download copy
  tab2tex data.txt --format csv --sig-figs 3 --save-csv ~/Downloads

  # Semi-log chart reading results.csv, legend top right
  tab2tex data.txt --format tikz --scale semilog --legend-pos "north east" --filename results

  # Chart with trend lines, compiled to PDF through texlive.net
  tab2tex data.txt --format tikz --trend auto --compile preview.pdf

  # Fit all value columns and print the results as JSON
  tab2tex data.txt --format regression --trend power --json

  # Table shape only
  tab2tex --inspect-only data.txt

INPUT:
  Rows are lines. Cells are split on tabs if the line has one, else on
  commas (double quotes respected), else on runs of whitespace. Column 0 is
  the x axis of charts and regressions.

ENVIRONMENT VARIABLES:
  Every flag can be set through TAB2TEX_<FLAG>, e.g. TAB2TEX_FORMAT=tikz.
  RUST_LOG overrides -v / -q.
"#;

/// Convert pasted tabular data to LaTeX, CSV or PGFPlots charts.
#[derive(Parser, Debug)]
#[command(
    name = "tab2tex",
    version,
    about = "Convert pasted tabular data to LaTeX tables, CSV and PGFPlots charts",
    long_about = "Convert tabular text copied from a spreadsheet into a LaTeX tabular, \
CSV or a PGFPlots chart, with optional number rounding, least-squares trend lines and a \
PDF preview compiled by a remote TeX Live service.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file with the pasted table, or `-` for stdin.
    input: String,

    /// Output kind.
    #[arg(long, env = "TAB2TEX_FORMAT", value_enum, default_value = "latex")]
    format: FormatArg,

    /// Round numeric cells to N decimal places.
    #[arg(long, env = "TAB2TEX_DECIMALS", conflicts_with_all = ["sig_figs", "scientific"])]
    decimals: Option<u32>,

    /// Round numeric cells to N significant figures.
    #[arg(long, env = "TAB2TEX_SIG_FIGS", conflicts_with = "scientific")]
    sig_figs: Option<u32>,

    /// N significant figures, exponent notation below 1e-3 and from 1e4.
    #[arg(long, env = "TAB2TEX_SCIENTIFIC")]
    scientific: Option<u32>,

    /// Chart legend position: north west, north east, south west, south east,
    /// outer north east.
    #[arg(long, env = "TAB2TEX_LEGEND_POS", default_value = "north west")]
    legend_pos: String,

    /// Chart axis scale: linear, semilog, loglog.
    #[arg(long, env = "TAB2TEX_SCALE", default_value = "linear")]
    scale: String,

    /// Base name of the CSV file a chart reads (`.csv` is appended).
    #[arg(long, env = "TAB2TEX_FILENAME", default_value = "data")]
    filename: String,

    /// Tick label precision of charts.
    #[arg(long, env = "TAB2TEX_TICK_PRECISION", default_value_t = 3)]
    tick_precision: u32,

    /// Trend line model: linear, exponential, logarithmic, power, auto.
    #[arg(long, env = "TAB2TEX_TREND")]
    trend: Option<String>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "TAB2TEX_OUTPUT")]
    output: Option<PathBuf>,

    /// Also save a BOM-prefixed, timestamped CSV into this directory.
    #[arg(long, env = "TAB2TEX_SAVE_CSV")]
    save_csv: Option<PathBuf>,

    /// Compile a standalone preview document and write the PDF here.
    #[arg(long, env = "TAB2TEX_COMPILE")]
    compile: Option<PathBuf>,

    /// TeX engine for --compile (default: uplatex).
    #[arg(long, env = "TAB2TEX_ENGINE")]
    engine: Option<String>,

    /// Compile service URL.
    #[arg(long, env = "TAB2TEX_ENDPOINT", default_value = DEFAULT_COMPILE_ENDPOINT)]
    endpoint: String,

    /// Compile request timeout in seconds.
    #[arg(long, env = "TAB2TEX_COMPILE_TIMEOUT", default_value_t = 60)]
    compile_timeout: u64,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "TAB2TEX_JSON")]
    json: bool,

    /// Print the table shape only, no conversion.
    #[arg(long, env = "TAB2TEX_INSPECT_ONLY")]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TAB2TEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TAB2TEX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Latex,
    Csv,
    Tikz,
    TikzPreview,
    Regression,
}

impl FormatArg {
    fn target(self) -> OutputTarget {
        match self {
            FormatArg::Latex | FormatArg::Regression => OutputTarget::Latex,
            FormatArg::Csv => OutputTarget::Csv,
            FormatArg::Tikz => OutputTarget::Tikz,
            FormatArg::TikzPreview => OutputTarget::TikzPreview,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let text = read_text(&cli.input)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&text).context("Failed to parse input")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise table info")?
            );
        } else {
            print_info(&cli.input, &info);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;

    // ── Regression report ────────────────────────────────────────────────
    if cli.format == FormatArg::Regression {
        let table = parse(&text).context("Failed to parse input")?;
        let model = config.trend.unwrap_or_default();
        let reports = regress_columns(&table, model);
        if reports.is_empty() {
            bail!(Tab2TexError::TooFewColumns {
                columns: table.width()
            });
        }
        if cli.json {
            emit(
                &cli,
                &serde_json::to_string_pretty(&reports).context("Failed to serialise fits")?,
            )?;
        } else {
            let lines: Vec<String> = reports
                .iter()
                .map(|r| {
                    if r.valid {
                        format!(
                            "column {}  {:<12} y = {}  R² = {:.6}",
                            r.column, r.model, r.equation, r.r_squared
                        )
                    } else {
                        format!("column {}  {:<12} no fit", r.column, r.model)
                    }
                })
                .collect();
            emit(&cli, &lines.join("\n"))?;
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let info = convert_to_file(&text, output_path, &config).context("Conversion failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}×{} table  →  {}",
                green("✔"),
                info.rows,
                info.columns,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = convert(&text, &config).context("Conversion failed")?;
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            write_stdout(&output.content)?;
        }
    }

    // ── CSV download copy ────────────────────────────────────────────────
    if let Some(ref dir) = cli.save_csv {
        let csv_config = ConversionConfig {
            target: OutputTarget::Csv,
            ..config.clone()
        };
        let csv = convert(&text, &csv_config).context("CSV generation failed")?;
        let path = save_csv_download(dir, &csv.content).context("Failed to save CSV")?;
        if !cli.quiet {
            eprintln!("{}  CSV  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── PDF preview ──────────────────────────────────────────────────────
    if let Some(ref pdf_path) = cli.compile {
        let compile_config = build_compile_config(&cli)?;
        let spinner = (!cli.quiet).then(|| compile_spinner(&compile_config.endpoint));
        let result = preview_pdf(&text, &config, &compile_config).await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        match result {
            Ok(pdf) => {
                std::fs::write(pdf_path, &pdf)
                    .with_context(|| format!("Failed to write {}", pdf_path.display()))?;
                if !cli.quiet {
                    eprintln!(
                        "{}  PDF {}  →  {}",
                        green("✔"),
                        dim(&format!("{} bytes", pdf.len())),
                        bold(&pdf_path.display().to_string()),
                    );
                }
            }
            Err(e) => {
                if let Some(log) = e.compile_log() {
                    tracing::debug!("Full compiler log:\n{log}");
                }
                if !cli.quiet {
                    eprintln!("{}  {}", red("✘"), red("Compilation failed"));
                }
                return Err(e).context("PDF preview failed");
            }
        }
    }

    Ok(())
}

/// Read the paste from a file or, for `-`, from stdin.
fn read_text(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        Ok(read_input(input)?)
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let number_format = match (cli.decimals, cli.sig_figs, cli.scientific) {
        (Some(n), _, _) => NumberFormat::FixedDecimals(n),
        (_, Some(n), _) => NumberFormat::SignificantFigures(n),
        (_, _, Some(n)) => NumberFormat::Scientific(n),
        _ => NumberFormat::None,
    };
    let legend: LegendPosition = cli.legend_pos.parse()?;
    let scale: ScaleMode = cli.scale.parse()?;
    let trend = cli
        .trend
        .as_deref()
        .map(str::parse::<RegressionModel>)
        .transpose()?;

    ConversionConfig::builder()
        .target(cli.format.target())
        .number_format(number_format)
        .legend_position(legend)
        .scale_mode(scale)
        .tick_precision(cli.tick_precision)
        .data_filename(cli.filename.as_str())
        .trend(trend)
        .build()
        .context("Invalid configuration")
}

/// Map CLI args to `CompileConfig`.
fn build_compile_config(cli: &Cli) -> Result<CompileConfig> {
    let mut builder = CompileConfig::builder()
        .endpoint(cli.endpoint.as_str())
        .timeout_secs(cli.compile_timeout);
    if let Some(ref name) = cli.engine {
        builder = builder.engine(name.parse::<Engine>()?);
    }
    builder.build().context("Invalid compile configuration")
}

fn compile_spinner(endpoint: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Compiling");
    bar.set_message(endpoint.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_info(input: &str, info: &TableInfo) {
    println!("Input:        {input}");
    println!("Rows:         {}", info.rows);
    println!("Columns:      {}", info.columns);
    println!("Header row:   {}", if info.has_header { "yes" } else { "no" });
    println!("Numeric:      {}", info.numeric_cells);
    println!("Empty:        {}", info.empty_cells);
    println!(
        "Delimiters:   {} tab, {} comma, {} whitespace",
        info.tab_lines, info.comma_lines, info.whitespace_lines
    );
}

/// Write to `-o` when given, else stdout.
fn emit(cli: &Cli, text: &str) -> Result<()> {
    match cli.output {
        Some(ref path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => write_stdout(text),
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    // Ensure a trailing newline on stdout.
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_flag_has_an_env_var() {
        let cmd = Cli::command();
        for arg in cmd.get_arguments().filter(|a| a.get_long().is_some()) {
            let long = arg.get_long().unwrap_or_default();
            if matches!(long, "help" | "version") {
                continue;
            }
            let expected = format!("TAB2TEX_{}", long.replace('-', "_").to_uppercase());
            assert_eq!(
                arg.get_env().and_then(|e| e.to_str()),
                Some(expected.as_str()),
                "--{long}"
            );
        }
    }
}
