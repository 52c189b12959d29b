//! Configuration types for table conversion and remote compilation.
//!
//! Generation is controlled by [`ConversionConfig`] (built via
//! [`ConversionConfigBuilder`]); the optional PDF preview by
//! [`CompileConfig`]. The option enums parse from the same lowercase strings
//! the string API ([`crate::convert::gen_tikz_graph`] and friends) accepts,
//! so the CLI, the string API and the typed API agree on spelling.

use crate::error::Tab2TexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default remote LaTeX compilation endpoint.
pub const DEFAULT_COMPILE_ENDPOINT: &str = "https://texlive.net/cgi-bin/latexcgi";

/// Default base name of the CSV file a chart reads its data from.
pub const DEFAULT_DATA_FILENAME: &str = "data";

/// Tick label precision used when the caller passes a value below 1.
pub const DEFAULT_TICK_PRECISION: u32 = 3;

/// Largest tick label precision accepted.
pub const MAX_TICK_PRECISION: u32 = 15;

/// Configuration for a single conversion.
///
/// # Example
/// ```rust
/// use tab2tex::{ConversionConfig, NumberFormat, OutputTarget, ScaleMode};
///
/// let config = ConversionConfig::builder()
///     .target(OutputTarget::Tikz)
///     .number_format(NumberFormat::SignificantFigures(3))
///     .scale_mode(ScaleMode::SemiLog)
///     .data_filename("measurements")
///     .build()
///     .unwrap();
/// assert_eq!(config.data_filename, "measurements");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Which artifact to generate. Default: [`OutputTarget::Latex`].
    pub target: OutputTarget,

    /// Rounding applied to numeric cells of tables and CSV. Default: none.
    pub number_format: NumberFormat,

    /// Legend placement inside the chart axis. Default: north west.
    pub legend_position: LegendPosition,

    /// Axis scaling of the chart. Default: linear.
    pub scale_mode: ScaleMode,

    /// `/pgf/number format/precision` of tick labels. Default: 3.
    pub tick_precision: u32,

    /// Base name (without `.csv`) of the data file a chart references.
    pub data_filename: String,

    /// Fit and draw a trend line per value column. Default: none.
    pub trend: Option<RegressionModel>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target: OutputTarget::default(),
            number_format: NumberFormat::default(),
            legend_position: LegendPosition::default(),
            scale_mode: ScaleMode::default(),
            tick_precision: DEFAULT_TICK_PRECISION,
            data_filename: DEFAULT_DATA_FILENAME.to_string(),
            trend: None,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn target(mut self, target: OutputTarget) -> Self {
        self.config.target = target;
        self
    }

    pub fn number_format(mut self, format: NumberFormat) -> Self {
        self.config.number_format = format;
        self
    }

    pub fn legend_position(mut self, pos: LegendPosition) -> Self {
        self.config.legend_position = pos;
        self
    }

    pub fn scale_mode(mut self, mode: ScaleMode) -> Self {
        self.config.scale_mode = mode;
        self
    }

    /// Values below 1 fall back to [`DEFAULT_TICK_PRECISION`].
    pub fn tick_precision(mut self, digits: u32) -> Self {
        self.config.tick_precision = if digits < 1 {
            DEFAULT_TICK_PRECISION
        } else {
            digits
        };
        self
    }

    /// A trailing `.csv` is stripped; the chart appends it itself.
    pub fn data_filename(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        let name = name.strip_suffix(".csv").unwrap_or(name);
        self.config.data_filename = name.to_string();
        self
    }

    pub fn trend(mut self, model: Option<RegressionModel>) -> Self {
        self.config.trend = model;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Tab2TexError> {
        let c = &self.config;
        if c.data_filename.is_empty() {
            return Err(Tab2TexError::InvalidConfig(
                "data filename must not be empty".into(),
            ));
        }
        validate_data_filename(&c.data_filename)?;
        if c.tick_precision > MAX_TICK_PRECISION {
            return Err(Tab2TexError::InvalidConfig(format!(
                "tick precision must be 1–{MAX_TICK_PRECISION}, got {}",
                c.tick_precision
            )));
        }
        Ok(self.config)
    }
}

/// A data file name ends up inside `{…}` in TikZ, so braces and line breaks
/// would break the figure.
pub(crate) fn validate_data_filename(name: &str) -> Result<(), Tab2TexError> {
    if name.contains(['{', '}', '\n', '\r']) {
        return Err(Tab2TexError::InvalidConfig(format!(
            "data filename '{name}' must not contain braces or newlines"
        )));
    }
    Ok(())
}

/// Settings for the remote LaTeX compilation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// URL the form is POSTed to.
    pub endpoint: String,

    /// Engine override. `None` means: use the `% !TEX` magic comment, then
    /// content heuristics, then [`Engine::UpLatex`].
    pub engine: Option<Engine>,

    /// What the service should send back. Default: [`ReturnFormat::Pdf`].
    pub return_format: ReturnFormat,

    /// Whole-request timeout in seconds. Default: 60.
    pub timeout_secs: u64,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPILE_ENDPOINT.to_string(),
            engine: None,
            return_format: ReturnFormat::default(),
            timeout_secs: 60,
        }
    }
}

impl CompileConfig {
    /// Create a new builder for `CompileConfig`.
    pub fn builder() -> CompileConfigBuilder {
        CompileConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CompileConfig`].
#[derive(Debug)]
pub struct CompileConfigBuilder {
    config: CompileConfig,
}

impl CompileConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn return_format(mut self, format: ReturnFormat) -> Self {
        self.config.return_format = format;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CompileConfig, Tab2TexError> {
        let endpoint = &self.config.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Tab2TexError::InvalidConfig(format!(
                "compile endpoint must be an HTTP/HTTPS URL, got '{endpoint}'"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which artifact a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputTarget {
    /// `tabular` environment. (default)
    #[default]
    Latex,
    /// Comma-separated values.
    Csv,
    /// PGFPlots figure reading `<data_filename>.csv`.
    Tikz,
    /// Bare `tikzpicture` with the data embedded as coordinates.
    TikzPreview,
}

/// Numeric formatting mode, applied uniformly to every numeric-looking cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "digits")]
pub enum NumberFormat {
    /// Cells are emitted as typed. (default)
    #[default]
    None,
    /// Round to a fixed number of decimals.
    FixedDecimals(u32),
    /// Round to a number of significant figures.
    SignificantFigures(u32),
    /// Significant figures, switching to exponent notation for very small or
    /// very large magnitudes.
    Scientific(u32),
}

/// Legend placement, spelled the way PGFPlots' `legend pos` key expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    #[default]
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    OuterNorthEast,
}

impl LegendPosition {
    pub fn as_pgf(self) -> &'static str {
        match self {
            LegendPosition::NorthWest => "north west",
            LegendPosition::NorthEast => "north east",
            LegendPosition::SouthWest => "south west",
            LegendPosition::SouthEast => "south east",
            LegendPosition::OuterNorthEast => "outer north east",
        }
    }
}

impl FromStr for LegendPosition {
    type Err = Tab2TexError;

    /// Accepts the PGFPlots spelling (`north west`) and the dashed one
    /// (`north-west`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalised.as_str() {
            "north west" => Ok(LegendPosition::NorthWest),
            "north east" => Ok(LegendPosition::NorthEast),
            "south west" => Ok(LegendPosition::SouthWest),
            "south east" => Ok(LegendPosition::SouthEast),
            "outer north east" => Ok(LegendPosition::OuterNorthEast),
            _ => Err(Tab2TexError::InvalidOption {
                option: "legend position",
                value: s.to_string(),
                expected: "north west, north east, south west, south east, outer north east",
            }),
        }
    }
}

impl fmt::Display for LegendPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pgf())
    }
}

/// Axis scaling of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMode {
    /// Both axes linear. (default)
    #[default]
    Linear,
    /// Logarithmic y axis.
    SemiLog,
    /// Both axes logarithmic.
    LogLog,
}

impl ScaleMode {
    pub fn x_is_log(self) -> bool {
        matches!(self, ScaleMode::LogLog)
    }

    pub fn y_is_log(self) -> bool {
        matches!(self, ScaleMode::SemiLog | ScaleMode::LogLog)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScaleMode::Linear => "linear",
            ScaleMode::SemiLog => "semilog",
            ScaleMode::LogLog => "loglog",
        }
    }
}

impl FromStr for ScaleMode {
    type Err = Tab2TexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(ScaleMode::Linear),
            "semilog" | "semi-log" => Ok(ScaleMode::SemiLog),
            "loglog" | "log-log" => Ok(ScaleMode::LogLog),
            _ => Err(Tab2TexError::InvalidOption {
                option: "scale mode",
                value: s.to_string(),
                expected: "linear, semilog, loglog",
            }),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend-line model fitted by least squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegressionModel {
    /// y = a·x + b
    Linear,
    /// y = a·e^(b·x)
    Exponential,
    /// y = a·ln(x) + b
    Logarithmic,
    /// y = a·x^b
    Power,
    /// Best R² among the four models. (default)
    #[default]
    Auto,
}

impl RegressionModel {
    pub fn as_str(self) -> &'static str {
        match self {
            RegressionModel::Linear => "linear",
            RegressionModel::Exponential => "exponential",
            RegressionModel::Logarithmic => "logarithmic",
            RegressionModel::Power => "power",
            RegressionModel::Auto => "auto",
        }
    }
}

impl FromStr for RegressionModel {
    type Err = Tab2TexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(RegressionModel::Linear),
            "exponential" | "exp" => Ok(RegressionModel::Exponential),
            "logarithmic" | "log" => Ok(RegressionModel::Logarithmic),
            "power" | "pow" => Ok(RegressionModel::Power),
            "auto" => Ok(RegressionModel::Auto),
            _ => Err(Tab2TexError::InvalidOption {
                option: "regression model",
                value: s.to_string(),
                expected: "linear, exponential, logarithmic, power, auto",
            }),
        }
    }
}

impl fmt::Display for RegressionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TeX engine requested from the compile service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Latex,
    PdfLatex,
    XeLatex,
    LuaLatex,
    /// Japanese-capable engine; the preview documents default to it.
    #[default]
    UpLatex,
    PLatex,
    /// Anything else the service understands (`context`, `lualatex-dev`…).
    Other(String),
}

impl Engine {
    pub fn as_str(&self) -> &str {
        match self {
            Engine::Latex => "latex",
            Engine::PdfLatex => "pdflatex",
            Engine::XeLatex => "xelatex",
            Engine::LuaLatex => "lualatex",
            Engine::UpLatex => "uplatex",
            Engine::PLatex => "platex",
            Engine::Other(name) => name,
        }
    }

    /// Engines that go through a DVI and therefore need `dvipdfmx` options.
    pub fn uses_dvipdfmx(&self) -> bool {
        matches!(self, Engine::UpLatex | Engine::PLatex)
    }
}

impl FromStr for Engine {
    type Err = Tab2TexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Ok(match name.as_str() {
            "" => {
                return Err(Tab2TexError::InvalidOption {
                    option: "engine",
                    value: s.to_string(),
                    expected: "latex, pdflatex, xelatex, lualatex, uplatex, platex",
                })
            }
            "latex" => Engine::Latex,
            "pdflatex" => Engine::PdfLatex,
            "xelatex" => Engine::XeLatex,
            "lualatex" => Engine::LuaLatex,
            "uplatex" => Engine::UpLatex,
            "platex" => Engine::PLatex,
            _ => Engine::Other(name),
        })
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response format requested from the compile service (`return` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnFormat {
    /// Raw PDF bytes. (default)
    #[default]
    Pdf,
    /// An HTML page embedding PDF.js; only useful for browsers.
    PdfJs,
    /// The compiler log as plain text.
    Log,
}

impl ReturnFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnFormat::Pdf => "pdf",
            ReturnFormat::PdfJs => "pdfjs",
            ReturnFormat::Log => "log",
        }
    }
}

impl FromStr for ReturnFormat {
    type Err = Tab2TexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ReturnFormat::Pdf),
            "pdfjs" => Ok(ReturnFormat::PdfJs),
            "log" => Ok(ReturnFormat::Log),
            _ => Err(Tab2TexError::InvalidOption {
                option: "return format",
                value: s.to_string(),
                expected: "pdf, pdfjs, log",
            }),
        }
    }
}
