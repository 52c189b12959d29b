//! Least-squares trend lines.
//!
//! The three non-linear models are fitted by linearising: exponential fits
//! `ln y` against `x`, logarithmic fits `y` against `ln x`, power fits
//! `ln y` against `ln x`. Points outside a transform's domain (non-positive
//! values under a logarithm) are dropped for that model only. R² is always
//! reported on the original scale so the models compare fairly in
//! [`RegressionModel::Auto`].

use crate::config::{RegressionModel, MAX_TICK_PRECISION};
use crate::error::Tab2TexError;
use crate::pipeline::format::parse_number;
use crate::pipeline::parse::Table;
use serde::Serialize;

/// Denominators smaller than this mean all x values coincide.
const DEGENERATE: f64 = 1e-10;

/// Concrete models tried by [`RegressionModel::Auto`], in tie-break order.
const CONCRETE_MODELS: [RegressionModel; 4] = [
    RegressionModel::Linear,
    RegressionModel::Exponential,
    RegressionModel::Logarithmic,
    RegressionModel::Power,
];

/// A fitted trend line `y = f(x; a, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fit {
    /// Never [`RegressionModel::Auto`].
    pub model: RegressionModel,
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
}

impl Fit {
    /// Evaluate the fitted function.
    pub fn predict(&self, x: f64) -> f64 {
        match self.model {
            RegressionModel::Exponential => self.a * (self.b * x).exp(),
            RegressionModel::Logarithmic => self.a * x.ln() + self.b,
            RegressionModel::Power => self.a * x.powf(self.b),
            RegressionModel::Linear | RegressionModel::Auto => self.a * x + self.b,
        }
    }

    /// Human-readable equation with 6-decimal coefficients, e.g.
    /// `2.000000*x+1.000000`.
    pub fn equation(&self) -> String {
        let (a, b) = (self.a, self.b);
        match self.model {
            RegressionModel::Exponential => format!("{a:.6}*exp({b:.6}*x)"),
            RegressionModel::Logarithmic => format!("{a:.6}*ln(x){}", signed(b)),
            RegressionModel::Power => format!("{a:.6}*x^{b:.6}"),
            RegressionModel::Linear | RegressionModel::Auto => format!("{a:.6}*x{}", signed(b)),
        }
    }

    /// Math-mode equation for legends, coefficients at `digits` decimals.
    ///
    /// `digits` is clamped to [`MAX_TICK_PRECISION`].
    pub fn latex_equation(&self, digits: u32) -> String {
        let d = digits.min(MAX_TICK_PRECISION) as usize;
        let (a, b) = (self.a, self.b);
        let tail = |v: f64| {
            if v >= 0.0 {
                format!(" + {v:.d$}")
            } else {
                format!(" - {:.d$}", -v)
            }
        };
        match self.model {
            RegressionModel::Exponential => format!("y = {a:.d$} e^{{{b:.d$} x}}"),
            RegressionModel::Logarithmic => format!("y = {a:.d$} \\ln x{}", tail(b)),
            RegressionModel::Power => format!("y = {a:.d$} x^{{{b:.d$}}}"),
            RegressionModel::Linear | RegressionModel::Auto => format!("y = {a:.d$} x{}", tail(b)),
        }
    }

    /// Expression for a PGFPlots `\addplot {…}` over `x`.
    pub fn pgf_expression(&self) -> String {
        let (a, b) = (self.a, self.b);
        match self.model {
            RegressionModel::Exponential => format!("{a:.6}*exp({b:.6}*x)"),
            RegressionModel::Logarithmic => format!("{a:.6}*ln(x){}", spaced(b)),
            RegressionModel::Power => format!("{a:.6}*x^({b:.6})"),
            RegressionModel::Linear | RegressionModel::Auto => format!("{a:.6}*x{}", spaced(b)),
        }
    }
}

fn signed(v: f64) -> String {
    if v >= 0.0 {
        format!("+{v:.6}")
    } else {
        format!("{v:.6}")
    }
}

fn spaced(v: f64) -> String {
    if v >= 0.0 {
        format!(" + {v:.6}")
    } else {
        format!(" - {:.6}", -v)
    }
}

/// Serializable result row, one per (column, model).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    /// Value column index (the key column is 0).
    pub column: usize,
    /// Model actually fitted; for a failed `auto` fit this is `auto`.
    #[serde(rename = "type")]
    pub model: RegressionModel,
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
    pub equation: String,
    pub valid: bool,
}

impl RegressionReport {
    fn new(column: usize, requested: RegressionModel, fit: Option<Fit>) -> Self {
        match fit {
            Some(f) => Self {
                column,
                model: f.model,
                a: f.a,
                b: f.b,
                r_squared: f.r_squared,
                equation: f.equation(),
                valid: true,
            },
            None => Self {
                column,
                model: requested,
                a: 0.0,
                b: 0.0,
                r_squared: 0.0,
                equation: String::new(),
                valid: false,
            },
        }
    }
}

/// Fit `model` to paired samples. `None` when fewer than two usable points
/// remain or all x values coincide.
pub fn fit(model: RegressionModel, xs: &[f64], ys: &[f64]) -> Option<Fit> {
    match model {
        RegressionModel::Linear => fit_linear(xs, ys),
        RegressionModel::Exponential => fit_exponential(xs, ys),
        RegressionModel::Logarithmic => fit_logarithmic(xs, ys),
        RegressionModel::Power => fit_power(xs, ys),
        RegressionModel::Auto => fit_auto(xs, ys),
    }
}

/// Rows where both `x_col` and `y_col` are numeric, as parallel vectors.
pub fn xy_pairs(table: &Table, x_col: usize, y_col: usize) -> (Vec<f64>, Vec<f64>) {
    table
        .rows()
        .iter()
        .filter_map(|row| {
            let x = parse_number(row.get(x_col)?)?;
            let y = parse_number(row.get(y_col)?)?;
            Some((x, y))
        })
        .unzip()
}

/// Fit every value column (1..width) against the key column.
pub fn regress_columns(table: &Table, model: RegressionModel) -> Vec<RegressionReport> {
    (1..table.width())
        .map(|col| {
            let (xs, ys) = xy_pairs(table, 0, col);
            RegressionReport::new(col, model, fit(model, &xs, &ys))
        })
        .collect()
}

/// Fit one column pair with `model`.
pub fn regress_pair(
    table: &Table,
    x_col: usize,
    y_col: usize,
    model: RegressionModel,
) -> Result<RegressionReport, Tab2TexError> {
    check_column(table, x_col)?;
    check_column(table, y_col)?;
    let (xs, ys) = xy_pairs(table, x_col, y_col);
    Ok(RegressionReport::new(y_col, model, fit(model, &xs, &ys)))
}

/// All four concrete models on one column pair, for side-by-side comparison.
pub fn compare_models(
    table: &Table,
    x_col: usize,
    y_col: usize,
) -> Result<Vec<RegressionReport>, Tab2TexError> {
    check_column(table, x_col)?;
    check_column(table, y_col)?;
    let (xs, ys) = xy_pairs(table, x_col, y_col);
    Ok(CONCRETE_MODELS
        .iter()
        .map(|&m| RegressionReport::new(y_col, m, fit(m, &xs, &ys)))
        .collect())
}

fn check_column(table: &Table, column: usize) -> Result<(), Tab2TexError> {
    if column >= table.width() {
        return Err(Tab2TexError::ColumnOutOfRange {
            column,
            width: table.width(),
        });
    }
    Ok(())
}

// ── Fitting ──────────────────────────────────────────────────────────────

/// Ordinary least squares `y = slope·x + intercept`.
fn least_squares(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let n_f = n as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator.abs() < DEGENERATE {
        return None;
    }
    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y * sum_x2 - sum_x * sum_xy) / denominator;
    Some((slope, intercept))
}

/// Coefficient of determination of `predict` on the samples; 0 when y is
/// constant.
fn r_squared(xs: &[f64], ys: &[f64], predict: impl Fn(f64) -> f64) -> f64 {
    let mean = ys.iter().sum::<f64>() / ys.len() as f64;
    let (ss_res, ss_tot) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(res, tot), (&x, &y)| {
            let err = y - predict(x);
            (res + err * err, tot + (y - mean) * (y - mean))
        });
    if ss_tot > DEGENERATE {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

fn fit_linear(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    let (a, b) = least_squares(xs, ys)?;
    let r_squared = r_squared(xs, ys, |x| a * x + b);
    Some(Fit {
        model: RegressionModel::Linear,
        a,
        b,
        r_squared,
    })
}

fn fit_exponential(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|(_, &y)| y > 0.0)
        .map(|(&x, &y)| (x, y))
        .unzip();
    let ln_y: Vec<f64> = ys.iter().map(|y| y.ln()).collect();
    let (b, ln_a) = least_squares(&xs, &ln_y)?;
    let a = ln_a.exp();
    let r_squared = r_squared(&xs, &ys, |x| a * (b * x).exp());
    Some(Fit {
        model: RegressionModel::Exponential,
        a,
        b,
        r_squared,
    })
}

fn fit_logarithmic(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|(&x, _)| x > 0.0)
        .map(|(&x, &y)| (x, y))
        .unzip();
    let ln_x: Vec<f64> = xs.iter().map(|x| x.ln()).collect();
    let (a, b) = least_squares(&ln_x, &ys)?;
    let r_squared = r_squared(&xs, &ys, |x| a * x.ln() + b);
    Some(Fit {
        model: RegressionModel::Logarithmic,
        a,
        b,
        r_squared,
    })
}

fn fit_power(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|(&x, &y)| x > 0.0 && y > 0.0)
        .map(|(&x, &y)| (x, y))
        .unzip();
    let ln_x: Vec<f64> = xs.iter().map(|x| x.ln()).collect();
    let ln_y: Vec<f64> = ys.iter().map(|y| y.ln()).collect();
    let (b, ln_a) = least_squares(&ln_x, &ln_y)?;
    let a = ln_a.exp();
    let r_squared = r_squared(&xs, &ys, |x| a * x.powf(b));
    Some(Fit {
        model: RegressionModel::Power,
        a,
        b,
        r_squared,
    })
}

/// Highest R² wins; on ties the earlier model in [`CONCRETE_MODELS`] is kept.
fn fit_auto(xs: &[f64], ys: &[f64]) -> Option<Fit> {
    CONCRETE_MODELS
        .iter()
        .filter_map(|&m| fit(m, xs, ys))
        .fold(None, |best: Option<Fit>, f| match best {
            Some(b) if b.r_squared >= f.r_squared => Some(b),
            _ => Some(f),
        })
}
