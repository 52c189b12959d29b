//! Cell formatting: numeric rounding and LaTeX escaping.
//!
//! Rounding only ever touches cells that look like a plain decimal number
//! (`-12`, `3.5`, `.25`, `6.02e23`). Everything else, including headers,
//! units and `N/A`, passes through unchanged so that a mixed paste keeps its
//! labels.
//!
//! Rounding is half away from zero on the scaled value, which matches how
//! people round by hand (`0.125` → `0.13`), not the round-half-even that
//! `format!("{:.2}")` applies to the exact binary value.

use crate::config::NumberFormat;

/// Characters that must be prefixed with a backslash inside LaTeX text.
const LATEX_SPECIALS: [char; 7] = ['&', '%', '$', '#', '_', '{', '}'];

/// Largest decimal count honoured by fixed-decimal rounding.
const MAX_DECIMALS: u32 = 20;

/// Largest significant-figure count honoured; an `f64` carries no more.
pub const MAX_SIG_FIGS: u32 = 17;

/// Which artifact a formatted cell is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTarget {
    Latex,
    Csv,
}

/// Parse a cell as a number if it is written as one.
///
/// Accepted: optional sign, digits with at most one decimal point (at least
/// one digit overall), optional exponent. Rejected: `inf`, `nan`, hex,
/// thousands separators, empty strings.
pub fn parse_number(cell: &str) -> Option<f64> {
    let bytes = cell.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `true` when [`parse_number`] accepts the cell.
pub fn is_numeric(cell: &str) -> bool {
    parse_number(cell).is_some()
}

/// Round to `decimals` places and print exactly that many.
///
/// `round_fixed(3.14159, 2)` → `"3.14"`.
pub fn round_fixed(value: f64, decimals: u32) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let rounded = round_to(value, decimals as i32);
    format!("{:.*}", decimals as usize, normalise_zero(rounded))
}

/// Round to `sig_figs` significant figures, clamped to `1..=`[`MAX_SIG_FIGS`].
///
/// Digits are counted from the first non-zero digit; trailing zeros that are
/// significant are printed (`2.0` at 3 → `"2.00"`), integer-magnitude
/// results carry no decimal point (`12345` at 2 → `"12000"`).
///
/// `round_significant(0.0004567, 2)` → `"0.00046"`.
pub fn round_significant(value: f64, sig_figs: u32) -> String {
    let sig = clamp_sig(sig_figs);
    if value == 0.0 {
        return "0".to_string();
    }
    let (rounded, exponent) = round_sig_with_exponent(value, sig);
    let decimals = (sig - 1 - exponent).max(0) as usize;
    format!("{:.*}", decimals, normalise_zero(rounded))
}

/// Significant figures in exponent notation when the magnitude is below
/// 1e-3 or at least 1e4; plain significant figures otherwise.
///
/// LaTeX gets `$4.6 \times 10^{-4}$`, CSV gets `4.6e-4`.
pub fn round_scientific(value: f64, sig_figs: u32, target: CellTarget) -> String {
    let sig = clamp_sig(sig_figs);
    if value == 0.0 {
        return "0".to_string();
    }
    let mut exponent = value.abs().log10().floor() as i32;
    // Two steps so neither power of ten leaves the f64 range near 1e±308.
    let half = exponent / 2;
    let scaled = value / 10f64.powi(half) / 10f64.powi(exponent - half);
    let mut mantissa = round_to(scaled, sig - 1);
    if mantissa.abs() >= 10.0 {
        mantissa /= 10.0;
        exponent += 1;
    }
    if exponent.abs() < 4 {
        return round_significant(value, sig_figs);
    }

    let mantissa = format!("{:.*}", (sig - 1) as usize, mantissa);
    match target {
        CellTarget::Latex => format!("${mantissa} \\times 10^{{{exponent}}}$"),
        CellTarget::Csv => format!("{mantissa}e{exponent}"),
    }
}

/// Prefix LaTeX-reserved characters (`& % $ # _ { }`) with a backslash.
///
/// `escape_latex("50% & $5")` → `"50\% \& \$5"`.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if LATEX_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Apply `mode` to a numeric cell; non-numeric cells come back unchanged.
///
/// Scientific cells use their CSV spelling here; [`render_cell`] picks the
/// LaTeX one for tables.
pub fn format_cell(cell: &str, mode: NumberFormat) -> String {
    format_for(cell, mode, CellTarget::Csv)
}

/// Format a cell for `target`; LaTeX cells are escaped as well.
///
/// CSV quoting is left to the writer in [`crate::pipeline::csv`].
pub fn render_cell(cell: &str, mode: NumberFormat, target: CellTarget) -> String {
    match (mode, target) {
        (NumberFormat::Scientific(_), CellTarget::Latex) if is_numeric(cell) => {
            // Already math-mode LaTeX; escaping would break the `$…$`.
            let formatted = format_for(cell, mode, target);
            if formatted.starts_with('$') {
                formatted
            } else {
                escape_latex(&formatted)
            }
        }
        (_, CellTarget::Latex) => escape_latex(&format_for(cell, mode, target)),
        (_, CellTarget::Csv) => format_for(cell, mode, target),
    }
}

fn format_for(cell: &str, mode: NumberFormat, target: CellTarget) -> String {
    let value = match (mode, parse_number(cell)) {
        (NumberFormat::None, _) | (_, None) => return cell.to_string(),
        (_, Some(v)) => v,
    };
    match mode {
        NumberFormat::None => cell.to_string(),
        NumberFormat::FixedDecimals(n) => round_fixed(value, n),
        NumberFormat::SignificantFigures(n) => round_significant(value, n),
        NumberFormat::Scientific(n) => round_scientific(value, n, target),
    }
}

/// Round to `sig` significant figures, returning the rounded value and the
/// decimal exponent of its leading digit. The exponent is recomputed when
/// rounding carries into the next decade (9.99 → 10).
fn round_sig_with_exponent(value: f64, sig: i32) -> (f64, i32) {
    let mut exponent = value.abs().log10().floor() as i32;
    let mut rounded = round_to(value, sig - 1 - exponent);
    // Rounding up past f64::MAX.
    if !rounded.is_finite() {
        return (value, exponent);
    }
    // A value rounded to a few significant figures is never within 1e-9 of
    // the next power of ten unless it is that power.
    if rounded != 0.0 && rounded.abs() >= 10f64.powi(exponent + 1) * (1.0 - 1e-9) {
        exponent += 1;
        rounded = round_to(value, sig - 1 - exponent);
    }
    (rounded, exponent)
}

fn clamp_sig(sig_figs: u32) -> i32 {
    sig_figs.clamp(1, MAX_SIG_FIGS) as i32
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let multiplier = 10f64.powi(decimals);
    let scaled = value * multiplier;
    if !scaled.is_finite() || multiplier == 0.0 {
        return value;
    }
    scaled.round() / multiplier
}

fn normalise_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_recognised() {
        for s in ["0", "-12", "+3.5", ".25", "5.", "6.02e23", "1E-5", "-0.0"] {
            assert!(is_numeric(s), "{s} should be numeric");
        }
        for s in ["", "-", ".", "1.2.3", "1,000", "inf", "NaN", "0x1f", "1e", "12a", " 1"] {
            assert!(!is_numeric(s), "{s} should not be numeric");
        }
    }

    #[test]
    fn fixed_decimals() {
        assert_eq!(round_fixed(3.14159, 2), "3.14");
        assert_eq!(round_fixed(2.5, 0), "3");
        assert_eq!(round_fixed(-2.5, 0), "-3");
        assert_eq!(round_fixed(0.125, 2), "0.13");
        assert_eq!(round_fixed(7.0, 3), "7.000");
        assert_eq!(round_fixed(-0.001, 2), "0.00");
    }

    #[test]
    fn significant_figures() {
        assert_eq!(round_significant(0.0004567, 2), "0.00046");
        assert_eq!(round_significant(12345.0, 2), "12000");
        assert_eq!(round_significant(3.14159, 3), "3.14");
        assert_eq!(round_significant(2.0, 3), "2.00");
        assert_eq!(round_significant(-98.76, 2), "-99");
        assert_eq!(round_significant(0.0, 4), "0");
        assert_eq!(round_significant(123.0, 0), "100");
    }

    #[test]
    fn significant_figures_carry_into_next_decade() {
        assert_eq!(round_significant(9.99, 2), "10");
        assert_eq!(round_significant(0.0999, 1), "0.1");
    }

    #[test]
    fn scientific_switches_on_magnitude() {
        assert_eq!(
            round_scientific(0.0004567, 2, CellTarget::Latex),
            "$4.6 \\times 10^{-4}$"
        );
        assert_eq!(round_scientific(0.0004567, 2, CellTarget::Csv), "4.6e-4");
        assert_eq!(round_scientific(123456.0, 3, CellTarget::Csv), "1.23e5");
        assert_eq!(round_scientific(12.34, 3, CellTarget::Latex), "12.3");
        assert_eq!(round_scientific(99999.0, 2, CellTarget::Csv), "1.0e5");
    }

    #[test]
    fn latex_escaping() {
        assert_eq!(escape_latex("50% & $5"), "50\\% \\& \\$5");
        assert_eq!(escape_latex("a_b {c} #1"), "a\\_b \\{c\\} \\#1");
        assert_eq!(escape_latex("plain"), "plain");
    }

    #[test]
    fn huge_figure_counts_are_clamped() {
        assert_eq!(round_significant(1.5, 70_000), "1.5000000000000000");
        assert_eq!(round_significant(1.5, 70_000), round_significant(1.5, MAX_SIG_FIGS));
        assert_eq!(
            round_scientific(6.02e23, 200_000, CellTarget::Csv),
            round_scientific(6.02e23, MAX_SIG_FIGS, CellTarget::Csv)
        );
        assert_eq!(round_fixed(1.5, u32::MAX).len(), 22);
    }

    #[test]
    fn extreme_magnitudes_do_not_overflow() {
        assert_eq!(round_scientific(1.5e-300, 2, CellTarget::Csv), "1.5e-300");
        assert_eq!(round_scientific(-2.5e300, 2, CellTarget::Csv), "-2.5e300");
        assert_eq!(round_scientific(f64::MAX, 3, CellTarget::Csv), "1.80e308");
        assert_eq!(round_scientific(5e-324, 1, CellTarget::Csv), "5e-324");
        let back = parse_number(&round_significant(1e300, 3)).unwrap();
        assert!((back / 1e300 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn format_cell_passes_text_through() {
        let mode = NumberFormat::FixedDecimals(1);
        assert_eq!(format_cell("Temperature", mode), "Temperature");
        assert_eq!(format_cell("N/A", mode), "N/A");
        assert_eq!(format_cell("2.26", mode), "2.3");
        assert_eq!(format_cell("2.26", NumberFormat::None), "2.26");
    }

    #[test]
    fn render_cell_escapes_after_formatting() {
        let mode = NumberFormat::SignificantFigures(2);
        assert_eq!(render_cell("10%", mode, CellTarget::Latex), "10\\%");
        assert_eq!(render_cell("0.0004567", mode, CellTarget::Latex), "0.00046");
        assert_eq!(render_cell("a,b", mode, CellTarget::Csv), "a,b");
        assert_eq!(render_cell("0.0004567", mode, CellTarget::Csv), "0.00046");
    }

    #[test]
    fn render_cell_keeps_scientific_math_unescaped() {
        let mode = NumberFormat::Scientific(2);
        assert_eq!(
            render_cell("0.0004567", mode, CellTarget::Latex),
            "$4.6 \\times 10^{-4}$"
        );
        assert_eq!(render_cell("1.5", mode, CellTarget::Latex), "1.5");
        assert_eq!(render_cell("x_1", mode, CellTarget::Latex), "x\\_1");
    }
}
