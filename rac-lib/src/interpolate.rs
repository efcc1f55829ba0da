//! Linear interpolation over calibration tables.
use std::fmt::Display;

use crate::{Error, Result};

/// Which end of a table a query fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEnd {
    /// Beyond the first entry of the x-table.
    Low,
    /// Beyond the last entry of the x-table.
    High,
}

impl Display for TableEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableEnd::Low => write!(f, "low"),
            TableEnd::High => write!(f, "high"),
        }
    }
}

/// A query outside of the table range. The result was clamped to the value at `end`.
///
/// This is a warning, not a failure; the clamped value is still usable.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("value {value} is beyond the {end} end of the table, using {clamped}")]
pub struct ValueOutOfRange {
    pub end: TableEnd,
    pub value: f64,
    pub clamped: f64,
}

/// Interpolate `x` over the monotonically decreasing `xs` with matching `ys`.
///
/// Queries at or beyond either end of `xs` return the closest `ys` endpoint together with a
/// [ValueOutOfRange].
///
/// # Errors
/// [Error::Interpolation] if the tables differ in length or have fewer than 2 entries.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> Result<(f64, Option<ValueOutOfRange>)> {
    if xs.len() != ys.len() {
        return Err(Error::Interpolation(format!(
            "tables differ in length ({} != {})",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(Error::Interpolation(format!(
            "tables must have at least 2 entries, got {}",
            xs.len()
        )));
    }

    let last = xs.len() - 1;
    if x >= xs[0] {
        return Ok((ys[0], Some(out_of_range(TableEnd::Low, x, ys[0]))));
    }
    if x <= xs[last] {
        return Ok((ys[last], Some(out_of_range(TableEnd::High, x, ys[last]))));
    }

    // first entry smaller than x; guaranteed to exist in 1..=last by the checks above
    let idx = xs.iter().position(|v| x > *v).unwrap_or(last);
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);

    Ok(((y1 - y0) / (x1 - x0) * (x - x0) + y0, None))
}

fn out_of_range(end: TableEnd, value: f64, clamped: f64) -> ValueOutOfRange {
    ValueOutOfRange {
        end,
        value,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: [f64; 4] = [100.0, 50.0, 20.0, 10.0];
    const YS: [f64; 4] = [0.0, 5.0, 10.0, 15.0];

    #[test]
    fn between_entries() {
        let (y, warning) = interpolate(35.0, &XS, &YS).unwrap();
        assert!((y - 7.5).abs() < 1e-12, "got {y}");
        assert!(warning.is_none());
    }

    #[test]
    fn at_interior_entry() {
        let (y, warning) = interpolate(50.0, &XS, &YS).unwrap();
        assert!((y - 5.0).abs() < 1e-12, "got {y}");
        assert!(warning.is_none());
    }

    #[test]
    fn clamps_at_and_beyond_low_end() {
        let (at, at_warning) = interpolate(100.0, &XS, &YS).unwrap();
        let (beyond, beyond_warning) = interpolate(1e6, &XS, &YS).unwrap();

        assert_eq!(at, 0.0);
        assert_eq!(beyond, 0.0);
        assert_eq!(at_warning.unwrap().end, TableEnd::Low);
        assert_eq!(beyond_warning.unwrap().end, TableEnd::Low);
        assert_eq!(beyond_warning.unwrap().value, 1e6);
    }

    #[test]
    fn clamps_at_and_beyond_high_end() {
        let (at, at_warning) = interpolate(10.0, &XS, &YS).unwrap();
        let (beyond, beyond_warning) = interpolate(-3.0, &XS, &YS).unwrap();

        assert_eq!(at, 15.0);
        assert_eq!(beyond, 15.0);
        assert_eq!(at_warning.unwrap().end, TableEnd::High);
        assert_eq!(beyond_warning.unwrap().end, TableEnd::High);
    }

    #[test]
    fn mismatched_tables() {
        let err = interpolate(1.0, &XS, &YS[..3]).unwrap_err();
        assert!(matches!(err, Error::Interpolation(_)), "got {err:?}");
    }

    #[test]
    fn short_tables() {
        let err = interpolate(1.0, &XS[..1], &YS[..1]).unwrap_err();
        assert!(matches!(err, Error::Interpolation(_)), "got {err:?}");
    }
}
