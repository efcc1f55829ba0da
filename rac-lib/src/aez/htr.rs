use serde::Serialize;

use super::adc_voltage;
use crate::bytes::Fields;
use crate::interpolate::interpolate;
use crate::record::Column;
use crate::Result;

/// Heater thermistor temperatures in ⁰C, matching [HTR_RESISTANCES].
pub const HTR_TEMPERATURES: [f64; 43] = [
    -55.0, -50.0, -45.0, -40.0, -35.0, -30.0, -25.0, -20.0, -15.0, -10.0, -5.0, 0.0, 5.0, 10.0,
    15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0,
    90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0, 140.0, 145.0, 150.0,
    155.0,
];

/// Heater thermistor resistances in Ohm, decreasing.
pub const HTR_RESISTANCES: [f64; 43] = [
    9.630e+05, 6.701e+05, 4.717e+05, 3.365e+05, 2.426e+05, 1.770e+05, 1.304e+05, 9.707e+04,
    7.293e+04, 5.533e+04, 4.232e+04, 3.265e+04, 2.539e+04, 1.990e+04, 1.571e+04, 1.249e+04,
    1.000e+04, 8.057e+03, 6.531e+03, 5.327e+03, 4.369e+03, 3.603e+03, 2.986e+03, 2.488e+03,
    2.083e+03, 1.752e+03, 1.481e+03, 1.258e+03, 1.072e+03, 9.177e+02, 7.885e+02, 6.800e+02,
    5.886e+02, 5.112e+02, 4.454e+02, 3.893e+02, 3.417e+02, 3.009e+02, 2.654e+02, 2.348e+02,
    2.083e+02, 1.853e+02, 1.653e+02,
];

fn resistance(raw: u16) -> f64 {
    3.3 * 3900.0 / adc_voltage(raw) - 3900.0
}

/// Temperature in ⁰C of a thermistor of the heater type. Clamping is recorded in `warnings`.
pub(crate) fn thermistor_temperature(
    name: &str,
    resistance: f64,
    warnings: &mut Vec<String>,
) -> Result<f64> {
    let (value, out_of_range) = interpolate(resistance, &HTR_RESISTANCES, &HTR_TEMPERATURES)?;
    if let Some(out_of_range) = out_of_range {
        warnings.push(format!("{name}: {out_of_range}"));
    }
    Ok(value)
}

fn temperature(name: &str, raw: u16, warnings: &mut Vec<String>) -> Result<f64> {
    thermistor_temperature(name, resistance(raw), warnings)
}

/// Heater regulator housekeeping report.
///
/// Sense channels (A, B) are temperatures in ⁰C, output drive (OD) channels are volts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Htr {
    pub htr1a: f64,
    pub htr1b: f64,
    pub htr1od: f64,
    pub htr2a: f64,
    pub htr2b: f64,
    pub htr2od: f64,
    pub htr7a: f64,
    pub htr7b: f64,
    pub htr7od: f64,
    pub htr8a: f64,
    pub htr8b: f64,
    pub htr8od: f64,
}

impl Htr {
    pub const LEN: usize = 24;

    /// Read the raw ADC values and convert them, returning any range warnings alongside.
    pub(crate) fn read(fields: &mut Fields) -> Result<(Self, Vec<String>)> {
        let mut raw = [0u16; 12];
        for value in raw.iter_mut() {
            *value = fields.u16_le()?;
        }

        let mut warnings = Vec::default();
        let w = &mut warnings;
        let htr = Htr {
            htr1a: temperature("HTR1A", raw[0], w)?,
            htr1b: temperature("HTR1B", raw[1], w)?,
            htr1od: adc_voltage(raw[2]),
            htr2a: temperature("HTR2A", raw[3], w)?,
            htr2b: temperature("HTR2B", raw[4], w)?,
            htr2od: adc_voltage(raw[5]),
            htr7a: temperature("HTR7A", raw[6], w)?,
            htr7b: temperature("HTR7B", raw[7], w)?,
            htr7od: adc_voltage(raw[8]),
            htr8a: temperature("HTR8A", raw[9], w)?,
            htr8b: temperature("HTR8B", raw[10], w)?,
            htr8od: adc_voltage(raw[11]),
        };
        Ok((htr, warnings))
    }

    pub const COLUMNS: &'static [Column<Htr>] = &[
        Column {
            name: "HTR1A",
            value: |h| h.htr1a.to_string(),
        },
        Column {
            name: "HTR1B",
            value: |h| h.htr1b.to_string(),
        },
        Column {
            name: "HTR1OD",
            value: |h| h.htr1od.to_string(),
        },
        Column {
            name: "HTR2A",
            value: |h| h.htr2a.to_string(),
        },
        Column {
            name: "HTR2B",
            value: |h| h.htr2b.to_string(),
        },
        Column {
            name: "HTR2OD",
            value: |h| h.htr2od.to_string(),
        },
        Column {
            name: "HTR7A",
            value: |h| h.htr7a.to_string(),
        },
        Column {
            name: "HTR7B",
            value: |h| h.htr7b.to_string(),
        },
        Column {
            name: "HTR7OD",
            value: |h| h.htr7od.to_string(),
        },
        Column {
            name: "HTR8A",
            value: |h| h.htr8a.to_string(),
        },
        Column {
            name: "HTR8B",
            value: |h| h.htr8b.to_string(),
        },
        Column {
            name: "HTR8OD",
            value: |h| h.htr8od.to_string(),
        },
    ];
}
