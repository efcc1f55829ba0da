use serde::Serialize;

use super::adc_voltage;
use super::htr::thermistor_temperature;
use crate::bytes::Fields;
use crate::record::Column;
use crate::Result;

/// Power supply housekeeping report in physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pwr {
    /// Power supply temperature, ⁰C
    pub pwrt: f64,
    /// +32V voltage, V
    pub pwrp32v: f64,
    /// +32V current, A
    pub pwrp32c: f64,
    pub pwrp16v: f64,
    pub pwrp16c: f64,
    pub pwrm16v: f64,
    pub pwrm16c: f64,
    pub pwrp3v3: f64,
    pub pwrp3c3: f64,
}

impl Pwr {
    pub const LEN: usize = 18;

    /// Read the raw ADC values and convert them, returning any range warnings alongside.
    pub(crate) fn read(fields: &mut Fields) -> Result<(Self, Vec<String>)> {
        let mut raw = [0u16; 9];
        for value in raw.iter_mut() {
            *value = fields.u16_le()?;
        }
        let v = raw.map(adc_voltage);

        let mut warnings = Vec::default();
        let pwrt = thermistor_temperature("PWRT", 3.3 * 1000.0 / v[0] - 1000.0, &mut warnings)?;
        let pwr = Pwr {
            pwrt,
            pwrp32v: 21.0 * v[1],
            pwrp32c: 10.1 / 100.0 * v[2],
            pwrp16v: 11.0 * v[3],
            pwrp16c: 10.1 / 5.0 * v[4],
            pwrm16v: -10.0 * v[5],
            pwrm16c: 10.1 / 100.0 * v[6],
            pwrp3v3: 4.0 * v[7],
            pwrp3c3: 10.1 / 20.0 * v[8],
        };
        Ok((pwr, warnings))
    }

    pub const COLUMNS: &'static [Column<Pwr>] = &[
        Column {
            name: "PWRT",
            value: |p| p.pwrt.to_string(),
        },
        Column {
            name: "PWRP32V",
            value: |p| p.pwrp32v.to_string(),
        },
        Column {
            name: "PWRP32C",
            value: |p| p.pwrp32c.to_string(),
        },
        Column {
            name: "PWRP16V",
            value: |p| p.pwrp16v.to_string(),
        },
        Column {
            name: "PWRP16C",
            value: |p| p.pwrp16c.to_string(),
        },
        Column {
            name: "PWRM16V",
            value: |p| p.pwrm16v.to_string(),
        },
        Column {
            name: "PWRM16C",
            value: |p| p.pwrm16c.to_string(),
        },
        Column {
            name: "PWRP3V3",
            value: |p| p.pwrp3v3.to_string(),
        },
        Column {
            name: "PWRP3C3",
            value: |p| p.pwrp3c3.to_string(),
        },
    ];
}
