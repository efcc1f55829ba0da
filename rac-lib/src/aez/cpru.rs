use serde::Serialize;

use super::adc_voltage;
use crate::bytes::Fields;
use crate::record::Column;
use crate::{Error, Result};

/// CCD power regulator housekeeping report. Voltages are indexed by CCD 0 through 3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Cpru {
    /// Overvoltage fault bits [7..4], power enabled bits [3..0]
    pub stat: u8,
    pub vgate: [f64; 4],
    pub vsubs: [f64; 4],
    pub vrd: [f64; 4],
    pub vod: [f64; 4],
}

fn ccd_mask(base: u8, ccd: u8) -> Result<u8> {
    if ccd > 3 {
        return Err(Error::UnknownEncoding {
            field: "CPRU ccd",
            value: ccd.into(),
        });
    }
    Ok(base >> ccd)
}

impl Cpru {
    pub const LEN: usize = 33;

    pub(crate) fn read(fields: &mut Fields) -> Result<Self> {
        let mut cpru = Cpru {
            stat: fields.u8()?,
            ..Default::default()
        };
        for ccd in 0..4 {
            cpru.vgate[ccd] = adc_voltage(fields.u16_le()?) * 10.0;
            cpru.vsubs[ccd] = adc_voltage(fields.u16_le()?) * 11.0 / 1.5;
            cpru.vrd[ccd] = adc_voltage(fields.u16_le()?) * 17.0 / 1.5;
            cpru.vod[ccd] = adc_voltage(fields.u16_le()?) * 32.0 / 1.5;
        }
        Ok(cpru)
    }

    /// # Errors
    /// [Error::UnknownEncoding] if `ccd` is not 0 through 3.
    pub fn overvoltage_fault(&self, ccd: u8) -> Result<bool> {
        Ok(self.stat & ccd_mask(0x80, ccd)? != 0)
    }

    /// # Errors
    /// [Error::UnknownEncoding] if `ccd` is not 0 through 3.
    pub fn power_enabled(&self, ccd: u8) -> Result<bool> {
        Ok(self.stat & ccd_mask(0x08, ccd)? != 0)
    }

    pub const COLUMNS: &'static [Column<Cpru>] = &[
        Column {
            name: "VGATE0",
            value: |c| c.vgate[0].to_string(),
        },
        Column {
            name: "VSUBS0",
            value: |c| c.vsubs[0].to_string(),
        },
        Column {
            name: "VRD0",
            value: |c| c.vrd[0].to_string(),
        },
        Column {
            name: "VOD0",
            value: |c| c.vod[0].to_string(),
        },
        Column {
            name: "Overvoltage0",
            value: |c| flag(c.overvoltage_fault(0)),
        },
        Column {
            name: "Power0",
            value: |c| flag(c.power_enabled(0)),
        },
        Column {
            name: "VGATE1",
            value: |c| c.vgate[1].to_string(),
        },
        Column {
            name: "VSUBS1",
            value: |c| c.vsubs[1].to_string(),
        },
        Column {
            name: "VRD1",
            value: |c| c.vrd[1].to_string(),
        },
        Column {
            name: "VOD1",
            value: |c| c.vod[1].to_string(),
        },
        Column {
            name: "Overvoltage1",
            value: |c| flag(c.overvoltage_fault(1)),
        },
        Column {
            name: "Power1",
            value: |c| flag(c.power_enabled(1)),
        },
        Column {
            name: "VGATE2",
            value: |c| c.vgate[2].to_string(),
        },
        Column {
            name: "VSUBS2",
            value: |c| c.vsubs[2].to_string(),
        },
        Column {
            name: "VRD2",
            value: |c| c.vrd[2].to_string(),
        },
        Column {
            name: "VOD2",
            value: |c| c.vod[2].to_string(),
        },
        Column {
            name: "Overvoltage2",
            value: |c| flag(c.overvoltage_fault(2)),
        },
        Column {
            name: "Power2",
            value: |c| flag(c.power_enabled(2)),
        },
        Column {
            name: "VGATE3",
            value: |c| c.vgate[3].to_string(),
        },
        Column {
            name: "VSUBS3",
            value: |c| c.vsubs[3].to_string(),
        },
        Column {
            name: "VRD3",
            value: |c| c.vrd[3].to_string(),
        },
        Column {
            name: "VOD3",
            value: |c| c.vod[3].to_string(),
        },
        Column {
            name: "Overvoltage3",
            value: |c| flag(c.overvoltage_fault(3)),
        },
        Column {
            name: "Power3",
            value: |c| flag(c.power_enabled(3)),
        },
    ];
}

fn flag(value: Result<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
