use serde::Serialize;

use crate::bytes::Fields;
use crate::record::Column;
use crate::timecode::Cuc;
use crate::Result;

/// Photometer measurement.
///
/// Each photometer reports sums and sample counters of two thermistor inputs (A, B) and the
/// photo diode signal (S).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PmData {
    /// Exposure start, CUC seconds
    pub expts: u32,
    /// Exposure start, CUC fraction
    pub exptss: u16,
    pub pm1a: u32,
    pub pm1acntr: u32,
    pub pm1b: u32,
    pub pm1bcntr: u32,
    pub pm1s: u32,
    pub pm1scntr: u32,
    pub pm2a: u32,
    pub pm2acntr: u32,
    pub pm2b: u32,
    pub pm2bcntr: u32,
    pub pm2s: u32,
    pub pm2scntr: u32,
}

impl PmData {
    pub const LEN: usize = 54;

    pub(crate) fn read(fields: &mut Fields) -> Result<Self> {
        Ok(PmData {
            expts: fields.u32_le()?,
            exptss: fields.u16_le()?,
            pm1a: fields.u32_le()?,
            pm1acntr: fields.u32_le()?,
            pm1b: fields.u32_le()?,
            pm1bcntr: fields.u32_le()?,
            pm1s: fields.u32_le()?,
            pm1scntr: fields.u32_le()?,
            pm2a: fields.u32_le()?,
            pm2acntr: fields.u32_le()?,
            pm2b: fields.u32_le()?,
            pm2bcntr: fields.u32_le()?,
            pm2s: fields.u32_le()?,
            pm2scntr: fields.u32_le()?,
        })
    }

    #[must_use]
    pub fn time(&self) -> Cuc {
        Cuc::new(self.expts, self.exptss)
    }

    pub const COLUMNS: &'static [Column<PmData>] = &[
        Column {
            name: "PMTIME",
            value: |p| p.time().epoch().to_string(),
        },
        Column {
            name: "PMNANO",
            value: |p| p.time().nanoseconds().to_string(),
        },
        Column {
            name: "PM1A",
            value: |p| p.pm1a.to_string(),
        },
        Column {
            name: "PM1ACNTR",
            value: |p| p.pm1acntr.to_string(),
        },
        Column {
            name: "PM1B",
            value: |p| p.pm1b.to_string(),
        },
        Column {
            name: "PM1BCNTR",
            value: |p| p.pm1bcntr.to_string(),
        },
        Column {
            name: "PM1S",
            value: |p| p.pm1s.to_string(),
        },
        Column {
            name: "PM1SCNTR",
            value: |p| p.pm1scntr.to_string(),
        },
        Column {
            name: "PM2A",
            value: |p| p.pm2a.to_string(),
        },
        Column {
            name: "PM2ACNTR",
            value: |p| p.pm2acntr.to_string(),
        },
        Column {
            name: "PM2B",
            value: |p| p.pm2b.to_string(),
        },
        Column {
            name: "PM2BCNTR",
            value: |p| p.pm2bcntr.to_string(),
        },
        Column {
            name: "PM2S",
            value: |p| p.pm2s.to_string(),
        },
        Column {
            name: "PM2SCNTR",
            value: |p| p.pm2scntr.to_string(),
        },
    ];
}
