//! Instrument records of the MATS payload (AEZ).
//!
//! Record bodies are little-endian. The SID/RID discriminant that selects them is read
//! big-endian by the dispatcher.
mod ccd;
mod cpru;
mod htr;
mod pm;
mod pwr;
mod stat;
mod verification;

use std::fmt::Display;

use derive_more::From;
use serde::Serialize;

use crate::record::{column_names, column_values};

pub use ccd::{
    CcdGain, CcdImage, CcdImagePackData, GainMode, GainTiming, NcBin, Wdw, WdwMode,
    JPEGQ_UNCOMPRESSED_16BIT, NCOL_START_OFFSET,
};
pub use cpru::Cpru;
pub use htr::{Htr, HTR_RESISTANCES, HTR_TEMPERATURES};
pub use pm::PmData;
pub use pwr::Pwr;
pub use stat::Stat;
pub use verification::TcVerification;

/// Volts per ADC count of the 12 bit converters.
pub(crate) const VOLTAGE_CONSTANT: f64 = 2.5 / 4095.0;

pub(crate) fn adc_voltage(raw: u16) -> f64 {
    VOLTAGE_CONSTANT * f64::from(raw)
}

/// Housekeeping report identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Sid(pub u16);

impl Sid {
    pub const STAT: Sid = Sid(1);
    pub const HTR: Sid = Sid(10);
    pub const PWR: Sid = Sid(20);
    pub const CPRUA: Sid = Sid(30);
    pub const CPRUB: Sid = Sid(31);

    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Sid::STAT => Some("STAT"),
            Sid::HTR => Some("HTR"),
            Sid::PWR => Some("PWR"),
            Sid::CPRUA => Some("CPRUA"),
            Sid::CPRUB => Some("CPRUB"),
            _ => None,
        }
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "SID({})", self.0),
        }
    }
}

/// Transparent data (CCD and photometer) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rid(pub u16);

impl Rid {
    pub const CCD1: Rid = Rid(21);
    pub const CCD7: Rid = Rid(27);
    pub const PM: Rid = Rid(30);

    #[must_use]
    pub fn is_ccd(&self) -> bool {
        (Self::CCD1.0..=Self::CCD7.0).contains(&self.0)
    }

    /// CCD channel number 1 through 7.
    #[must_use]
    pub fn ccd(&self) -> Option<u16> {
        self.is_ccd().then(|| self.0 - Self::CCD1.0 + 1)
    }
}

impl Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.ccd(), *self) {
            (Some(num), _) => write!(f, "CCD{num}"),
            (None, Rid::PM) => write!(f, "PM"),
            _ => write!(f, "RID({})", self.0),
        }
    }
}

/// Decoded instrument data. The closed set of record families.
#[derive(Debug, Clone, PartialEq, Serialize, From)]
#[serde(tag = "type")]
pub enum Payload {
    Stat(Stat),
    Htr(Htr),
    Pwr(Pwr),
    Cpru(Cpru),
    CcdImage(CcdImage),
    PmData(PmData),
    TcVerification(TcVerification),
}

impl Payload {
    /// Short family name, also used to name output files.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Payload::Stat(_) => "STAT",
            Payload::Htr(_) => "HTR",
            Payload::Pwr(_) => "PWR",
            Payload::Cpru(_) => "CPRU",
            Payload::CcdImage(_) => "CCD",
            Payload::PmData(_) => "PM",
            Payload::TcVerification(_) => "TCV",
        }
    }

    #[must_use]
    pub fn csv_headers(&self) -> Vec<&'static str> {
        match self {
            Payload::Stat(_) => column_names(Stat::COLUMNS).collect(),
            Payload::Htr(_) => column_names(Htr::COLUMNS).collect(),
            Payload::Pwr(_) => column_names(Pwr::COLUMNS).collect(),
            Payload::Cpru(_) => column_names(Cpru::COLUMNS).collect(),
            Payload::CcdImage(_) => column_names(CcdImage::COLUMNS).collect(),
            Payload::PmData(_) => column_names(PmData::COLUMNS).collect(),
            Payload::TcVerification(_) => column_names(TcVerification::COLUMNS).collect(),
        }
    }

    #[must_use]
    pub fn csv_row(&self) -> Vec<String> {
        match self {
            Payload::Stat(v) => column_values(Stat::COLUMNS, v).collect(),
            Payload::Htr(v) => column_values(Htr::COLUMNS, v).collect(),
            Payload::Pwr(v) => column_values(Pwr::COLUMNS, v).collect(),
            Payload::Cpru(v) => column_values(Cpru::COLUMNS, v).collect(),
            Payload::CcdImage(v) => column_values(CcdImage::COLUMNS, v).collect(),
            Payload::PmData(v) => column_values(PmData::COLUMNS, v).collect(),
            Payload::TcVerification(v) => column_values(TcVerification::COLUMNS, v).collect(),
        }
    }
}
