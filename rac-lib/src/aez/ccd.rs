use std::fmt::Display;

use serde::Serialize;

use crate::bytes::Fields;
use crate::record::Column;
use crate::timecode::Cuc;
use crate::{Error, Result};

/// JPEGQ value of images that are not compressed but raw 16 bit pixels.
pub const JPEGQ_UNCOMPRESSED_16BIT: u8 = 101;

/// How many more columns an image has than NCOL reports.
pub const NCOL_START_OFFSET: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WdwMode {
    /// WDWOV counts bit window overflows
    Manual,
    /// Window selected depending on input data
    Automatic,
}

/// Image window mode composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Wdw(pub u8);

impl Wdw {
    /// Bit 7.
    #[must_use]
    pub fn mode(&self) -> WdwMode {
        if self.0 & 0x80 == 0 {
            WdwMode::Manual
        } else {
            WdwMode::Automatic
        }
    }

    /// The (high, low) bits of the original pixel depth that were kept, bits 2..0.
    ///
    /// # Errors
    /// [Error::UnknownEncoding] for the codes 5 and 6.
    pub fn input_data_window(&self) -> Result<(u8, u8)> {
        match self.0 & 0b111 {
            0 => Ok((11, 0)),
            1 => Ok((12, 1)),
            2 => Ok((13, 2)),
            3 => Ok((14, 3)),
            4 => Ok((15, 4)),
            7 => Ok((15, 0)),
            code => Err(Error::UnknownEncoding {
                field: "WDW input data window",
                value: u32::from(code),
            }),
        }
    }
}

/// Column binning composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NcBin(pub u16);

impl NcBin {
    /// Columns binned in the FPGA, encoded as a power of two in bits 11..8.
    #[must_use]
    pub fn fpga_columns(&self) -> u32 {
        1 << ((self.0 >> 8) & 0xF)
    }

    /// Columns binned on the CCD, bits 7..0.
    #[must_use]
    pub fn ccd_columns(&self) -> u16 {
        self.0 & 0xFF
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GainMode {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GainTiming {
    /// Used for binned and discarded pixels
    Faster,
    /// Used even for pixels that are not read out
    Full,
}

/// Gain composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CcdGain(pub u16);

impl CcdGain {
    #[must_use]
    pub fn mode(&self) -> GainMode {
        if self.0 & 0x1000 == 0 {
            GainMode::High
        } else {
            GainMode::Low
        }
    }

    #[must_use]
    pub fn timing(&self) -> GainTiming {
        if self.0 & 0x100 == 0 {
            GainTiming::Faster
        } else {
            GainTiming::Full
        }
    }

    /// Number of bits truncated (digital gain).
    #[must_use]
    pub fn truncation(&self) -> u8 {
        (self.0 & 0xF) as u8
    }
}

impl Display for WdwMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Display for GainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Display for GainTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Fixed portion of a CCD image descriptor, reported by the CCD readout box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CcdImagePackData {
    /// CCD sensor number
    pub ccdsel: u8,
    /// Exposure start, CUC seconds
    pub expts: u32,
    /// Exposure start, CUC fraction
    pub exptss: u16,
    pub wdw: Wdw,
    /// Bit window overflow counter, zero when WDW is automatic
    pub wdwov: u16,
    /// JPEG quality 0..100, or [JPEGQ_UNCOMPRESSED_16BIT]
    pub jpegq: u8,
    /// Frame count since boot
    pub frame: u16,
    pub nrow: u16,
    pub nrbin: u16,
    pub nrskip: u16,
    /// Columns in image, starting at 0
    pub ncol: u16,
    pub ncbin: NcBin,
    pub ncskip: u16,
    /// Pre-exposure flushes
    pub nflush: u16,
    /// Exposure time in milliseconds
    pub texpms: u32,
    pub gain: CcdGain,
    /// ADC temperature
    pub temp: u16,
    /// Overflows detected while binning
    pub fbinov: u16,
    /// Leading blanks average
    pub lblnk: u16,
    /// Trailing blanks average
    pub tblnk: u16,
    pub zero: u16,
    pub timing1: u16,
    pub timing2: u16,
    pub version: u16,
    pub timing3: u16,
    /// Number of bad columns following the fixed fields
    pub nbc: u16,
}

impl CcdImagePackData {
    pub const LEN: usize = 53;

    pub(crate) fn read(fields: &mut Fields) -> Result<Self> {
        Ok(CcdImagePackData {
            ccdsel: fields.u8()?,
            expts: fields.u32_le()?,
            exptss: fields.u16_le()?,
            wdw: Wdw(fields.u8()?),
            wdwov: fields.u16_le()?,
            jpegq: fields.u8()?,
            frame: fields.u16_le()?,
            nrow: fields.u16_le()?,
            nrbin: fields.u16_le()?,
            nrskip: fields.u16_le()?,
            ncol: fields.u16_le()?,
            ncbin: NcBin(fields.u16_le()?),
            ncskip: fields.u16_le()?,
            nflush: fields.u16_le()?,
            texpms: fields.u32_le()?,
            gain: CcdGain(fields.u16_le()?),
            temp: fields.u16_le()?,
            fbinov: fields.u16_le()?,
            lblnk: fields.u16_le()?,
            tblnk: fields.u16_le()?,
            zero: fields.u16_le()?,
            timing1: fields.u16_le()?,
            timing2: fields.u16_le()?,
            version: fields.u16_le()?,
            timing3: fields.u16_le()?,
            nbc: fields.u16_le()?,
        })
    }

    #[must_use]
    pub fn time(&self) -> Cuc {
        Cuc::new(self.expts, self.exptss)
    }

    /// Actual number of image columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        usize::from(self.ncol) + usize::from(NCOL_START_OFFSET)
    }

    #[must_use]
    pub fn is_jpeg(&self) -> bool {
        self.jpegq <= 100
    }
}

/// CCD image descriptor with its bad columns and the still encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CcdImage {
    pub pack_data: CcdImagePackData,
    pub bad_columns: Vec<u16>,
    /// Image bytes, raw or JPEG depending on JPEGQ. Not parsed here.
    #[serde(skip)]
    pub image: Vec<u8>,
}

impl CcdImage {
    /// Reads the fixed fields, then NBC bad columns. Whatever follows is the image.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if the declared bad columns do not fit, and
    /// [Error::UnknownEncoding] for an invalid window code.
    pub(crate) fn read(fields: &mut Fields) -> Result<Self> {
        let pack_data = CcdImagePackData::read(fields)?;
        pack_data.wdw.input_data_window()?;
        let mut bad_columns = Vec::with_capacity(usize::from(pack_data.nbc));
        let nbc_bytes = fields.take(2 * usize::from(pack_data.nbc))?;
        for chunk in nbc_bytes.chunks_exact(2) {
            bad_columns.push(u16::from_le_bytes([chunk[0], chunk[1]]));
        }
        let image = fields.rest().to_vec();
        fields.skip(image.len())?;
        Ok(CcdImage {
            pack_data,
            bad_columns,
            image,
        })
    }

    pub const COLUMNS: &'static [Column<CcdImage>] = &[
        Column {
            name: "CCDSEL",
            value: |c| c.pack_data.ccdsel.to_string(),
        },
        Column {
            name: "EXPNanoseconds",
            value: |c| c.pack_data.time().nanoseconds().to_string(),
        },
        Column {
            name: "EXPDate",
            value: |c| c.pack_data.time().epoch().to_string(),
        },
        Column {
            name: "WDWMode",
            value: |c| c.pack_data.wdw.mode().to_string(),
        },
        Column {
            name: "WDWInputDataWindow",
            value: |c| match c.pack_data.wdw.input_data_window() {
                Ok((high, low)) => format!("{high}..{low}"),
                Err(_) => String::default(),
            },
        },
        Column {
            name: "WDWOV",
            value: |c| c.pack_data.wdwov.to_string(),
        },
        Column {
            name: "JPEGQ",
            value: |c| c.pack_data.jpegq.to_string(),
        },
        Column {
            name: "FRAME",
            value: |c| c.pack_data.frame.to_string(),
        },
        Column {
            name: "NROW",
            value: |c| c.pack_data.nrow.to_string(),
        },
        Column {
            name: "NRBIN",
            value: |c| c.pack_data.nrbin.to_string(),
        },
        Column {
            name: "NRSKIP",
            value: |c| c.pack_data.nrskip.to_string(),
        },
        Column {
            name: "NCOL",
            value: |c| c.pack_data.ncol.to_string(),
        },
        Column {
            name: "NCBINFPGAColumns",
            value: |c| c.pack_data.ncbin.fpga_columns().to_string(),
        },
        Column {
            name: "NCBINCCDColumns",
            value: |c| c.pack_data.ncbin.ccd_columns().to_string(),
        },
        Column {
            name: "NCSKIP",
            value: |c| c.pack_data.ncskip.to_string(),
        },
        Column {
            name: "NFLUSH",
            value: |c| c.pack_data.nflush.to_string(),
        },
        Column {
            name: "TEXPMS",
            value: |c| c.pack_data.texpms.to_string(),
        },
        Column {
            name: "GAINMode",
            value: |c| c.pack_data.gain.mode().to_string(),
        },
        Column {
            name: "GAINTiming",
            value: |c| c.pack_data.gain.timing().to_string(),
        },
        Column {
            name: "GAINTruncation",
            value: |c| c.pack_data.gain.truncation().to_string(),
        },
        Column {
            name: "TEMP",
            value: |c| c.pack_data.temp.to_string(),
        },
        Column {
            name: "FBINOV",
            value: |c| c.pack_data.fbinov.to_string(),
        },
        Column {
            name: "LBLNK",
            value: |c| c.pack_data.lblnk.to_string(),
        },
        Column {
            name: "TBLNK",
            value: |c| c.pack_data.tblnk.to_string(),
        },
        Column {
            name: "ZERO",
            value: |c| c.pack_data.zero.to_string(),
        },
        Column {
            name: "TIMING1",
            value: |c| c.pack_data.timing1.to_string(),
        },
        Column {
            name: "TIMING2",
            value: |c| c.pack_data.timing2.to_string(),
        },
        Column {
            name: "VERSION",
            value: |c| c.pack_data.version.to_string(),
        },
        Column {
            name: "TIMING3",
            value: |c| c.pack_data.timing3.to_string(),
        },
        Column {
            name: "NBC",
            value: |c| c.pack_data.nbc.to_string(),
        },
        Column {
            name: "BadColumns",
            value: |c| {
                let cols: Vec<String> = c.bad_columns.iter().map(u16::to_string).collect();
                cols.join(" ")
            },
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn descriptor(wdw: u8, nbc: u16) -> Vec<u8> {
        let mut dat = vec![0u8; CcdImagePackData::LEN];
        dat[0] = 3; // CCDSEL
        dat[1..5].copy_from_slice(&10u32.to_le_bytes());
        dat[5..7].copy_from_slice(&0x4000u16.to_le_bytes());
        dat[7] = wdw;
        dat[10] = JPEGQ_UNCOMPRESSED_16BIT;
        dat[13..15].copy_from_slice(&2u16.to_le_bytes()); // NROW
        dat[19..21].copy_from_slice(&1u16.to_le_bytes()); // NCOL
        dat[21..23].copy_from_slice(&0x0302u16.to_le_bytes()); // NCBIN
        dat[31..33].copy_from_slice(&0x1105u16.to_le_bytes()); // GAIN
        dat[51..53].copy_from_slice(&nbc.to_le_bytes());
        dat
    }

    #[test_case(0b000, Some((11, 0)))]
    #[test_case(0b001, Some((12, 1)))]
    #[test_case(0b010, Some((13, 2)))]
    #[test_case(0b011, Some((14, 3)))]
    #[test_case(0b100, Some((15, 4)))]
    #[test_case(0b101, None)]
    #[test_case(0b110, None)]
    #[test_case(0b111, Some((15, 0)))]
    #[test_case(0b1000_0111, Some((15, 0)); "mode bit ignored")]
    fn input_data_window(wdw: u8, expected: Option<(u8, u8)>) {
        assert_eq!(Wdw(wdw).input_data_window().ok(), expected);
    }

    #[test]
    fn wdw_mode() {
        assert_eq!(Wdw(0).mode(), WdwMode::Manual);
        assert_eq!(Wdw(0x80).mode(), WdwMode::Automatic);
    }

    #[test]
    fn bitfields() {
        let ncbin = NcBin(0x0302);
        assert_eq!(ncbin.fpga_columns(), 8);
        assert_eq!(ncbin.ccd_columns(), 2);

        let gain = CcdGain(0x1105);
        assert_eq!(gain.mode(), GainMode::Low);
        assert_eq!(gain.timing(), GainTiming::Full);
        assert_eq!(gain.truncation(), 5);
        assert_eq!(CcdGain(0).mode(), GainMode::High);
        assert_eq!(CcdGain(0).timing(), GainTiming::Faster);
    }

    #[test]
    fn decode_with_bad_columns_and_image() {
        let mut dat = descriptor(0x87, 2);
        dat.extend_from_slice(&[0x07, 0x00, 0x09, 0x01]);
        dat.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);

        let mut fields = Fields::new(&dat);
        let img = CcdImage::read(&mut fields).unwrap();

        assert_eq!(img.pack_data.ccdsel, 3);
        assert_eq!(img.pack_data.time().nanoseconds(), 10_250_000_000);
        assert_eq!(img.pack_data.nrow, 2);
        assert_eq!(img.pack_data.columns(), 2);
        assert!(!img.pack_data.is_jpeg());
        assert_eq!(img.bad_columns, vec![7, 0x0109]);
        assert_eq!(img.image, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert!(fields.rest().is_empty());
    }

    #[test]
    fn too_many_bad_columns() {
        let mut dat = descriptor(0, 3);
        dat.extend_from_slice(&[0x07, 0x00, 0x09, 0x01]);

        let err = CcdImage::read(&mut Fields::new(&dat)).unwrap_err();
        assert!(matches!(err, Error::NotEnoughData { .. }), "got {err:?}");
    }

    #[test]
    fn invalid_window_is_an_error() {
        let dat = descriptor(0b101, 0);
        let err = CcdImage::read(&mut Fields::new(&dat)).unwrap_err();
        assert!(matches!(err, Error::UnknownEncoding { value: 5, .. }), "got {err:?}");
    }

    #[test]
    fn columns_match_headers() {
        let dat = descriptor(0, 0);
        let img = CcdImage::read(&mut Fields::new(&dat)).unwrap();
        let row: Vec<String> = CcdImage::COLUMNS.iter().map(|c| (c.value)(&img)).collect();
        assert_eq!(row.len(), CcdImage::COLUMNS.len());
        assert_eq!(row[4], "11..0");
        assert_eq!(row[12], "8");
    }
}
