//! Ramses ground station framing.
//!
//! Every RAC record starts with a 16 byte little-endian Ramses header, followed by an optional
//! secure sub-header, the OHBSE TM header and finally the Innosat source packet. The Ramses
//! `length` covers everything after the Ramses header.
mod reader;

use hifitime::Epoch;
use serde::Serialize;

use crate::{timecode, Error, Result};

pub use reader::{read_frames, FrameReader, Input};

/// Outer Ramses header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RamsesHeader {
    pub sync: u16,
    /// Number of bytes following this header
    pub length: u16,
    pub port: u16,
    pub kind: u8,
    pub secure: u8,
    /// Milliseconds since midnight
    pub time: u32,
    /// Days since 2000-01-01
    pub date: i32,
}

impl RamsesHeader {
    pub const LEN: usize = 16;
    pub const SYNC: u16 = 0xeb90;

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct the
    /// header.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(RamsesHeader {
            sync: u16::from_le_bytes([buf[0], buf[1]]),
            length: u16::from_le_bytes([buf[2], buf[3]]),
            port: u16::from_le_bytes([buf[4], buf[5]]),
            kind: buf[6],
            secure: buf[7],
            time: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            date: i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..2].copy_from_slice(&self.sync.to_le_bytes());
        buf[2..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..6].copy_from_slice(&self.port.to_le_bytes());
        buf[6] = self.kind;
        buf[7] = self.secure;
        buf[8..12].copy_from_slice(&self.time.to_le_bytes());
        buf[12..16].copy_from_slice(&self.date.to_le_bytes());
        buf
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sync == Self::SYNC
    }

    /// True when a [SecureHeader] follows this header.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure & 0x1 == 1
    }

    /// Frame creation time in nanoseconds since 2000-01-01.
    #[must_use]
    pub fn nanoseconds(&self) -> i64 {
        timecode::ramses_nanos(self.date, self.time)
    }

    #[must_use]
    pub fn created(&self) -> Epoch {
        timecode::ramses_epoch(self.nanoseconds())
    }
}

/// Ramses secure transmission sub-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecureHeader {
    pub ip_address: u32,
    pub port: u16,
    pub sequence: u16,
    pub retransmission: u16,
    pub acknowledge: u16,
}

impl SecureHeader {
    pub const LEN: usize = 16;

    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(SecureHeader {
            ip_address: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            port: u16::from_le_bytes([buf[4], buf[5]]),
            sequence: u16::from_le_bytes([buf[6], buf[7]]),
            retransmission: u16::from_le_bytes([buf[8], buf[9]]),
            acknowledge: u16::from_le_bytes([buf[10], buf[11]]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityIndicator {
    Complete,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LossFlag {
    NoLoss,
    PossibleLoss,
}

/// OHBSE TM header describing the reception of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TmHeader {
    pub quality_indicator: u8,
    pub loss_flag: u8,
    pub vc_frame_counter: u8,
}

impl TmHeader {
    pub const LEN: usize = 16;

    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(TmHeader {
            quality_indicator: buf[8],
            loss_flag: buf[9],
            vc_frame_counter: buf[10],
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[8] = self.quality_indicator;
        buf[9] = self.loss_flag;
        buf[10] = self.vc_frame_counter;
        buf
    }

    /// # Errors
    /// [Error::UnknownEncoding] for values other than 0 and 1.
    pub fn quality(&self) -> Result<QualityIndicator> {
        match self.quality_indicator {
            0 => Ok(QualityIndicator::Complete),
            1 => Ok(QualityIndicator::Incomplete),
            value => Err(Error::UnknownEncoding {
                field: "quality indicator",
                value: value.into(),
            }),
        }
    }

    /// # Errors
    /// [Error::UnknownEncoding] for values other than 0 and 1.
    pub fn loss(&self) -> Result<LossFlag> {
        match self.loss_flag {
            0 => Ok(LossFlag::NoLoss),
            1 => Ok(LossFlag::PossibleLoss),
            value => Err(Error::UnknownEncoding {
                field: "loss flag",
                value: value.into(),
            }),
        }
    }
}
