//! Innosat source packets.
//!
//! Source packets are CCSDS space packets with a PUS telemetry data field header and a
//! trailing CRC. All fields are big-endian.
use serde::Serialize;

use crate::record::RecordError;
use crate::timecode::Cuc;
use crate::{Error, Result};

pub type Apid = u16;

/// CRC-16/CCITT-FALSE
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);
const CRC_LEN: usize = 2;

/// Grouping flags of the packet sequence control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupingFlag {
    /// Part of a group, but neither first nor last
    Continuation = 0,
    /// First packet of a group
    Start = 1,
    /// Last packet of a group
    Stop = 2,
    /// Not part of a group
    Standalone = 3,
}

impl TryFrom<u8> for GroupingFlag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(GroupingFlag::Continuation),
            1 => Ok(GroupingFlag::Start),
            2 => Ok(GroupingFlag::Stop),
            3 => Ok(GroupingFlag::Standalone),
            _ => Err(Error::UnknownEncoding {
                field: "grouping flags",
                value: value.into(),
            }),
        }
    }
}

/// Source packet primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePacketHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: Apid,
    /// See [GroupingFlag]
    pub grouping_flags: u8,
    pub sequence_count: u16,
    /// Length of the packet data field minus one
    pub packet_length: u16,
}

impl SourcePacketHeader {
    pub const LEN: usize = 6;
    pub const SEQ_MAX: u16 = 16383;

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct the
    /// header.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);

        Some(SourcePacketHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: d1 & 0x7ff,
            grouping_flags: (d2 >> 14 & 0x3) as u8,
            sequence_count: d2 & 0x3fff,
            packet_length: d3,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let d1 = u16::from(self.version & 0x7) << 13
            | u16::from(self.type_flag & 0x1) << 12
            | u16::from(self.has_secondary_header) << 11
            | self.apid & 0x7ff;
        let d2 = u16::from(self.grouping_flags & 0x3) << 14 | self.sequence_count & 0x3fff;

        let mut buf = [0u8; Self::LEN];
        buf[0..2].copy_from_slice(&d1.to_be_bytes());
        buf[2..4].copy_from_slice(&d2.to_be_bytes());
        buf[4..6].copy_from_slice(&self.packet_length.to_be_bytes());
        buf
    }

    /// # Errors
    /// [Error::UnknownEncoding] if `grouping_flags` is not a 2-bit value.
    pub fn grouping(&self) -> Result<GroupingFlag> {
        GroupingFlag::try_from(self.grouping_flags)
    }

    /// Total length of the packet described by this header, header included.
    #[must_use]
    pub fn packet_len(&self) -> usize {
        Self::LEN + usize::from(self.packet_length) + 1
    }
}

/// Kind of application data carried by a source packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataKind {
    /// Housekeeping report, selected by a SID
    Housekeeping,
    /// CCD or photometer data, selected by a RID
    Transparent,
    /// Telecommand verification report
    Verification(Verification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verification {
    AcceptSuccess,
    AcceptFailure,
    ExecSuccess,
    ExecFailure,
}

/// PUS telemetry data field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataFieldHeader {
    pub pus: u8,
    pub service_type: u8,
    pub service_subtype: u8,
    pub time: Cuc,
}

impl DataFieldHeader {
    pub const LEN: usize = 9;

    const HOUSEKEEPING: u8 = 3;
    const TRANSPARENT: u8 = 128;
    const VERIFICATION: u8 = 1;

    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(DataFieldHeader {
            pus: buf[0],
            service_type: buf[1],
            service_subtype: buf[2],
            time: Cuc::decode(&buf[3..])?,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0] = self.pus;
        buf[1] = self.service_type;
        buf[2] = self.service_subtype;
        buf[3..7].copy_from_slice(&self.time.coarse.to_be_bytes());
        buf[7..9].copy_from_slice(&self.time.fine.to_be_bytes());
        buf
    }

    /// Packet time in nanoseconds since the GPS epoch.
    #[must_use]
    pub fn nanoseconds(&self) -> i64 {
        self.time.nanoseconds()
    }

    /// Classify the application data. `None` for service type/subtype combinations that do
    /// not carry instrument data.
    #[must_use]
    pub fn kind(&self) -> Option<DataKind> {
        match (self.service_type, self.service_subtype) {
            (Self::HOUSEKEEPING, 25) => Some(DataKind::Housekeeping),
            (Self::TRANSPARENT, 25) => Some(DataKind::Transparent),
            (Self::VERIFICATION, 1) => Some(DataKind::Verification(Verification::AcceptSuccess)),
            (Self::VERIFICATION, 2) => Some(DataKind::Verification(Verification::AcceptFailure)),
            (Self::VERIFICATION, 7) => Some(DataKind::Verification(Verification::ExecSuccess)),
            (Self::VERIFICATION, 8) => Some(DataKind::Verification(Verification::ExecFailure)),
            _ => None,
        }
    }
}

/// CRC-16/CCITT-FALSE of `dat`.
#[must_use]
pub fn checksum(dat: &[u8]) -> u16 {
    CRC.checksum(dat)
}

/// A decoded source packet.
///
/// A packet whose framing could be decoded but whose content is not trustworthy still carries
/// the decoded headers along with `error`.
#[derive(Debug, Clone)]
pub struct SourcePacket {
    pub header: SourcePacketHeader,
    pub data_header: Option<DataFieldHeader>,
    /// Application data, i.e., everything between the data field header and the CRC
    pub data: Vec<u8>,
    pub error: Option<RecordError>,
}

impl SourcePacket {
    /// Minimum size of a packet with a data field header and CRC
    pub const MIN_LEN: usize = SourcePacketHeader::LEN + DataFieldHeader::LEN + CRC_LEN;

    /// Decode a packet from the start of `buf`. Bytes beyond the length declared in the header
    /// are ignored.
    ///
    /// # Errors
    /// [RecordError::SourceTruncated] if the primary header itself cannot be decoded.
    pub fn decode(buf: &[u8]) -> std::result::Result<Self, RecordError> {
        let header = SourcePacketHeader::decode(buf).ok_or(RecordError::SourceTruncated {
            actual: buf.len(),
            needed: SourcePacketHeader::LEN,
        })?;
        let total = header.packet_len();

        if buf.len() < total || total < Self::MIN_LEN {
            let data_header = DataFieldHeader::decode(&buf[SourcePacketHeader::LEN..]);
            return Ok(SourcePacket {
                header,
                data_header,
                data: buf
                    .get(SourcePacketHeader::LEN + DataFieldHeader::LEN..)
                    .unwrap_or_default()
                    .to_vec(),
                error: Some(RecordError::SourceTruncated {
                    actual: buf.len(),
                    needed: total.max(Self::MIN_LEN),
                }),
            });
        }

        let packet = &buf[..total];
        let (body, crc) = packet.split_at(total - CRC_LEN);
        let expected = u16::from_be_bytes([crc[0], crc[1]]);
        let computed = checksum(body);
        let error = (computed != expected).then_some(RecordError::ChecksumBad { computed, expected });

        Ok(SourcePacket {
            header,
            data_header: DataFieldHeader::decode(&body[SourcePacketHeader::LEN..]),
            data: body[SourcePacketHeader::LEN + DataFieldHeader::LEN..].to_vec(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(flags: u8, data: &[u8]) -> Vec<u8> {
        let header = SourcePacketHeader {
            version: 0,
            type_flag: 0,
            has_secondary_header: true,
            apid: 100,
            grouping_flags: flags,
            sequence_count: 7,
            packet_length: (DataFieldHeader::LEN + data.len() + CRC_LEN - 1) as u16,
        };
        let data_header = DataFieldHeader {
            pus: 0x10,
            service_type: 3,
            service_subtype: 25,
            time: Cuc::new(10, 0xc000),
        };
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&data_header.to_bytes());
        buf.extend_from_slice(data);
        let crc = checksum(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf
    }

    #[test]
    fn crc_check_value() {
        assert_eq!(checksum(b"123456789"), 0x29b1);
    }

    #[test]
    fn decode_header() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            0x08, 0x64, // secondary header flag, apid 100
            0xc0, 0x07, // standalone, sequence count 7
            0x00, 0x0c,
        ];
        let header = SourcePacketHeader::decode(dat).unwrap();

        assert_eq!(header.version, 0);
        assert_eq!(header.type_flag, 0);
        assert!(header.has_secondary_header);
        assert_eq!(header.apid, 100);
        assert_eq!(header.grouping().unwrap(), GroupingFlag::Standalone);
        assert_eq!(header.sequence_count, 7);
        assert_eq!(header.packet_len(), 19);
        assert_eq!(header.to_bytes(), dat);
    }

    #[test]
    fn grouping_flags() {
        for (bits, flag) in [
            (0, GroupingFlag::Continuation),
            (1, GroupingFlag::Start),
            (2, GroupingFlag::Stop),
            (3, GroupingFlag::Standalone),
        ] {
            assert_eq!(GroupingFlag::try_from(bits).unwrap(), flag);
        }
        assert!(matches!(
            GroupingFlag::try_from(4),
            Err(Error::UnknownEncoding { value: 4, .. })
        ));
    }

    #[test]
    fn data_kinds() {
        let mut header = DataFieldHeader {
            pus: 0,
            service_type: 3,
            service_subtype: 25,
            time: Cuc::new(0, 0),
        };
        assert_eq!(header.kind(), Some(DataKind::Housekeeping));
        header.service_type = 128;
        assert_eq!(header.kind(), Some(DataKind::Transparent));
        header.service_type = 1;
        header.service_subtype = 8;
        assert_eq!(
            header.kind(),
            Some(DataKind::Verification(Verification::ExecFailure))
        );
        header.service_subtype = 25;
        assert_eq!(header.kind(), None);
    }

    #[test]
    fn decode_packet() {
        let dat = packet(3, &[0x00, 0x01, 0xaa, 0xbb]);
        let packet = SourcePacket::decode(&dat).unwrap();

        assert!(packet.error.is_none(), "{:?}", packet.error);
        assert_eq!(packet.data, vec![0x00, 0x01, 0xaa, 0xbb]);
        let data_header = packet.data_header.unwrap();
        assert_eq!(data_header.nanoseconds(), 10_750_000_000);
        assert_eq!(data_header.kind(), Some(DataKind::Housekeeping));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut dat = packet(3, &[1, 2, 3]);
        dat.extend_from_slice(&[0xff; 5]);
        let packet = SourcePacket::decode(&dat).unwrap();

        assert!(packet.error.is_none(), "{:?}", packet.error);
        assert_eq!(packet.data, vec![1, 2, 3]);
    }

    #[test]
    fn truncated_packet_keeps_header() {
        let dat = packet(1, &[1, 2, 3, 4, 5, 6]);
        let packet = SourcePacket::decode(&dat[..dat.len() - 3]).unwrap();

        assert_eq!(packet.header.grouping().unwrap(), GroupingFlag::Start);
        assert!(packet.data_header.is_some());
        assert!(
            matches!(packet.error, Some(RecordError::SourceTruncated { .. })),
            "got {:?}",
            packet.error
        );
    }

    #[test]
    fn length_field_flips() {
        let dat = packet(3, &[0x00, 0x01, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

        // 18 -> 16: still inside the buffer, CRC read from the wrong place
        let mut shorter = dat.clone();
        shorter[5] ^= 0x02;
        let packet = SourcePacket::decode(&shorter).unwrap();
        assert!(
            matches!(packet.error, Some(RecordError::ChecksumBad { .. })),
            "got {:?}",
            packet.error
        );

        // 18 -> 274: beyond the end of the buffer
        let mut longer = dat.clone();
        longer[4] ^= 0x01;
        let packet = SourcePacket::decode(&longer).unwrap();
        assert_eq!(
            packet.error,
            Some(RecordError::SourceTruncated {
                actual: dat.len(),
                needed: 281
            })
        );
    }

    #[test]
    fn missing_primary_header() {
        let err = SourcePacket::decode(&[0x08, 0x64]).unwrap_err();
        assert_eq!(
            err,
            RecordError::SourceTruncated {
                actual: 2,
                needed: 6
            }
        );
    }

    #[test]
    fn any_bit_flip_fails_checksum() {
        let dat = packet(3, &[0x00, 0x01, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
        assert!(SourcePacket::decode(&dat).unwrap().error.is_none());

        for bit in 0..(dat.len() - CRC_LEN) * 8 {
            let mut flipped = dat.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let packet = SourcePacket::decode(&flipped).unwrap();

            if (4..6).contains(&(bit / 8)) {
                // a different packet length moves the CRC or runs past the data
                assert!(
                    matches!(
                        packet.error,
                        Some(RecordError::SourceTruncated { .. } | RecordError::ChecksumBad { .. })
                    ),
                    "bit {bit}: got {:?}",
                    packet.error
                );
            } else {
                assert!(
                    matches!(packet.error, Some(RecordError::ChecksumBad { .. })),
                    "bit {bit}: got {:?}",
                    packet.error
                );
            }
        }
    }
}
