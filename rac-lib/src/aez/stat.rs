use serde::Serialize;

use crate::bytes::Fields;
use crate::record::Column;
use crate::timecode::Cuc;
use crate::Result;

/// General status housekeeping report of the payload instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stat {
    /// Software part id
    pub spid: u16,
    /// Software part revision
    pub sprev: u8,
    /// Firmware part id
    pub fpid: u16,
    /// Firmware part revision
    pub fprev: u8,
    /// SVN revision tag A.B.C
    pub svna: u8,
    pub svnb: u8,
    pub svnc: u8,
    /// Time, CUC seconds
    pub ts: u32,
    /// Time, CUC fraction
    pub tss: u16,
    /// Payload mode 1..2
    pub mode: u8,
    /// EDAC detected single bit errors
    pub edace: u32,
    /// EDAC corrected single bit errors
    pub edacce: u32,
    /// EDAC memory scrubber passes
    pub edacn: u32,
    /// SpaceWire received EOPs
    pub spweop: u32,
    /// SpaceWire received EEPs
    pub spweep: u32,
    /// Non-zero when payload power is off
    pub anomaly: u8,
}

impl Stat {
    pub const LEN: usize = 37;

    pub(crate) fn read(fields: &mut Fields) -> Result<Self> {
        Ok(Stat {
            spid: fields.u16_le()?,
            sprev: fields.u8()?,
            fpid: fields.u16_le()?,
            fprev: fields.u8()?,
            svna: fields.u8()?,
            svnb: fields.u8()?,
            svnc: fields.u8()?,
            ts: fields.u32_le()?,
            tss: fields.u16_le()?,
            mode: fields.u8()?,
            edace: fields.u32_le()?,
            edacce: fields.u32_le()?,
            edacn: fields.u32_le()?,
            spweop: fields.u32_le()?,
            spweep: fields.u32_le()?,
            anomaly: fields.u8()?,
        })
    }

    #[must_use]
    pub fn time(&self) -> Cuc {
        Cuc::new(self.ts, self.tss)
    }

    pub const COLUMNS: &'static [Column<Stat>] = &[
        Column {
            name: "STATTIME",
            value: |s| s.time().epoch().to_string(),
        },
        Column {
            name: "STATNANO",
            value: |s| s.time().nanoseconds().to_string(),
        },
        Column {
            name: "SPID",
            value: |s| s.spid.to_string(),
        },
        Column {
            name: "SPREV",
            value: |s| s.sprev.to_string(),
        },
        Column {
            name: "FPID",
            value: |s| s.fpid.to_string(),
        },
        Column {
            name: "FPREV",
            value: |s| s.fprev.to_string(),
        },
        Column {
            name: "SVNA",
            value: |s| s.svna.to_string(),
        },
        Column {
            name: "SVNB",
            value: |s| s.svnb.to_string(),
        },
        Column {
            name: "SVNC",
            value: |s| s.svnc.to_string(),
        },
        Column {
            name: "MODE",
            value: |s| s.mode.to_string(),
        },
        Column {
            name: "EDACE",
            value: |s| s.edace.to_string(),
        },
        Column {
            name: "EDACCE",
            value: |s| s.edacce.to_string(),
        },
        Column {
            name: "EDACN",
            value: |s| s.edacn.to_string(),
        },
        Column {
            name: "SPWEOP",
            value: |s| s.spweop.to_string(),
        },
        Column {
            name: "SPWEEP",
            value: |s| s.spweep.to_string(),
        },
        Column {
            name: "ANOMALY",
            value: |s| s.anomaly.to_string(),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn decode() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            0x01, 0x02,             // SPID
            0x03,                   // SPREV
            0x04, 0x05,             // FPID
            0x06,                   // FPREV
            0x07, 0x08, 0x09,       // SVN A.B.C
            0x0a, 0x00, 0x00, 0x00, // TS
            0x00, 0xc0,             // TSS
            0x02,                   // MODE
            0x01, 0x00, 0x00, 0x00, // EDACE
            0x02, 0x00, 0x00, 0x00, // EDACCE
            0x03, 0x00, 0x00, 0x00, // EDACN
            0x04, 0x00, 0x00, 0x00, // SPWEOP
            0x05, 0x00, 0x00, 0x00, // SPWEEP
            0x00,                   // ANOMALY
        ];
        assert_eq!(dat.len(), Stat::LEN);
        let stat = Stat::read(&mut Fields::new(dat)).unwrap();

        assert_eq!(stat.spid, 0x0201);
        assert_eq!(stat.sprev, 3);
        assert_eq!(stat.fpid, 0x0504);
        assert_eq!((stat.svna, stat.svnb, stat.svnc), (7, 8, 9));
        assert_eq!(stat.time().nanoseconds(), 10_750_000_000);
        assert_eq!(stat.mode, 2);
        assert_eq!(stat.spweep, 5);
        assert_eq!(stat.anomaly, 0);
    }

    #[test]
    fn short() {
        let err = Stat::read(&mut Fields::new(&[0u8; 20])).unwrap_err();
        assert!(matches!(err, Error::NotEnoughData { .. }), "got {err:?}");
    }
}
