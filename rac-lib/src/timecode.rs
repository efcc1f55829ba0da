//! Time codes found in RAC telemetry.
//!
//! Two time bases are used. The ground station stamps every Ramses frame with days since
//! 2000-01-01 and milliseconds of day. The satellite stamps packets and measurements with a
//! CCSDS Unsegmented Time Code (4 coarse bytes of seconds, 2 fine bytes of binary fraction)
//! counted from the GPS epoch.
//!
//! Reference: [CCSDS Time Code Formats](https://public.ccsds.org/Pubs/301x0b4e1.pdf)
use hifitime::{Duration, Epoch};
use serde::Serialize;

pub const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SEC;
/// Number of UTC seconds between the hifitime epoch (1900) and the Ramses epoch (2000)
const RAMSES_HIFIEPOCH_DELTA_SECS: i128 = 3_155_673_600;

/// CCSDS Unsegmented Time Code with 32 bits of seconds and 16 bits of fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cuc {
    pub coarse: u32,
    pub fine: u16,
}

impl Cuc {
    pub const LEN: usize = 6;

    pub fn new(coarse: u32, fine: u16) -> Self {
        Cuc { coarse, fine }
    }

    /// Decode from big-endian bytes. Returns `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(Cuc {
            coarse: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            fine: u16::from_be_bytes([buf[4], buf[5]]),
        })
    }

    /// Nanoseconds since the time code epoch.
    #[must_use]
    pub fn nanoseconds(&self) -> i64 {
        cuc_nanos(self.coarse, self.fine)
    }

    /// The time code as GPS time.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        gps_epoch(self.nanoseconds())
    }
}

/// Convert a CUC coarse/fine pair to nanoseconds.
///
/// The fine field is a base 2^16 fraction of a second. The fraction is rounded half up to the
/// nearest nanosecond using integer arithmetic only, so the result is identical on every
/// platform.
#[must_use]
pub fn cuc_nanos(coarse: u32, fine: u16) -> i64 {
    let fine_nanos = (u64::from(fine) * NANOS_PER_SEC as u64 + (1 << 15)) >> 16;
    i64::from(coarse) * NANOS_PER_SEC + fine_nanos as i64
}

/// Nanoseconds since the GPS epoch (1980-01-06) as an [Epoch].
#[must_use]
pub fn gps_epoch(nanos: i64) -> Epoch {
    Epoch::from_gpst_duration(Duration::from_total_nanoseconds(i128::from(nanos)))
}

/// Nanoseconds since 2000-01-01 UTC of a Ramses frame creation date and time.
#[must_use]
pub fn ramses_nanos(days: i32, millis_of_day: u32) -> i64 {
    i64::from(days) * NANOS_PER_DAY + i64::from(millis_of_day) * NANOS_PER_MILLI
}

/// Ramses creation nanoseconds (see [ramses_nanos]) as an [Epoch].
#[must_use]
pub fn ramses_epoch(nanos: i64) -> Epoch {
    let nanos = RAMSES_HIFIEPOCH_DELTA_SECS * i128::from(NANOS_PER_SEC) + i128::from(nanos);
    Epoch::from_utc_duration(Duration::from_total_nanoseconds(nanos))
}
