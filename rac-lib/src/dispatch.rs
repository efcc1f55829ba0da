//! Decoding of reassembled application data into instrument records.
use tracing::trace;

use crate::aez::{CcdImage, Cpru, Htr, Payload, PmData, Pwr, Rid, Sid, Stat, TcVerification};
use crate::bytes::Fields;
use crate::innosat::DataKind;
use crate::record::{Record, RecordError};

type DecodeResult<T> = std::result::Result<T, RecordError>;

fn housekeeping(record: &mut Record, fields: &mut Fields) -> DecodeResult<Payload> {
    let sid = Sid(fields.u16_be()?);
    record.sid = Some(sid);
    let payload = match sid {
        Sid::STAT => Stat::read(fields)?.into(),
        Sid::HTR => {
            let (htr, warnings) = Htr::read(fields)?;
            record.warnings.extend(warnings);
            htr.into()
        }
        Sid::PWR => {
            let (pwr, warnings) = Pwr::read(fields)?;
            record.warnings.extend(warnings);
            pwr.into()
        }
        Sid::CPRUA | Sid::CPRUB => Cpru::read(fields)?.into(),
        _ => return Err(RecordError::UnhandledSid(sid.0)),
    };
    Ok(payload)
}

fn transparent(record: &mut Record, fields: &mut Fields) -> DecodeResult<Payload> {
    let rid = Rid(fields.u16_be()?);
    record.rid = Some(rid);
    if rid.is_ccd() {
        return Ok(CcdImage::read(fields)?.into());
    }
    if rid == Rid::PM {
        return Ok(PmData::read(fields)?.into());
    }
    Err(RecordError::UnhandledRid(rid.0))
}

/// Decode the application data in `record.buffer` into a [Payload].
///
/// The kind of data is given by the data field header; housekeeping is further selected by its
/// SID and transparent data by its RID. Records that already carry an error are returned as
/// they are. On success `buffer` holds whatever the payload did not consume; on failure it is
/// left with the bytes following the last successfully read field and `error` is set.
#[must_use]
pub fn dispatch(mut record: Record) -> Record {
    if record.error.is_some() {
        return record;
    }
    let Some(data_header) = record.data_header else {
        return record.with_error(RecordError::Decode("no data field header".to_string()));
    };
    let Some(kind) = data_header.kind() else {
        return record.with_error(RecordError::UnrecognizedDataKind {
            service_type: data_header.service_type,
            subtype: data_header.service_subtype,
        });
    };

    let buffer = std::mem::take(&mut record.buffer);
    let mut fields = Fields::new(&buffer);
    let result = match kind {
        DataKind::Housekeeping => housekeeping(&mut record, &mut fields),
        DataKind::Transparent => transparent(&mut record, &mut fields),
        DataKind::Verification(kind) => TcVerification::read(kind, &mut fields)
            .map(Payload::from)
            .map_err(RecordError::from),
    };
    match result {
        Ok(payload) => {
            trace!(family = payload.family(), "decoded");
            record.payload = Some(payload);
        }
        Err(err) => record.error = Some(err),
    }
    record.buffer = fields.rest().to_vec();
    record
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hifitime::Epoch;

    use super::*;
    use crate::innosat::{DataFieldHeader, Verification};
    use crate::record::Provenance;
    use crate::timecode::Cuc;

    fn record(service_type: u8, service_subtype: u8, buf: &[u8]) -> Record {
        let origin = Arc::new(Provenance::new(
            "test",
            Epoch::from_gregorian_utc_at_midnight(2024, 1, 1),
        ));
        let mut rec = Record::new(origin);
        rec.data_header = Some(DataFieldHeader {
            pus: 0x10,
            service_type,
            service_subtype,
            time: Cuc::new(10, 0),
        });
        rec.buffer = buf.to_vec();
        rec
    }

    #[rustfmt::skip]
    const STAT: &[u8] = &[
        0x00, 0x01,             // SID
        0x02, 0x00,             // SPID
        0x03,                   // SPREV
        0x04, 0x00,             // FPID
        0x05,                   // FPREV
        0x06, 0x07, 0x08,       // SVNA, SVNB, SVNC
        0x0a, 0x00, 0x00, 0x00, // TS
        0x00, 0x80,             // TSS
        0x01,                   // MODE
        0x01, 0x00, 0x00, 0x00, // EDACE
        0x02, 0x00, 0x00, 0x00, // EDACCE
        0x03, 0x00, 0x00, 0x00, // EDACN
        0x04, 0x00, 0x00, 0x00, // SPWEOP
        0x05, 0x00, 0x00, 0x00, // SPWEEP
        0x00,                   // ANOMALY
    ];

    #[test]
    fn dispatch_stat() {
        let rec = dispatch(record(3, 25, STAT));

        assert!(rec.error.is_none(), "{:?}", rec.error);
        assert_eq!(rec.sid, Some(Sid::STAT));
        let Some(Payload::Stat(stat)) = rec.payload else {
            panic!("expected STAT, got {:?}", rec.payload);
        };
        assert_eq!(stat.spid, 2);
        assert_eq!(stat.svnc, 8);
        assert_eq!(stat.time().nanoseconds(), 10_500_000_000);
        assert_eq!(stat.spweep, 5);
        assert!(rec.buffer.is_empty());
    }

    #[test]
    fn dispatch_short_stat() {
        let rec = dispatch(record(3, 25, &STAT[..20]));

        assert_eq!(rec.sid, Some(Sid::STAT));
        assert!(rec.payload.is_none());
        assert!(matches!(rec.error, Some(RecordError::Decode(_))));
    }

    #[test]
    fn dispatch_htr_with_warnings() {
        let mut dat = vec![0x00, 0x0a];
        for _ in 0..12 {
            dat.extend_from_slice(&0u16.to_le_bytes());
        }
        let rec = dispatch(record(3, 25, &dat));

        assert!(rec.error.is_none(), "{:?}", rec.error);
        assert!(matches!(rec.payload, Some(Payload::Htr(_))));
        assert_eq!(rec.warnings.len(), 8);
    }

    #[test]
    fn dispatch_pwr_with_warning() {
        let mut dat = vec![0x00, 0x14];
        dat.extend_from_slice(&[0u8; 18]);
        let rec = dispatch(record(3, 25, &dat));

        assert!(rec.error.is_none(), "{:?}", rec.error);
        let Some(Payload::Pwr(pwr)) = rec.payload else {
            panic!("expected PWR, got {:?}", rec.payload);
        };
        assert_eq!(pwr.pwrt, -55.0);
        assert_eq!(rec.warnings.len(), 1, "{:?}", rec.warnings);
    }

    #[test]
    fn dispatch_cpru() {
        let mut dat = vec![0x00, 0x1f, 0x00];
        dat.extend_from_slice(&[0u8; 32]);
        let rec = dispatch(record(3, 25, &dat));

        assert_eq!(rec.sid, Some(Sid::CPRUB));
        assert!(matches!(rec.payload, Some(Payload::Cpru(_))));
    }

    #[test]
    fn unhandled_sid() {
        let rec = dispatch(record(3, 25, &[0x00, 0x02, 0x00]));
        assert_eq!(rec.error, Some(RecordError::UnhandledSid(2)));
        assert_eq!(rec.error.unwrap().to_string(), "unhandled SID 2");
    }

    #[test]
    fn unhandled_rid() {
        let rec = dispatch(record(128, 25, &[0x00, 0x1f]));
        assert_eq!(rec.error, Some(RecordError::UnhandledRid(31)));
    }

    #[test]
    fn unrecognized_kind() {
        let rec = dispatch(record(5, 1, STAT));
        assert_eq!(
            rec.error,
            Some(RecordError::UnrecognizedDataKind {
                service_type: 5,
                subtype: 1
            })
        );
        assert_eq!(rec.buffer, STAT);
    }

    #[test]
    fn dispatch_ccd() {
        let mut dat = vec![0x00, 0x17];
        let mut descriptor = [0u8; 53];
        descriptor[0] = 3;
        descriptor[10] = 101;
        descriptor[51] = 1; // NBC
        dat.extend_from_slice(&descriptor);
        dat.extend_from_slice(&[0x0c, 0x00]);
        dat.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        let rec = dispatch(record(128, 25, &dat));

        assert!(rec.error.is_none(), "{:?}", rec.error);
        assert_eq!(rec.rid, Some(Rid(23)));
        let Some(Payload::CcdImage(img)) = rec.payload else {
            panic!("expected CCD image, got {:?}", rec.payload);
        };
        assert_eq!(img.bad_columns, vec![12]);
        assert_eq!(img.image, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn dispatch_pm() {
        let mut dat = vec![0x00, 0x1e];
        dat.extend_from_slice(&[0u8; PmData::LEN]);
        let rec = dispatch(record(128, 25, &dat));

        assert_eq!(rec.rid, Some(Rid::PM));
        assert!(matches!(rec.payload, Some(Payload::PmData(_))));
    }

    #[test]
    fn dispatch_verification() {
        let rec = dispatch(record(1, 8, &[0x01, 0x00, 0x02, 0x00, 0x09]));

        let Some(Payload::TcVerification(tcv)) = rec.payload else {
            panic!("expected verification, got {:?}", rec.payload);
        };
        assert_eq!(tcv.kind, Verification::ExecFailure);
        assert_eq!(tcv.error_code, Some(9));
    }

    #[test]
    fn error_records_untouched() {
        let rec = record(3, 25, STAT).with_error(RecordError::Orphaned);
        let rec = dispatch(rec);

        assert_eq!(rec.error, Some(RecordError::Orphaned));
        assert!(rec.payload.is_none());
        assert_eq!(rec.buffer, STAT);
    }
}
