//! The [Record] flowing through the decode pipeline.
use std::sync::Arc;

use hifitime::Epoch;
use serde::{Serialize, Serializer};

use crate::aez::{Payload, Rid, Sid};
use crate::innosat::{DataFieldHeader, SourcePacketHeader};
use crate::ramses::{RamsesHeader, SecureHeader, TmHeader};

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// Display name of the input, usually the file path
    pub name: String,
    /// Wall-clock time the processing run started
    pub processing_time: Epoch,
}

impl Provenance {
    pub fn new(name: impl Into<String>, processing_time: Epoch) -> Self {
        Provenance {
            name: name.into(),
            processing_time,
        }
    }
}

/// Problems tied to a single record.
///
/// None of these stop the pipeline. Those produced while reading frames that make the rest of
/// an input unreadable end that input only.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("could not read input: {0}")]
    Read(String),
    #[error("could not parse ramses header, only found {actual} of {needed} bytes")]
    RamsesHeader { actual: usize, needed: usize },
    #[error("Not a valid RAC-record, sync {0:#06x}")]
    InvalidSync(u16),
    #[error("declared length {length} is too short for the {what} header")]
    LengthMismatch { what: &'static str, length: usize },
    #[error("{what} truncated, only found {actual} bytes but needed {needed}")]
    Truncated {
        what: &'static str,
        actual: usize,
        needed: usize,
    },
    #[error("source packet truncated, only found {actual} bytes but needed {needed}")]
    SourceTruncated { actual: usize, needed: usize },
    #[error("checksum bad {computed}")]
    ChecksumBad { computed: u16, expected: u16 },

    #[error("got continuation packet without a start packet")]
    ContinuationWithoutStart,
    #[error("got stop packet without a start packet")]
    StopWithoutStart,
    #[error("orphaned multi-package data without termination detected")]
    Orphaned,
    #[error("dangling final multipacket with {0} bytes")]
    Dangling(usize),
    #[error("unhandled grouping flag {0}")]
    UnhandledGroupingFlag(u8),
    #[error("record has no source packet header")]
    MissingSourceHeader,

    #[error("unrecognized data kind (service type {service_type}, subtype {subtype})")]
    UnrecognizedDataKind { service_type: u8, subtype: u8 },
    #[error("unhandled SID {0}")]
    UnhandledSid(u16),
    #[error("unhandled RID {0}")]
    UnhandledRid(u16),
    /// A field level decode failure, e.g., a short read or unknown bit pattern.
    #[error("{0}")]
    Decode(String),
}

impl From<crate::Error> for RecordError {
    fn from(err: crate::Error) -> Self {
        RecordError::Decode(err.to_string())
    }
}

fn serialize_error<S: Serializer>(
    err: &Option<RecordError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match err {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// A named accessor producing the textual value of one column of a record family.
pub struct Column<T> {
    pub name: &'static str,
    pub value: fn(&T) -> String,
}

pub(crate) fn column_names<T>(columns: &[Column<T>]) -> impl Iterator<Item = &'static str> + '_ {
    columns.iter().map(|c| c.name)
}

pub(crate) fn column_values<'a, T>(
    columns: &'a [Column<T>],
    item: &'a T,
) -> impl Iterator<Item = String> + 'a {
    columns.iter().map(move |c| (c.value)(item))
}

/// One unit of decoded telemetry.
///
/// Records start out carrying only framing information and are filled in as they move through
/// the pipeline. A terminal record either has a `payload` or an `error`.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub origin: Arc<Provenance>,
    pub ramses: Option<RamsesHeader>,
    pub secure: Option<SecureHeader>,
    pub tm_header: Option<TmHeader>,
    pub source_header: Option<SourcePacketHeader>,
    pub data_header: Option<DataFieldHeader>,
    pub sid: Option<Sid>,
    pub rid: Option<Rid>,
    pub payload: Option<Payload>,
    /// Non-fatal problems found while deriving physical values
    pub warnings: Vec<String>,
    /// Undecoded bytes. Application data before dispatch, anything left over after.
    #[serde(skip)]
    pub buffer: Vec<u8>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<RecordError>,
}

impl Record {
    pub fn new(origin: Arc<Provenance>) -> Self {
        Record {
            origin,
            ramses: None,
            secure: None,
            tm_header: None,
            source_header: None,
            data_header: None,
            sid: None,
            rid: None,
            payload: None,
            warnings: Vec::default(),
            buffer: Vec::default(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, err: RecordError) -> Self {
        self.error = Some(err);
        self
    }

    /// Frame creation time in nanoseconds since 2000-01-01, if the Ramses header was decoded.
    #[must_use]
    pub fn created(&self) -> Option<i64> {
        self.ramses.map(|h| h.nanoseconds())
    }

    /// Packet time in nanoseconds since the GPS epoch, if the data field header was decoded.
    #[must_use]
    pub fn packet_time(&self) -> Option<i64> {
        self.data_header.map(|h| h.nanoseconds())
    }

    /// Column names for CSV output of records of this record's family.
    #[must_use]
    pub fn csv_headers(&self) -> Vec<&'static str> {
        let mut headers: Vec<&'static str> = column_names(Self::COLUMNS).collect();
        if let Some(ref payload) = self.payload {
            headers.extend(payload.csv_headers());
        }
        headers.push("Warnings");
        headers
    }

    /// Values matching [Record::csv_headers].
    #[must_use]
    pub fn csv_row(&self) -> Vec<String> {
        let mut row: Vec<String> = column_values(Self::COLUMNS, self).collect();
        if let Some(ref payload) = self.payload {
            row.extend(payload.csv_row());
        }
        row.push(self.warnings.join("|"));
        row
    }

    const COLUMNS: &'static [Column<Record>] = &[
        Column {
            name: "File",
            value: |r| r.origin.name.clone(),
        },
        Column {
            name: "ProcessingDate",
            value: |r| r.origin.processing_time.to_string(),
        },
        Column {
            name: "RamsesTime",
            value: |r| r.ramses.map(|h| h.created().to_string()).unwrap_or_default(),
        },
        Column {
            name: "QualityIndicator",
            value: |r| {
                r.tm_header
                    .map(|h| h.quality_indicator.to_string())
                    .unwrap_or_default()
            },
        },
        Column {
            name: "LossFlag",
            value: |r| r.tm_header.map(|h| h.loss_flag.to_string()).unwrap_or_default(),
        },
        Column {
            name: "VCFrameCounter",
            value: |r| {
                r.tm_header
                    .map(|h| h.vc_frame_counter.to_string())
                    .unwrap_or_default()
            },
        },
        Column {
            name: "SPSequenceCount",
            value: |r| {
                r.source_header
                    .map(|h| h.sequence_count.to_string())
                    .unwrap_or_default()
            },
        },
        Column {
            name: "TMHeaderTime",
            value: |r| {
                r.data_header
                    .map(|h| h.time.epoch().to_string())
                    .unwrap_or_default()
            },
        },
        Column {
            name: "TMHeaderNanoseconds",
            value: |r| r.packet_time().map(|n| n.to_string()).unwrap_or_default(),
        },
    ];
}
