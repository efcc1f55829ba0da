use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::{RamsesHeader, SecureHeader, TmHeader};
use crate::innosat::SourcePacket;
use crate::record::{Provenance, Record, RecordError};

/// One RAC input stream and where it came from.
pub struct Input {
    reader: Box<dyn Read + Send>,
    provenance: Arc<Provenance>,
}

impl Input {
    pub fn new<R>(reader: R, provenance: Provenance) -> Self
    where
        R: Read + Send + 'static,
    {
        Input {
            reader: Box::new(reader),
            provenance: Arc::new(provenance),
        }
    }

    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

/// Fill `buf` as far as the reader allows, returning the number of bytes read. Less than
/// `buf.len()` means the reader is exhausted.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Reads RAC records from a single stream.
///
/// Each frame produces one [Record] carrying the decoded headers and the application data of
/// its source packet in `buffer`. A problem that leaves the inner packet unusable is recorded on
/// the record and reading continues. A problem with the outer framing produces a final error
/// record, since nothing after it can be located.
pub struct FrameReader<R> {
    reader: R,
    origin: Arc<Provenance>,
    frames: usize,
    done: bool,
}

impl<R> FrameReader<R>
where
    R: Read,
{
    pub fn new(reader: R, origin: Arc<Provenance>) -> Self {
        FrameReader {
            reader,
            origin,
            frames: 0,
            done: false,
        }
    }

    /// `Ok(None)` at a clean end of stream, `Err` with a terminal error record if the stream
    /// cannot be read any further.
    fn read_frame(&mut self) -> Result<Option<Record>, Record> {
        let mut record = Record::new(self.origin.clone());

        let mut buf = [0u8; RamsesHeader::LEN];
        let num = read_full(&mut self.reader, &mut buf)
            .map_err(|err| record.clone().with_error(RecordError::Read(err.to_string())))?;
        if num == 0 {
            return Ok(None);
        }
        let Some(header) = RamsesHeader::decode(&buf[..num]) else {
            return Err(record.with_error(RecordError::RamsesHeader {
                actual: num,
                needed: RamsesHeader::LEN,
            }));
        };
        record.ramses = Some(header);
        if !header.is_valid() {
            return Err(record.with_error(RecordError::InvalidSync(header.sync)));
        }

        let length = usize::from(header.length);
        let mut payload = vec![0u8; length];
        let num = match read_full(&mut self.reader, &mut payload) {
            Ok(num) => num,
            Err(err) => return Err(record.with_error(RecordError::Read(err.to_string()))),
        };
        if num < length {
            return Err(record.with_error(RecordError::Truncated {
                what: "payload",
                actual: num,
                needed: length,
            }));
        }

        let mut rest = &payload[..];
        if header.is_secure() {
            let Some(secure) = SecureHeader::decode(rest) else {
                return Err(record.with_error(RecordError::LengthMismatch {
                    what: "secure",
                    length,
                }));
            };
            record.secure = Some(secure);
            rest = &rest[SecureHeader::LEN..];
        }
        let Some(tm_header) = TmHeader::decode(rest) else {
            return Err(record.with_error(RecordError::LengthMismatch { what: "TM", length }));
        };
        record.tm_header = Some(tm_header);
        rest = &rest[TmHeader::LEN..];

        match SourcePacket::decode(rest) {
            Ok(packet) => {
                record.source_header = Some(packet.header);
                record.data_header = packet.data_header;
                record.buffer = packet.data;
                record.error = packet.error;
            }
            Err(err) => record.error = Some(err),
        }
        Ok(Some(record))
    }
}

impl<R> Iterator for FrameReader<R>
where
    R: Read,
{
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(record)) => {
                self.frames += 1;
                if let Some(err) = &record.error {
                    debug!(origin = %self.origin.name, frame = self.frames, "{err}");
                }
                Some(record)
            }
            Ok(None) => {
                trace!(origin = %self.origin.name, frames = self.frames, "end of stream");
                self.done = true;
                None
            }
            Err(record) => {
                if let Some(err) = &record.error {
                    warn!(origin = %self.origin.name, frame = self.frames, "abandoning stream: {err}");
                }
                self.done = true;
                Some(record)
            }
        }
    }
}

type Stream = FrameReader<Box<dyn Read + Send>>;

/// Records of several streams, ordered by the first record of each stream.
pub struct OrderedFrames {
    /// Terminal error records of streams that could not produce a single frame
    leading: VecDeque<Record>,
    /// Streams in emit order, each with its already read first record
    streams: VecDeque<(Option<Record>, Stream)>,
}

impl OrderedFrames {
    fn new(inputs: Vec<Input>) -> Self {
        let mut leading = VecDeque::default();
        let mut firsts = Vec::default();

        for input in inputs {
            let mut stream: Stream = FrameReader::new(input.reader, input.provenance);
            match stream.next() {
                // a stream whose first frame is already fatal has nothing to order by
                Some(record) if stream.done => leading.push_back(record),
                Some(record) => firsts.push((record, stream)),
                None => debug!(origin = %stream.origin.name, "empty input"),
            }
        }

        // stable, so equal timestamps keep input order
        firsts.sort_by_key(|(record, _)| record.created().unwrap_or_default());

        OrderedFrames {
            leading,
            streams: firsts
                .into_iter()
                .map(|(record, stream)| (Some(record), stream))
                .collect(),
        }
    }
}

impl Iterator for OrderedFrames {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.leading.pop_front() {
            return Some(record);
        }
        loop {
            let (first, stream) = self.streams.front_mut()?;
            if let Some(record) = first.take() {
                return Some(record);
            }
            if let Some(record) = stream.next() {
                return Some(record);
            }
            self.streams.pop_front();
        }
    }
}

/// Read the records of all `inputs`.
///
/// The first record of every input is read up front and inputs are then drained one after the
/// other in order of their first record's creation time. Records within an input keep their
/// file order. An input whose framing breaks ends with an error record; the others are
/// unaffected.
pub fn read_frames(inputs: Vec<Input>) -> OrderedFrames {
    OrderedFrames::new(inputs)
}
