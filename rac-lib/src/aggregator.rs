//! Reassembly of application data split over several source packets.
use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::innosat::GroupingFlag;
use crate::record::{Record, RecordError};
use crate::slask::{Slask, SlaskError};

/// Continuation and stop packets repeat the SID/RID of their group.
const SID_RID_LEN: usize = 2;

fn strip_discriminant(buf: &[u8]) -> &[u8] {
    buf.get(SID_RID_LEN..).unwrap_or_default()
}

/// Iterator adapter merging packet groups into single records.
///
/// Standalone packets pass through. A group (start, any number of continuations, stop) becomes
/// one record with the metadata of its start packet and the concatenated application data.
/// Records that already carry an error pass through untouched; if one arrives while a group is
/// open, the group gets a warning since its data is probably incomplete. Only one group can be
/// open at a time; a group interrupted by a standalone or start packet is flushed as
/// [RecordError::Orphaned].
///
/// A group that lacks its start may have been started in a previous run. In that case its data
/// is taken from the [Slask], and a group still open when the input ends is put there.
pub struct Aggregator<I>
where
    I: Iterator<Item = Record>,
{
    records: I,
    slask: Box<dyn Slask>,
    current: Option<Record>,
    ready: VecDeque<Record>,
    done: bool,
}

impl<I> Aggregator<I>
where
    I: Iterator<Item = Record>,
{
    pub fn new(records: I, slask: Box<dyn Slask>) -> Self {
        Aggregator {
            records,
            slask,
            current: None,
            ready: VecDeque::default(),
            done: false,
        }
    }

    fn flush_orphan(&mut self) {
        if let Some(orphan) = self.current.take() {
            debug!(bytes = orphan.buffer.len(), "orphaned packet group");
            self.ready.push_back(orphan.with_error(RecordError::Orphaned));
        }
    }

    /// Open a group for a continuation or stop packet that has no start.
    fn resume(&mut self, record: &Record, missing: RecordError) -> Record {
        let mut opened = record.clone();
        opened.buffer.clear();

        let stored = match record.packet_time() {
            Some(nanos) => self.slask.get(nanos),
            None => Err(SlaskError::NoMatch(0)),
        };
        match stored {
            Ok(dat) => {
                debug!(bytes = dat.len(), "resuming packet group from slask");
                opened.buffer = dat;
            }
            Err(err) => {
                if !matches!(err, SlaskError::NoPath) {
                    trace!("{err}");
                }
                opened.error = Some(missing);
            }
        }
        opened
    }

    fn handle(&mut self, record: Record) {
        if let Some(ref err) = record.error {
            if let Some(ref mut current) = self.current {
                debug!("packet group is missing a fragment: {err}");
                current
                    .warnings
                    .push(format!("packet group may be missing a fragment: {err}"));
            }
            self.ready.push_back(record);
            return;
        }
        let Some(header) = record.source_header else {
            self.ready.push_back(record.with_error(RecordError::MissingSourceHeader));
            return;
        };
        let Ok(flag) = header.grouping() else {
            let err = RecordError::UnhandledGroupingFlag(header.grouping_flags);
            self.ready.push_back(record.with_error(err));
            return;
        };

        match flag {
            GroupingFlag::Standalone => {
                self.flush_orphan();
                self.ready.push_back(record);
            }
            GroupingFlag::Start => {
                self.flush_orphan();
                self.current = Some(record);
            }
            GroupingFlag::Continuation => {
                let mut current = match self.current.take() {
                    Some(current) => current,
                    None => self.resume(&record, RecordError::ContinuationWithoutStart),
                };
                current.buffer.extend_from_slice(strip_discriminant(&record.buffer));
                self.current = Some(current);
            }
            GroupingFlag::Stop => {
                let mut current = match self.current.take() {
                    Some(current) => current,
                    None => self.resume(&record, RecordError::StopWithoutStart),
                };
                current.buffer.extend_from_slice(strip_discriminant(&record.buffer));
                self.ready.push_back(current);
            }
        }
    }

    fn finish(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };
        let num = current.buffer.len();
        if let Some(nanos) = current.packet_time() {
            match self.slask.put(nanos, &current.buffer) {
                Ok(()) | Err(SlaskError::NoPath) => {}
                Err(err) => warn!("failed to store dangling packet group: {err}"),
            }
        }
        self.ready.push_back(current.with_error(RecordError::Dangling(num)));
    }
}

impl<I> Iterator for Aggregator<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(record);
            }
            if self.done {
                return None;
            }
            match self.records.next() {
                Some(record) => self.handle(record),
                None => {
                    self.done = true;
                    self.finish();
                }
            }
        }
    }
}

/// Aggregate packet groups of `records`, see [Aggregator].
pub fn aggregate<I>(records: I, slask: Box<dyn Slask>) -> Aggregator<I>
where
    I: Iterator<Item = Record>,
{
    Aggregator::new(records, slask)
}
