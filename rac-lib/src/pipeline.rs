//! Threaded decoding of RAC inputs.
//!
//! Decoding runs in three stages, each in its own thread and connected by bounded channels:
//! reading frames, aggregating packet groups and dispatching to instrument records. The caller
//! consumes the output of the last stage. A full channel blocks the stage feeding it, so a slow
//! consumer slows down the whole pipeline rather than buffering without bound. Dropping the
//! output ends every stage at its next send.
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use threadpool::ThreadPool;
use tracing::{debug, error, trace};
use typed_builder::TypedBuilder;

use crate::aggregator::aggregate;
use crate::dispatch::dispatch;
use crate::ramses::{read_frames, Input};
use crate::record::Record;
use crate::slask::{NoSlask, Slask};
use crate::Result;

/// Receiver of the records produced by a pipeline.
///
/// Any `FnMut(Record)` is a sink.
pub trait RecordSink {
    fn handle(&mut self, record: Record);

    /// Called once after the last record, e.g., to wait for background work.
    fn teardown(&mut self) {}
}

impl<F> RecordSink for F
where
    F: FnMut(Record),
{
    fn handle(&mut self, record: Record) {
        self(record);
    }
}

/// Worker pool for work done on records outside of the pipeline, such as writing images.
///
/// [Background::join] waits for everything executed so far.
pub struct Background {
    pool: ThreadPool,
}

impl Background {
    /// Pool with `num_threads` workers, at least 1.
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        Background {
            pool: ThreadPool::with_name("rac::background".into(), num_threads.max(1)),
        }
    }

    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.execute(job);
    }

    /// Block until all executed jobs are done.
    pub fn join(&self) {
        self.pool.join();
        let panicked = self.pool.panic_count();
        if panicked > 0 {
            error!(panicked, "background jobs panicked");
        }
    }

    /// Number of jobs that panicked.
    #[must_use]
    pub fn panic_count(&self) -> usize {
        self.pool.panic_count()
    }
}

impl Default for Background {
    fn default() -> Self {
        Background::new(1)
    }
}

/// Records produced by a running pipeline, in the order established when reading frames.
pub struct Records {
    records: Receiver<Record>,
    handles: Vec<JoinHandle<()>>,
}

impl Iterator for Records {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if let Ok(record) = self.records.recv() {
            return Some(record);
        }
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or_default().to_string();
            if handle.join().is_err() {
                error!(thread = %name, "pipeline stage panicked");
            } else {
                trace!(thread = %name, "pipeline stage joined");
            }
        }
        None
    }
}

fn forward<I>(records: I, tx: &Sender<Record>, stage: &str)
where
    I: Iterator<Item = Record>,
{
    for record in records {
        if tx.send(record).is_err() {
            debug!(stage, "receiver gone, stopping");
            return;
        }
    }
    trace!(stage, "done");
}

/// Decode pipeline configuration.
///
/// ```
/// use rac::pipeline::Pipeline;
///
/// let records: Vec<_> = Pipeline::builder().build().start(Vec::default()).unwrap().collect();
/// assert!(records.is_empty());
/// ```
#[derive(TypedBuilder)]
pub struct Pipeline {
    /// Capacity of the channels between stages.
    #[builder(default = 1000)]
    buffer_size: usize,
    /// Carry-over store for packet groups split between runs.
    #[builder(default = Box::new(NoSlask))]
    slask: Box<dyn Slask>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::builder().build()
    }
}

impl Pipeline {
    /// Start decoding `inputs` in the background.
    ///
    /// # Errors
    /// [crate::Error::Io] if a stage thread cannot be started.
    pub fn start(self, inputs: Vec<Input>) -> Result<Records> {
        let Pipeline { buffer_size, slask } = self;
        let (frames_tx, frames_rx) = bounded(buffer_size);
        let (groups_tx, groups_rx) = bounded(buffer_size);
        let (records_tx, records_rx) = bounded(buffer_size);

        let mut handles = Vec::with_capacity(3);
        handles.push(
            thread::Builder::new()
                .name("rac::frames".into())
                .spawn(move || forward(read_frames(inputs), &frames_tx, "frames"))?,
        );
        handles.push(
            thread::Builder::new()
                .name("rac::aggregate".into())
                .spawn(move || {
                    forward(aggregate(frames_rx.into_iter(), slask), &groups_tx, "aggregate");
                })?,
        );
        handles.push(
            thread::Builder::new()
                .name("rac::dispatch".into())
                .spawn(move || {
                    forward(groups_rx.into_iter().map(dispatch), &records_tx, "dispatch");
                })?,
        );

        Ok(Records {
            records: records_rx,
            handles,
        })
    }

    /// Decode `inputs`, handing every record to `sink`. [RecordSink::teardown] is called once
    /// when decoding is done, also if it could not be started.
    ///
    /// # Errors
    /// See [Pipeline::start].
    pub fn extract_to_sink<S>(self, inputs: Vec<Input>, sink: &mut S) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let records = match self.start(inputs) {
            Ok(records) => records,
            Err(err) => {
                sink.teardown();
                return Err(err);
            }
        };
        for record in records {
            sink.handle(record);
        }
        sink.teardown();
        Ok(())
    }

    /// Decode `inputs`, calling `callback` for every record.
    ///
    /// # Errors
    /// See [Pipeline::start].
    pub fn extract_records<F>(self, inputs: Vec<Input>, mut callback: F) -> Result<()>
    where
        F: FnMut(Record),
    {
        self.extract_to_sink(inputs, &mut callback)
    }
}

/// Decode `inputs` with the default [Pipeline], calling `callback` for every record.
///
/// # Errors
/// See [Pipeline::start].
pub fn extract_records<F>(inputs: Vec<Input>, callback: F) -> Result<()>
where
    F: FnMut(Record),
{
    Pipeline::default().extract_records(inputs, callback)
}
