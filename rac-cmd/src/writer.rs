use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::Array2;
use rac::aez::{CcdImage, Payload};
use rac::image::{ImageDecoder, RawImageDecoder};
use rac::pipeline::{Background, RecordSink};
use rac::summary::Summary;
use rac::Record;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub enum Format {
    Csv,
    Json,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Csv, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Csv => Some(clap::builder::PossibleValue::new("csv")),
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
        }
    }
}

impl Format {
    fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "jsonl",
        }
    }
}

pub struct Options {
    pub output: Option<PathBuf>,
    pub stdout: bool,
    pub format: Format,
    pub skip_images: bool,
    pub skip_timeseries: bool,
    pub image_threads: usize,
}

/// Join values into one CSV line, quoting where needed.
fn csv_line<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        let value = value.as_ref();
        if value.contains([',', '"', '\n', '\r']) {
            line.push('"');
            line.push_str(&value.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line
}

/// Write 16-bit pixels as a binary PGM.
fn write_pgm(path: &Path, pixels: &Array2<u16>) -> Result<()> {
    let (rows, columns) = pixels.dim();
    let file = File::create(path).with_context(|| format!("creating {path:?}"))?;
    let mut dest = BufWriter::new(file);
    write!(dest, "P5\n{columns} {rows}\n65535\n")?;
    for pixel in pixels {
        dest.write_all(&pixel.to_be_bytes())?;
    }
    dest.flush().with_context(|| format!("writing {path:?}"))
}

/// Export sink writing records per family, and CCD images in the background.
pub struct Writer {
    options: Options,
    files: HashMap<&'static str, BufWriter<File>>,
    printed_headers: HashSet<&'static str>,
    decoder: Arc<dyn ImageDecoder>,
    background: Background,
    summary: Summary,
    failures: Arc<AtomicUsize>,
}

impl Writer {
    pub fn new(options: Options) -> Self {
        let background = Background::new(options.image_threads);
        Writer {
            options,
            files: HashMap::default(),
            printed_headers: HashSet::default(),
            decoder: Arc::new(RawImageDecoder),
            background,
            summary: Summary::default(),
            failures: Arc::default(),
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Number of writes that failed, including image writes.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn wanted(&self, payload: &Payload) -> bool {
        if matches!(payload, Payload::CcdImage(_)) {
            !self.options.skip_images
        } else {
            !self.options.skip_timeseries
        }
    }

    fn line(&self, record: &Record, header: bool) -> Result<String> {
        Ok(match self.options.format {
            Format::Csv if header => csv_line(record.csv_headers()),
            Format::Csv => csv_line(record.csv_row()),
            Format::Json => serde_json::to_string(record).context("serializing record")?,
        })
    }

    fn print(&mut self, family: &'static str, record: &Record) -> Result<()> {
        let mut out = stdout().lock();
        if matches!(self.options.format, Format::Csv) && self.printed_headers.insert(family) {
            writeln!(out, "{family},{}", self.line(record, true)?)?;
        }
        writeln!(out, "{family},{}", self.line(record, false)?)?;
        Ok(())
    }

    fn write(&mut self, dir: &Path, family: &'static str, record: &Record) -> Result<()> {
        let header = match self.options.format {
            Format::Csv if !self.files.contains_key(family) => Some(self.line(record, true)?),
            _ => None,
        };
        let line = self.line(record, false)?;
        let path = dir.join(format!("{family}.{}", self.options.format.extension()));
        let dest = match self.files.entry(family) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(path = ?path, "creating output");
                let file = File::create(&path).with_context(|| format!("creating {path:?}"))?;
                entry.insert(BufWriter::new(file))
            }
        };
        if let Some(header) = header {
            writeln!(dest, "{header}")?;
        }
        writeln!(dest, "{line}").with_context(|| format!("writing {family} record"))
    }

    fn write_image(&self, dir: &Path, record: &Record, img: &CcdImage) {
        let name = format!(
            "{}_{}.pgm",
            record.rid.map(|rid| rid.to_string()).unwrap_or_default(),
            record.packet_time().unwrap_or_default()
        );
        let path = dir.join(name);
        let img = img.clone();
        let decoder = self.decoder.clone();
        let failures = self.failures.clone();
        self.background.execute(move || {
            let result = decoder
                .decode(&img)
                .context("decoding image")
                .and_then(|pixels| write_pgm(&path, &pixels));
            if let Err(err) = result {
                warn!(path = ?path, "image not written: {err:#}");
                failures.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    fn export(&mut self, record: &Record) -> Result<()> {
        let Some(ref payload) = record.payload else {
            return Ok(());
        };
        if !self.wanted(payload) {
            return Ok(());
        }
        let family = payload.family();
        if self.options.stdout && !matches!(payload, Payload::CcdImage(_)) {
            self.print(family, record)?;
        }
        if let Some(dir) = self.options.output.clone() {
            self.write(&dir, family, record)?;
            if let Payload::CcdImage(img) = payload {
                self.write_image(&dir, record, img);
            }
        }
        Ok(())
    }
}

impl RecordSink for Writer {
    fn handle(&mut self, record: Record) {
        self.summary.add(&record);
        if let Some(ref err) = record.error {
            warn!(
                origin = %record.origin.name,
                created = ?record.created(),
                "{err}"
            );
            return;
        }
        if let Err(err) = self.export(&record) {
            error!("{err:#}");
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn teardown(&mut self) {
        self.background.join();
        for (family, dest) in &mut self.files {
            if let Err(err) = dest.flush() {
                error!(family, "failed to flush output: {err}");
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
