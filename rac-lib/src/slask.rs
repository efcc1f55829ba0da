//! Carry-over storage for multi-packet data left unterminated at the end of a run.
//!
//! A run that ends in the middle of a packet group stores what it has keyed by the packet time
//! of the opening fragment. A later run whose first fragments lack their start asks for the
//! stored data with the packet time of such a fragment and continues the group from it.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::timecode::NANOS_PER_SEC;

/// File extension of stored fragments.
pub const SLASK_EXT: &str = "slask";

/// Default maximum time between a stored fragment and a fragment continuing it.
pub const DEFAULT_MAX_DEVIATION: i64 = 30 * NANOS_PER_SEC;

#[derive(thiserror::Error, Debug)]
pub enum SlaskError {
    #[error("no slask path configured")]
    NoPath,
    #[error("no slask entry matching {0}")]
    NoMatch(i64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SlaskResult<T> = std::result::Result<T, SlaskError>;

/// Fragment store used by the aggregator.
pub trait Slask: Send {
    /// Store `dat` under `nanos`.
    ///
    /// # Errors
    /// If the store is not configured or cannot be written.
    fn put(&mut self, nanos: i64, dat: &[u8]) -> SlaskResult<()>;

    /// Take the entry continued by a fragment with time `nanos`. A taken entry is gone from the
    /// store.
    ///
    /// # Errors
    /// [SlaskError::NoMatch] if no entry is close enough to `nanos`.
    fn get(&mut self, nanos: i64) -> SlaskResult<Vec<u8>>;
}

/// A store that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSlask;

impl Slask for NoSlask {
    fn put(&mut self, _nanos: i64, _dat: &[u8]) -> SlaskResult<()> {
        Err(SlaskError::NoPath)
    }

    fn get(&mut self, _nanos: i64) -> SlaskResult<Vec<u8>> {
        Err(SlaskError::NoPath)
    }
}

/// Stores each entry as `<nanos>.slask` in a directory.
#[derive(Debug, Clone)]
pub struct DirSlask {
    path: PathBuf,
    max_deviation: i64,
}

impl DirSlask {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        DirSlask {
            path: path.as_ref().to_path_buf(),
            max_deviation: DEFAULT_MAX_DEVIATION,
        }
    }

    #[must_use]
    pub fn with_max_deviation(mut self, nanos: i64) -> Self {
        self.max_deviation = nanos;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_path(&self, nanos: i64) -> PathBuf {
        self.path.join(format!("{nanos}.{SLASK_EXT}"))
    }

    /// Timestamps of all entries. Files not named like entries are ignored.
    fn entries(&self) -> SlaskResult<Vec<i64>> {
        let mut entries = Vec::default();
        let dir = match fs::read_dir(&self.path) {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err.into()),
        };
        for entry in dir {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SLASK_EXT) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<i64>) {
                Some(Ok(nanos)) => entries.push(nanos),
                _ => trace!(path = %path.display(), "ignoring file in slask"),
            }
        }
        Ok(entries)
    }
}

impl Slask for DirSlask {
    fn put(&mut self, nanos: i64, dat: &[u8]) -> SlaskResult<()> {
        fs::create_dir_all(&self.path)?;
        let path = self.entry_path(nanos);
        fs::write(&path, dat)?;
        debug!(path = %path.display(), bytes = dat.len(), "stored slask entry");
        Ok(())
    }

    fn get(&mut self, nanos: i64) -> SlaskResult<Vec<u8>> {
        let best = self
            .entries()?
            .into_iter()
            .filter(|t| {
                let diff = nanos - t;
                diff > 0 && diff <= self.max_deviation
            })
            .max();
        let Some(best) = best else {
            return Err(SlaskError::NoMatch(nanos));
        };

        let path = self.entry_path(best);
        let dat = fs::read(&path)?;
        fs::remove_file(&path)?;
        debug!(path = %path.display(), bytes = dat.len(), "took slask entry");
        Ok(dat)
    }
}
