#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Not enough bytes; got {actual}, needed {minimum}")]
    NotEnoughData { actual: usize, minimum: usize },

    /// A bit pattern that has no meaning for the field it was read from.
    #[error("unknown encoding {value:#x} for {field}")]
    UnknownEncoding { field: &'static str, value: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("image has {actual} bytes, expected {expected} for {rows}x{columns} pixels")]
    ImageSize {
        actual: usize,
        expected: usize,
        rows: usize,
        columns: usize,
    },
    #[error("unsupported image encoding: {0}")]
    UnsupportedImage(String),

    #[error("invalid interpolation table: {0}")]
    Interpolation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
