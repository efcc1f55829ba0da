#![doc = include_str!("../README.md")]

mod bytes;
mod error;

pub mod aez;
pub mod aggregator;
pub mod dispatch;
pub mod image;
pub mod innosat;
pub mod interpolate;
pub mod pipeline;
pub mod ramses;
pub mod record;
pub mod slask;
pub mod summary;
pub mod timecode;

pub use error::{Error, Result};
pub use ramses::Input;
pub use record::{Provenance, Record, RecordError};
pub use slask::{DirSlask, NoSlask, Slask};
