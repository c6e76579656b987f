//! Readers fetch one raw payload per cycle.
//!
//! The collector does not care where a payload comes from. A `Reader` hands
//! back the bytes of one JSON document when asked, under the cycle's token
//! context, and reports failure through `ReadError`.

use std::error::Error;
use std::fmt;
use std::io;
use token::TokenContext;

mod file;

pub use self::file::{FileReader, FileReaderConfig};

/// Why a read produced no payload.
#[derive(Debug)]
pub enum ReadError {
    /// The underlying I/O failed.
    Io(io::Error),
    /// The cycle's context was done before or during the read.
    Cancelled,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReadError::Io(ref e) => write!(f, "read failed: {}", e),
            ReadError::Cancelled => write!(f, "read cancelled"),
        }
    }
}

impl Error for ReadError {
    fn description(&self) -> &str {
        match *self {
            ReadError::Io(_) => "read failed",
            ReadError::Cancelled => "read cancelled",
        }
    }

    fn cause(&self) -> Option<&Error> {
        match *self {
            ReadError::Io(ref e) => Some(e),
            ReadError::Cancelled => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> ReadError {
        ReadError::Io(e)
    }
}

/// A source of raw payloads.
pub trait Reader {
    /// The reader's unique name in the configuration.
    fn name(&self) -> &str;
    /// Fetch one payload.
    fn read(&mut self, ctx: &TokenContext) -> Result<Vec<u8>, ReadError>;
}
