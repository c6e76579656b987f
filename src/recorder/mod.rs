//! Recorders receive rendered documents.
//!
//! A `Recorder` is handed the bytes of one document per successful cycle.
//! Shipping to a document store, printing, or discarding are all recorder
//! decisions; the cycle driver only sees `RecordError`.

use std::error::Error;
use std::fmt;
use std::io;
use token::TokenContext;

mod console;
mod null;

pub use self::console::{Console, ConsoleConfig};
pub use self::null::{Null, NullConfig};

/// Why a document was not recorded.
#[derive(Debug)]
pub enum RecordError {
    /// The underlying I/O failed.
    Io(io::Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecordError::Io(ref e) => write!(f, "record failed: {}", e),
        }
    }
}

impl Error for RecordError {
    fn description(&self) -> &str {
        match *self {
            RecordError::Io(_) => "record failed",
        }
    }

    fn cause(&self) -> Option<&Error> {
        match *self {
            RecordError::Io(ref e) => Some(e),
        }
    }
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> RecordError {
        RecordError::Io(e)
    }
}

/// A destination for rendered documents.
pub trait Recorder {
    /// The recorder's unique name in the configuration.
    fn name(&self) -> &str;
    /// Record one document.
    fn record(&mut self, ctx: &TokenContext, doc: &[u8]) -> Result<(), RecordError>;
}
