use chrono::{DateTime, TimeZone};
use datatype::{DataType, PayloadError};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use util;

/// The values classified out of one payload.
///
/// Appends may come from several threads while a pass is running. Readers
/// always get a copy of the values, never a view into the buffer. A container
/// built from a failed pass holds no values and reports the failure through
/// `error`.
#[derive(Debug, Default)]
pub struct Container {
    list: RwLock<Vec<DataType>>,
    err: Option<PayloadError>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Container {
        Container::default()
    }

    /// Create a container for a pass that failed as a whole.
    pub fn with_error(err: PayloadError) -> Container {
        Container {
            list: RwLock::new(Vec::new()),
            err: Some(err),
        }
    }

    // A panicking appender cannot leave the Vec half-written, so a poisoned
    // lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<Vec<DataType>> {
        match self.list.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<Vec<DataType>> {
        match self.list.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append zero or more values.
    pub fn add<I>(&self, values: I)
    where
        I: IntoIterator<Item = DataType>,
    {
        self.write().extend(values);
    }

    /// A copy of every value added so far, in insertion order.
    pub fn list(&self) -> Vec<DataType> {
        self.read().clone()
    }

    /// Number of values added so far.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no value has been added.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The terminal error of the pass that built this container, if any.
    pub fn error(&self) -> Option<&PayloadError> {
        self.err.as_ref()
    }

    /// Render the document: `@timestamp` first, then every value in
    /// insertion order, with no whitespace.
    pub fn render<Tz>(&self, timestamp: &DateTime<Tz>) -> Vec<u8>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let list = self.read();
        let mut buf = String::with_capacity(64 + list.len() * 32);
        buf.push_str("{\"@timestamp\":\"");
        buf.push_str(&util::format_time(timestamp));
        buf.push('"');
        for value in list.iter() {
            buf.push(',');
            value.render_into(&mut buf);
        }
        buf.push('}');
        buf.into_bytes()
    }
}
