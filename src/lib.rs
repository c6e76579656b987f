//! expstat polls the runtime-statistics endpoint of a running process, turns
//! the JSON it publishes into typed metric values and renders them as one
//! timestamped document per poll, ready for a search backend.
//!
//! The interesting part lives in `datatype`: the `Mapper` classifies every
//! leaf of an arbitrarily nested payload into a `DataType`, flattening nested
//! objects into dotted keys, and the `Container` renders the result
//! byte-for-byte deterministically. Readers, recorders and the cycle driver
//! around it are thin.
//!
//! Why you might choose to use expstat:
//!
//!  * You publish `expvar`-style JSON and want it in a document store.
//!  * You want memory counters in megabytes and GC pauses in microseconds
//!    without writing a mapping per service.
//!  * You need the classification rules to be overridable per deployment.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]
#![warn(missing_docs)]
extern crate chrono;
extern crate clap;
extern crate serde;
#[cfg_attr(test, macro_use)]
extern crate serde_json;
extern crate toml;
extern crate uuid;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod config;
pub mod datatype;
pub mod engine;
pub mod reader;
pub mod recorder;
pub mod time;
pub mod token;
pub mod util;
