//! Classify runtime-statistics JSON into typed values.
//!
//! The `Mapper` walks a JSON object and turns every leaf into a `DataType`,
//! flattening nested objects into dotted keys. Two rule sets steer the
//! decision: `gc_types` names arrays that hold GC pause histories and
//! `memory_types` names fields that hold byte counts, together with the unit
//! they should be rendered in. Keys are matched case-insensitively.

use datatype::{Container, DataType, MemoryUnit, Node, PayloadError};
use serde_json;
use serde_json::Value;
use serde_json::map::Map;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use token::TokenContext;
use util;

lazy_static! {
    /// Total values classified as byte magnitudes
    pub static ref MAPPER_MEMORY_TYPES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total values classified as strings
    pub static ref MAPPER_STRING_TYPES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total values classified as floats
    pub static ref MAPPER_FLOAT_TYPES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total values classified as float or GC lists
    pub static ref MAPPER_LIST_TYPES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total nested objects descended into
    pub static ref MAPPER_NESTED_TYPES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total entries dropped because they could not be classified
    pub static ref MAPPER_ERRORS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

    static ref DEFAULT_RULES: Mapper = Mapper::builtin();
}

const DEFAULT_GC_TYPES: &[&str] = &["PauseNs", "PauseEnd"];

const DEFAULT_MEMORY_TYPES: &[(&str, MemoryUnit)] = &[
    ("Alloc", MemoryUnit::MegaByte),
    ("TotalAlloc", MemoryUnit::MegaByte),
    ("Sys", MemoryUnit::MegaByte),
    ("HeapAlloc", MemoryUnit::MegaByte),
    ("HeapSys", MemoryUnit::MegaByte),
    ("HeapIdle", MemoryUnit::MegaByte),
    ("HeapInuse", MemoryUnit::MegaByte),
    ("HeapReleased", MemoryUnit::MegaByte),
    ("StackInuse", MemoryUnit::MegaByte),
    ("StackSys", MemoryUnit::MegaByte),
    ("MSpanInuse", MemoryUnit::MegaByte),
    ("MSpanSys", MemoryUnit::MegaByte),
    ("MCacheInuse", MemoryUnit::MegaByte),
    ("MCacheSys", MemoryUnit::MegaByte),
    ("BuckHashSys", MemoryUnit::MegaByte),
    ("GCSys", MemoryUnit::MegaByte),
    ("OtherSys", MemoryUnit::MegaByte),
    ("NextGC", MemoryUnit::MegaByte),
];

/// Settings key overriding `gc_types`.
pub const GC_TYPES_KEY: &str = "gc_types";
/// Settings key overriding `memory_types`.
pub const MEMORY_BYTES_KEY: &str = "memory_bytes";

/// A point-in-time read of the classification counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counters {
    /// See `MAPPER_MEMORY_TYPES`.
    pub memory: usize,
    /// See `MAPPER_STRING_TYPES`.
    pub string: usize,
    /// See `MAPPER_FLOAT_TYPES`.
    pub float: usize,
    /// See `MAPPER_LIST_TYPES`.
    pub list: usize,
    /// See `MAPPER_NESTED_TYPES`.
    pub nested: usize,
    /// See `MAPPER_ERRORS`.
    pub errors: usize,
}

/// Read every classification counter.
pub fn counters() -> Counters {
    Counters {
        memory: MAPPER_MEMORY_TYPES.load(Ordering::Relaxed),
        string: MAPPER_STRING_TYPES.load(Ordering::Relaxed),
        float: MAPPER_FLOAT_TYPES.load(Ordering::Relaxed),
        list: MAPPER_LIST_TYPES.load(Ordering::Relaxed),
        nested: MAPPER_NESTED_TYPES.load(Ordering::Relaxed),
        errors: MAPPER_ERRORS.load(Ordering::Relaxed),
    }
}

#[inline]
fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// A source of user overrides for the classification rules.
///
/// Only the `gc_types` (list of strings) and `memory_bytes` (map of key name
/// to unit tag) keys are consulted. A missing key leaves the defaults alone.
pub trait Settings {
    /// True if `name` is present.
    fn has_key(&self, name: &str) -> bool;
    /// The string list stored under `name`, empty if absent or mistyped.
    fn get_string_list(&self, name: &str) -> Vec<String>;
    /// The string map stored under `name`, empty if absent or mistyped.
    fn get_string_map(&self, name: &str) -> HashMap<String, String>;
}

/// In-memory `Settings`.
#[derive(Debug, Clone, Default)]
pub struct MapSettings {
    /// Override for `gc_types`.
    pub gc_types: Option<Vec<String>>,
    /// Override for `memory_bytes`.
    pub memory_bytes: Option<HashMap<String, String>>,
}

impl Settings for MapSettings {
    fn has_key(&self, name: &str) -> bool {
        match name {
            GC_TYPES_KEY => self.gc_types.is_some(),
            MEMORY_BYTES_KEY => self.memory_bytes.is_some(),
            _ => false,
        }
    }

    fn get_string_list(&self, name: &str) -> Vec<String> {
        match name {
            GC_TYPES_KEY => self.gc_types.clone().unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn get_string_map(&self, name: &str) -> HashMap<String, String> {
        match name {
            MEMORY_BYTES_KEY => self.memory_bytes.clone().unwrap_or_default(),
            _ => HashMap::new(),
        }
    }
}

/// Errors raised while building a `Mapper`.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    /// A `memory_bytes` entry named a unit other than `b`, `kb` or `mb`.
    UnknownUnit {
        /// The offending key.
        key: String,
        /// The unit tag as given.
        unit: String,
    },
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MapperError::UnknownUnit { ref key, ref unit } => write!(
                f,
                "unknown memory unit {:?} for {:?}, expected one of b, kb, mb",
                unit, key
            ),
        }
    }
}

impl Error for MapperError {
    fn description(&self) -> &str {
        match *self {
            MapperError::UnknownUnit { .. } => "unknown memory unit",
        }
    }
}

/// The built-in rules, computed once per process.
pub fn default_rules() -> &'static Mapper {
    &DEFAULT_RULES
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    let name = name.to_lowercase();
    if !names.contains(&name) {
        names.push(name);
    }
}

/// Classification rules plus the walk that applies them.
///
/// `clone` yields a fully independent copy; hand every concurrently running
/// fetch cycle its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    gc_types: Vec<String>,
    memory_types: HashMap<String, MemoryUnit>,
}

impl Default for Mapper {
    fn default() -> Mapper {
        default_rules().clone()
    }
}

impl Mapper {
    fn builtin() -> Mapper {
        let mut gc_types = Vec::with_capacity(DEFAULT_GC_TYPES.len());
        for name in DEFAULT_GC_TYPES {
            push_unique(&mut gc_types, name);
        }
        let memory_types = DEFAULT_MEMORY_TYPES
            .iter()
            .map(|&(name, unit)| (name.to_lowercase(), unit))
            .collect();
        Mapper {
            gc_types: gc_types,
            memory_types: memory_types,
        }
    }

    /// Build a mapper from exactly these rules, without the defaults.
    pub fn new<S>(gc_types: &[S], memory_types: &HashMap<String, String>) -> Result<Mapper, MapperError>
    where
        S: AsRef<str>,
    {
        let mut mapper = Mapper {
            gc_types: Vec::with_capacity(gc_types.len()),
            memory_types: HashMap::with_capacity(memory_types.len()),
        };
        for name in gc_types {
            push_unique(&mut mapper.gc_types, name.as_ref());
        }
        mapper.extend_memory_types(memory_types)?;
        Ok(mapper)
    }

    /// Build a mapper from the defaults extended by `settings`.
    ///
    /// Overridden GC names come first, defaults are appended after them
    /// without duplicates. Overridden memory units replace the defaults for
    /// the same key.
    pub fn with_settings<S>(settings: &S) -> Result<Mapper, MapperError>
    where
        S: Settings + ?Sized,
    {
        let defaults = default_rules();
        let mut gc_types = Vec::new();
        if settings.has_key(GC_TYPES_KEY) {
            for name in settings.get_string_list(GC_TYPES_KEY) {
                push_unique(&mut gc_types, &name);
            }
        }
        for name in &defaults.gc_types {
            push_unique(&mut gc_types, name);
        }
        let mut mapper = Mapper {
            gc_types: gc_types,
            memory_types: defaults.memory_types.clone(),
        };
        if settings.has_key(MEMORY_BYTES_KEY) {
            mapper.extend_memory_types(&settings.get_string_map(MEMORY_BYTES_KEY))?;
        }
        Ok(mapper)
    }

    fn extend_memory_types(&mut self, overrides: &HashMap<String, String>) -> Result<(), MapperError> {
        for (name, tag) in overrides {
            match MemoryUnit::from_tag(tag) {
                Some(unit) => {
                    self.memory_types.insert(name.to_lowercase(), unit);
                }
                None => {
                    return Err(MapperError::UnknownUnit {
                        key: name.clone(),
                        unit: tag.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Lower-cased names of GC pause arrays, overrides first.
    pub fn gc_types(&self) -> &[String] {
        &self.gc_types
    }

    /// Lower-cased byte-count field names and their units.
    pub fn memory_types(&self) -> &HashMap<String, MemoryUnit> {
        &self.memory_types
    }

    /// True if `name` is a GC pause array.
    pub fn is_gc_type(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.gc_types.iter().any(|n| *n == name)
    }

    /// The unit `name` is rendered in, if it is a byte count.
    pub fn memory_unit(&self, name: &str) -> Option<MemoryUnit> {
        self.memory_types.get(&name.to_lowercase()).cloned()
    }

    /// Parse `payload` and classify it into a container.
    ///
    /// Anything but a JSON object yields `PayloadError::Malformed`. An object
    /// from which nothing could be classified yields
    /// `PayloadError::Unidentified`. Either way the container is empty.
    pub fn container(&self, ctx: &TokenContext, payload: &[u8]) -> Container {
        let fields = match serde_json::from_slice::<Node>(payload) {
            Ok(Node::Object(fields)) => fields,
            Ok(Node::Leaf(other)) => {
                warn!("[{}] payload is a JSON {}, not an object", ctx, util::kind_of(&other));
                return Container::with_error(PayloadError::Malformed(format!(
                    "expected a JSON object, found {}",
                    util::kind_of(&other)
                )));
            }
            Err(e) => {
                warn!("[{}] payload does not parse: {}", ctx, e);
                return Container::with_error(PayloadError::Malformed(e.to_string()));
            }
        };
        let values = self.classify_fields(ctx, "", &fields);
        if values.is_empty() {
            warn!("[{}] no values classified out of {} entries", ctx, fields.len());
            return Container::with_error(PayloadError::Unidentified);
        }
        let container = Container::new();
        container.add(values);
        container
    }

    /// Classify every entry of `obj`, prefixing keys with `prefix`.
    ///
    /// Entries that cannot be classified are dropped and counted in
    /// `MAPPER_ERRORS`; their siblings are unaffected.
    pub fn classify(&self, ctx: &TokenContext, prefix: &str, obj: &Map<String, Value>) -> Vec<DataType> {
        self.classify_fields(ctx, prefix, &Node::fields(obj))
    }

    /// Like `classify`, over fields that may repeat a key. Every occurrence
    /// is classified, in order.
    pub fn classify_fields(&self, ctx: &TokenContext, prefix: &str, fields: &[(String, Node)]) -> Vec<DataType> {
        let mut res = Vec::with_capacity(fields.len());
        self.classify_into(ctx, prefix, fields, &mut res);
        res
    }

    // serde_json refuses to parse documents nested deeper than 128 levels, so
    // the recursion is bounded for every parsed payload.
    fn classify_into(&self, ctx: &TokenContext, prefix: &str, fields: &[(String, Node)], res: &mut Vec<DataType>) {
        for &(ref name, ref node) in fields {
            let key = format!("{}{}", prefix, name);
            if let Some(unit) = self.memory_unit(name) {
                match node.as_leaf().and_then(util::parse_float) {
                    Some(raw) => {
                        bump(&MAPPER_MEMORY_TYPES);
                        res.push(DataType::memory(key, raw, unit));
                    }
                    None => {
                        bump(&MAPPER_ERRORS);
                        debug!(
                            "[{}] dropping {}: {} is not a byte count",
                            ctx,
                            key,
                            node.as_leaf().map(util::kind_of).unwrap_or("object")
                        );
                    }
                }
                continue;
            }
            let value = match *node {
                Node::Object(ref inner) => {
                    bump(&MAPPER_NESTED_TYPES);
                    let nested = format!("{}.", key);
                    self.classify_into(ctx, &nested, inner, res);
                    continue;
                }
                Node::Leaf(ref value) => value,
            };
            match *value {
                Value::String(ref s) => {
                    bump(&MAPPER_STRING_TYPES);
                    res.push(DataType::string(key, s.clone()));
                }
                Value::Number(ref n) => match n.as_f64() {
                    Some(f) => {
                        bump(&MAPPER_FLOAT_TYPES);
                        res.push(DataType::float(key, f));
                    }
                    None => {
                        bump(&MAPPER_ERRORS);
                        debug!("[{}] dropping {}: number out of range", ctx, key);
                    }
                },
                Value::Array(ref items) => match self.classify_list(name, key, items) {
                    Some(dt) => {
                        bump(&MAPPER_LIST_TYPES);
                        res.push(dt);
                    }
                    None => {
                        bump(&MAPPER_ERRORS);
                        debug!("[{}] dropping {}{}: unrecognised list", ctx, prefix, name);
                    }
                },
                Value::Object(ref inner) => {
                    bump(&MAPPER_NESTED_TYPES);
                    let nested = format!("{}.", key);
                    self.classify_into(ctx, &nested, &Node::fields(inner), res);
                }
                Value::Bool(_) | Value::Null => {
                    bump(&MAPPER_ERRORS);
                    debug!(
                        "[{}] dropping {}: unsupported {} value",
                        ctx,
                        key,
                        util::kind_of(value)
                    );
                }
            }
        }
    }

    fn classify_list(&self, name: &str, key: String, items: &[Value]) -> Option<DataType> {
        if items.is_empty() {
            return Some(DataType::float_list(key, Vec::new()));
        }
        if self.is_gc_type(name) {
            let pauses = items
                .iter()
                .map(|v| util::parse_float(v).unwrap_or(0.0) as u64)
                .collect();
            return Some(DataType::gc_list(key, pauses));
        }
        if util::parse_float(&items[0]).is_some() {
            let values = items
                .iter()
                .map(|v| util::parse_float(v).unwrap_or(0.0))
                .collect();
            return Some(DataType::float_list(key, values));
        }
        None
    }
}
