//! Typed metric values and their canonical rendering.
//!
//! A `DataType` is one classified leaf of a runtime-statistics payload: a
//! dotted key path plus a value of a known shape. The set of variants is
//! closed; every rendering and comparison site matches exhaustively.

use std::error::Error;
use std::fmt;
use util;

mod container;
pub mod mapper;
mod node;

pub use self::container::Container;
pub use self::mapper::{Mapper, MapperError, Settings};
pub use self::node::Node;

/// Unit a byte-magnitude value is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryUnit {
    /// Rendered as-is.
    Byte,
    /// Rendered divided by 1024.
    KiloByte,
    /// Rendered divided by 1024².
    MegaByte,
}

impl MemoryUnit {
    /// Parse a unit tag: `b`, `kb` or `mb`, case-insensitive.
    pub fn from_tag(tag: &str) -> Option<MemoryUnit> {
        match tag.trim().to_lowercase().as_str() {
            "b" => Some(MemoryUnit::Byte),
            "kb" => Some(MemoryUnit::KiloByte),
            "mb" => Some(MemoryUnit::MegaByte),
            _ => None,
        }
    }

    /// The unit's tag as written in configuration.
    pub fn tag(&self) -> &'static str {
        match *self {
            MemoryUnit::Byte => "b",
            MemoryUnit::KiloByte => "kb",
            MemoryUnit::MegaByte => "mb",
        }
    }

    /// Bytes per unit.
    pub fn divisor(&self) -> f64 {
        match *self {
            MemoryUnit::Byte => 1.0,
            MemoryUnit::KiloByte => 1024.0,
            MemoryUnit::MegaByte => 1_048_576.0,
        }
    }
}

/// One classified metric value.
///
/// Byte-magnitude variants store the raw byte count they were built from.
/// Conversion to kilo- or megabytes only happens in `render_into`.
#[derive(Debug, Clone)]
pub enum DataType {
    /// A plain number.
    Float {
        /// Dotted path from the document root.
        key: String,
        /// The number.
        value: f64,
    },
    /// A text value.
    String {
        /// Dotted path from the document root.
        key: String,
        /// The text.
        value: String,
    },
    /// A list of numbers, kept in encounter order.
    FloatList {
        /// Dotted path from the document root.
        key: String,
        /// The numbers.
        value: Vec<f64>,
    },
    /// A GC pause history in nanoseconds, rendered in microseconds.
    GCList {
        /// Dotted path from the document root.
        key: String,
        /// The pauses.
        value: Vec<u64>,
    },
    /// A byte count rendered in bytes.
    Byte {
        /// Dotted path from the document root.
        key: String,
        /// Raw byte count.
        value: f64,
    },
    /// A byte count rendered in kilobytes.
    KiloByte {
        /// Dotted path from the document root.
        key: String,
        /// Raw byte count.
        value: f64,
    },
    /// A byte count rendered in megabytes.
    MegaByte {
        /// Dotted path from the document root.
        key: String,
        /// Raw byte count.
        value: f64,
    },
}

impl DataType {
    /// Make a `Float`.
    pub fn float<S>(key: S, value: f64) -> DataType
    where
        S: Into<String>,
    {
        DataType::Float {
            key: key.into(),
            value: value,
        }
    }

    /// Make a `String`.
    pub fn string<S, V>(key: S, value: V) -> DataType
    where
        S: Into<String>,
        V: Into<String>,
    {
        DataType::String {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Make a `FloatList`.
    pub fn float_list<S>(key: S, value: Vec<f64>) -> DataType
    where
        S: Into<String>,
    {
        DataType::FloatList {
            key: key.into(),
            value: value,
        }
    }

    /// Make a `GCList` from nanosecond pauses.
    pub fn gc_list<S>(key: S, value: Vec<u64>) -> DataType
    where
        S: Into<String>,
    {
        DataType::GCList {
            key: key.into(),
            value: value,
        }
    }

    /// Make a `Byte` from a raw byte count.
    pub fn byte<S>(key: S, raw: f64) -> DataType
    where
        S: Into<String>,
    {
        DataType::Byte {
            key: key.into(),
            value: raw,
        }
    }

    /// Make a `KiloByte` from a raw byte count.
    pub fn kilobyte<S>(key: S, raw: f64) -> DataType
    where
        S: Into<String>,
    {
        DataType::KiloByte {
            key: key.into(),
            value: raw,
        }
    }

    /// Make a `MegaByte` from a raw byte count.
    pub fn megabyte<S>(key: S, raw: f64) -> DataType
    where
        S: Into<String>,
    {
        DataType::MegaByte {
            key: key.into(),
            value: raw,
        }
    }

    /// Make the byte-magnitude variant matching `unit`.
    pub fn memory<S>(key: S, raw: f64, unit: MemoryUnit) -> DataType
    where
        S: Into<String>,
    {
        match unit {
            MemoryUnit::Byte => DataType::byte(key, raw),
            MemoryUnit::KiloByte => DataType::kilobyte(key, raw),
            MemoryUnit::MegaByte => DataType::megabyte(key, raw),
        }
    }

    /// The dotted key path.
    pub fn key(&self) -> &str {
        match *self {
            DataType::Float { ref key, .. }
            | DataType::String { ref key, .. }
            | DataType::FloatList { ref key, .. }
            | DataType::GCList { ref key, .. }
            | DataType::Byte { ref key, .. }
            | DataType::KiloByte { ref key, .. }
            | DataType::MegaByte { ref key, .. } => key,
        }
    }

    /// Short name of the variant, for log lines.
    pub fn kind(&self) -> &'static str {
        match *self {
            DataType::Float { .. } => "float",
            DataType::String { .. } => "string",
            DataType::FloatList { .. } => "float_list",
            DataType::GCList { .. } => "gc_list",
            DataType::Byte { .. } => "byte",
            DataType::KiloByte { .. } => "kilobyte",
            DataType::MegaByte { .. } => "megabyte",
        }
    }

    /// Append the canonical `"<key>":<value>` rendering to `buf`.
    pub fn render_into(&self, buf: &mut String) {
        util::push_quoted(buf, self.key());
        buf.push(':');
        match *self {
            DataType::Float { value, .. } | DataType::Byte { value, .. } => {
                util::push_float(buf, value)
            }
            DataType::KiloByte { value, .. } => {
                util::push_float(buf, value / MemoryUnit::KiloByte.divisor())
            }
            DataType::MegaByte { value, .. } => {
                util::push_float(buf, value / MemoryUnit::MegaByte.divisor())
            }
            DataType::String { ref value, .. } => util::push_quoted(buf, value),
            DataType::FloatList { ref value, .. } => {
                buf.push('[');
                for (i, v) in value.iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    util::push_float(buf, *v);
                }
                buf.push(']');
            }
            DataType::GCList { ref value, .. } => {
                buf.push('[');
                let micros = value.iter().filter(|v| **v > 0).map(|v| v / 1000);
                for (i, v) in micros.enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    buf.push_str(&v.to_string());
                }
                buf.push(']');
            }
        }
    }

    /// The canonical rendering as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = String::new();
        self.render_into(&mut buf);
        buf.into_bytes()
    }

    /// Compare against `other`.
    ///
    /// Variants must match first. Scalars compare key and value; byte
    /// magnitudes compare the raw value, so a `Byte` never equals a
    /// `MegaByte`. Lists only check that every element of `other` occurs in
    /// `self`, which is weaker than equality and not symmetric.
    pub fn equal(&self, other: &DataType) -> bool {
        match (self, other) {
            (
                &DataType::Float { ref key, value },
                &DataType::Float {
                    key: ref okey,
                    value: ovalue,
                },
            )
            | (
                &DataType::Byte { ref key, value },
                &DataType::Byte {
                    key: ref okey,
                    value: ovalue,
                },
            )
            | (
                &DataType::KiloByte { ref key, value },
                &DataType::KiloByte {
                    key: ref okey,
                    value: ovalue,
                },
            )
            | (
                &DataType::MegaByte { ref key, value },
                &DataType::MegaByte {
                    key: ref okey,
                    value: ovalue,
                },
            ) => key == okey && value == ovalue,
            (
                &DataType::String { ref key, ref value },
                &DataType::String {
                    key: ref okey,
                    value: ref ovalue,
                },
            ) => key == okey && value == ovalue,
            (
                &DataType::FloatList { ref key, ref value },
                &DataType::FloatList {
                    key: ref okey,
                    value: ref ovalue,
                },
            ) => key == okey && ovalue.iter().all(|v| value.contains(v)),
            (
                &DataType::GCList { ref key, ref value },
                &DataType::GCList {
                    key: ref okey,
                    value: ref ovalue,
                },
            ) => key == okey && ovalue.iter().all(|v| value.contains(v)),
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut buf = String::new();
        self.render_into(&mut buf);
        f.write_str(&buf)
    }
}

/// Why a whole payload produced no usable container.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// The bytes are not a JSON object.
    Malformed(String),
    /// The payload parsed but no value could be classified.
    Unidentified,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PayloadError::Malformed(ref reason) => {
                write!(f, "malformed payload: {}", reason)
            }
            PayloadError::Unidentified => {
                write!(f, "unidentified payload: no values could be classified")
            }
        }
    }
}

impl Error for PayloadError {
    fn description(&self) -> &str {
        match *self {
            PayloadError::Malformed(_) => "malformed payload",
            PayloadError::Unidentified => "unidentified payload",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(dt: &DataType) -> String {
        format!("{}", dt)
    }

    #[test]
    fn float_renders_six_decimals() {
        assert_eq!(render(&DataType::float("Multy", 666.77)), r#""Multy":666.770000"#);
        assert_eq!(render(&DataType::float("neg", -1.0)), r#""neg":-1.000000"#);
    }

    #[test]
    fn string_renders_quoted() {
        assert_eq!(
            render(&DataType::string("cmdline", "/bin/app")),
            r#""cmdline":"/bin/app""#
        );
        assert_eq!(
            render(&DataType::string("q", "a\"b")),
            r#""q":"a\"b""#
        );
    }

    #[test]
    fn float_list_keeps_order() {
        let dt = DataType::float_list("l", vec![3.0, 1.5, 2.25]);
        assert_eq!(render(&dt), r#""l":[3.000000,1.500000,2.250000]"#);
        assert_eq!(render(&DataType::float_list("e", vec![])), r#""e":[]"#);
    }

    #[test]
    fn gc_list_renders_micros_and_drops_zeros() {
        let dt = DataType::gc_list("memstats.PauseNs", vec![438238, 0, 506913, 999]);
        assert_eq!(render(&dt), r#""memstats.PauseNs":[438,506,0]"#);
        let empty = DataType::gc_list("p", vec![0, 0]);
        assert_eq!(render(&empty), r#""p":[]"#);
    }

    #[test]
    fn memory_units_convert_at_render_time() {
        let raw = 236_478_234.0;
        assert_eq!(render(&DataType::byte("Alloc", raw)), r#""Alloc":236478234.000000"#);
        assert_eq!(render(&DataType::kilobyte("Alloc", raw)), r#""Alloc":230935.775391"#);
        assert_eq!(render(&DataType::megabyte("Alloc", raw)), r#""Alloc":225.523218"#);

        match DataType::megabyte("Alloc", raw) {
            DataType::MegaByte { value, .. } => assert_eq!(value, raw),
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn memory_picks_variant_from_unit() {
        assert_eq!(DataType::memory("a", 1.0, MemoryUnit::Byte).kind(), "byte");
        assert_eq!(DataType::memory("a", 1.0, MemoryUnit::KiloByte).kind(), "kilobyte");
        assert_eq!(DataType::memory("a", 1.0, MemoryUnit::MegaByte).kind(), "megabyte");
    }

    #[test]
    fn unit_tags() {
        assert_eq!(MemoryUnit::from_tag("MB"), Some(MemoryUnit::MegaByte));
        assert_eq!(MemoryUnit::from_tag(" kb "), Some(MemoryUnit::KiloByte));
        assert_eq!(MemoryUnit::from_tag("b"), Some(MemoryUnit::Byte));
        assert_eq!(MemoryUnit::from_tag("gb"), None);
        for unit in &[MemoryUnit::Byte, MemoryUnit::KiloByte, MemoryUnit::MegaByte] {
            assert_eq!(MemoryUnit::from_tag(unit.tag()), Some(*unit));
        }
    }

    #[test]
    fn equal_checks_variant_first() {
        let b = DataType::byte("Alloc", 1024.0);
        let mb = DataType::megabyte("Alloc", 1024.0);
        let f = DataType::float("Alloc", 1024.0);
        assert!(b.equal(&DataType::byte("Alloc", 1024.0)));
        assert!(!b.equal(&mb));
        assert!(!mb.equal(&b));
        assert!(!f.equal(&b));
        assert!(!f.equal(&DataType::string("Alloc", "1024")));
    }

    #[test]
    fn equal_scalars_compare_key_and_value() {
        let f = DataType::float("a", 1.0);
        assert!(f.equal(&DataType::float("a", 1.0)));
        assert!(!f.equal(&DataType::float("b", 1.0)));
        assert!(!f.equal(&DataType::float("a", 1.5)));

        let s = DataType::string("a", "x");
        assert!(s.equal(&DataType::string("a", "x")));
        assert!(!s.equal(&DataType::string("a", "y")));
    }

    #[test]
    fn equal_lists_is_containment() {
        let wide = DataType::float_list("l", vec![1.0, 2.0, 3.0]);
        let narrow = DataType::float_list("l", vec![3.0, 1.0, 1.0]);
        assert!(wide.equal(&narrow));
        assert!(!narrow.equal(&wide));
        assert!(!wide.equal(&DataType::float_list("m", vec![1.0])));

        let gc = DataType::gc_list("p", vec![10, 20, 30]);
        assert!(gc.equal(&DataType::gc_list("p", vec![30, 10])));
        assert!(!gc.equal(&DataType::gc_list("p", vec![40])));
        assert!(!gc.equal(&wide));
    }

    #[test]
    fn to_bytes_matches_display() {
        let dt = DataType::kilobyte("HeapSys", 2048.0);
        assert_eq!(dt.to_bytes(), render(&dt).into_bytes());
        assert_eq!(dt.key(), "HeapSys");
    }
}
