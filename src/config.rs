//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the collector can consume and use as configuration data.

use clap::{App, Arg};
use datatype::{Mapper, MapperError, Settings};
use reader::FileReaderConfig;
use recorder::{ConsoleConfig, NullConfig};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Errors raised while building `Args`.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Parse(toml::de::Error),
    /// A key holds a value of the wrong type or range.
    Invalid(String),
    /// The `[mapper]` table could not be turned into classification rules.
    Mapper(MapperError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "could not read config file: {}", e),
            ConfigError::Parse(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid(ref msg) => write!(f, "invalid configuration: {}", msg),
            ConfigError::Mapper(ref e) => write!(f, "invalid mapper configuration: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn description(&self) -> &str {
        match *self {
            ConfigError::Io(_) => "could not read config file",
            ConfigError::Parse(_) => "could not parse config file",
            ConfigError::Invalid(_) => "invalid configuration",
            ConfigError::Mapper(_) => "invalid mapper configuration",
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Parse(e)
    }
}

impl From<MapperError> for ConfigError {
    fn from(e: MapperError) -> ConfigError {
        ConfigError::Mapper(e)
    }
}

/// A TOML table read as mapper overrides.
impl Settings for toml::Value {
    fn has_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get_string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_string_map(&self, name: &str) -> HashMap<String, String> {
        self.get(name)
            .and_then(|v| v.as_table())
            .map(|tbl| {
                tbl.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Big configuration struct for the expstat executable
///
/// This struct is what we construct from parsing the configuration. It is not
/// intended to be created by external clients. Please see documentation on
/// `parse_args` in this module for more details.
#[derive(Debug)]
pub struct Args {
    /// The verbosity setting. The higher the value the more chatty we get.
    pub verbose: u64,
    /// Version string. This is set automatically.
    pub version: String,
    /// Seconds between two fetch cycles of the same reader.
    pub interval: u64,
    /// Seconds a single fetch cycle may take.
    pub timeout: u64,
    /// Classification rules: the defaults extended by the `[mapper]` table.
    pub mapper: Mapper,
    /// See `reader::FileReader` for more.
    pub readers: HashMap<String, FileReaderConfig>,
    /// See `recorder::Console` for more.
    pub console: Option<ConsoleConfig>,
    /// See `recorder::Null` for more.
    pub null: Option<NullConfig>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            verbose: 0,
            version: VERSION.unwrap_or("unknown").to_string(),
            interval: 10,
            timeout: 10,
            mapper: Mapper::default(),
            readers: HashMap::new(),
            console: None,
            null: None,
        }
    }
}

/// Parse the expstat configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Most configuration will be stored in an on-disk file. See
/// `expstat --help` for more information.
pub fn parse_args() -> Result<Args, ConfigError> {
    let args = App::new("expstat")
        .version(VERSION.unwrap_or("unknown"))
        .about("runtime statistics collection, typed and timestamped")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");

    match args.value_of("config-file") {
        Some(filename) => {
            let mut fp = File::open(filename)?;
            let mut buffer = String::new();
            fp.read_to_string(&mut buffer)?;
            parse_config_file(&buffer, verb)
        }
        None => Err(ConfigError::Invalid("no config file given".to_string())),
    }
}

fn positive_integer(value: &toml::Value, key: &str) -> Result<Option<u64>, ConfigError> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => match v.as_integer() {
            Some(i) if i > 0 => Ok(Some(i as u64)),
            _ => Err(ConfigError::Invalid(format!(
                "{} must be a positive integer",
                key
            ))),
        },
    }
}

/// Parse the expstat configuration file.
///
/// ```toml
/// interval = 10
/// timeout = 5
///
/// [mapper]
/// gc_types = ["PauseNs"]
///   [mapper.memory_bytes]
///   Alloc = "kb"
///
/// [readers.app]
/// path = "/var/run/app/vars.json"
///
/// [recorders.console]
/// ```
///
/// When no recorder is configured documents go to the console. Configuring
/// both `console` and `null` is an error.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    args.interval = positive_integer(&value, "interval")?.unwrap_or(args.interval);
    args.timeout = positive_integer(&value, "timeout")?.unwrap_or(args.interval);

    if let Some(mapper) = value.get("mapper") {
        if mapper.as_table().is_none() {
            return Err(ConfigError::Invalid("mapper must be a table".to_string()));
        }
        args.mapper = Mapper::with_settings(mapper)?;
    }

    if let Some(readers) = value.get("readers") {
        let readers = readers.as_table().ok_or_else(|| {
            ConfigError::Invalid("readers must be in table format".to_string())
        })?;
        for (name, tbl) in readers.iter() {
            let config_path = format!("readers.{}", name);
            let mut config: FileReaderConfig = tbl.clone()
                .try_into()
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", config_path, e)))?;
            config.config_path = Some(config_path.clone());
            args.readers.insert(config_path, config);
        }
    }

    if let Some(recorders) = value.get("recorders") {
        let recorders = recorders.as_table().ok_or_else(|| {
            ConfigError::Invalid("recorders must be in table format".to_string())
        })?;

        args.null = recorders
            .get("null")
            .map(|_| NullConfig::new("recorders.null".to_string()));

        args.console = recorders.get("console").map(|_| ConsoleConfig::default());

        if args.console.is_some() && args.null.is_some() {
            return Err(ConfigError::Invalid(
                "configure at most one of recorders.console and recorders.null".to_string(),
            ));
        }
    }

    if args.console.is_none() && args.null.is_none() {
        args.console = Some(ConsoleConfig::default());
    }

    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;
    use datatype::MemoryUnit;
    use std::path::PathBuf;

    #[test]
    fn config_file_defaults() {
        let args = parse_config_file("", 4).unwrap();
        assert_eq!(args.verbose, 4);
        assert_eq!(args.interval, 10);
        assert_eq!(args.timeout, 10);
        assert!(args.readers.is_empty());
        assert!(args.console.is_some());
        assert!(args.null.is_none());
        assert_eq!(args.mapper, Mapper::default());
    }

    #[test]
    fn config_file_interval_and_timeout() {
        let config = r#"
interval = 30
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.interval, 30);
        assert_eq!(args.timeout, 30);

        let config = r#"
interval = 30
timeout = 5
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.interval, 30);
        assert_eq!(args.timeout, 5);
    }

    #[test]
    fn config_file_rejects_bad_interval() {
        for config in &["interval = 0", "interval = -3", "interval = \"soon\""] {
            match parse_config_file(config, 0) {
                Err(ConfigError::Invalid(_)) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn config_file_rejects_bad_toml() {
        match parse_config_file("interval = ", 0) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn config_file_mapper_overrides() {
        let config = r#"
[mapper]
gc_types = ["Pauses", "PauseNs"]
  [mapper.memory_bytes]
  Alloc = "kb"
  RSS = "b"
"#;
        let args = parse_config_file(config, 0).unwrap();
        let m = args.mapper;
        assert_eq!(&m.gc_types()[..2], &["pauses", "pausens"]);
        assert!(m.is_gc_type("PauseEnd"));
        assert_eq!(m.memory_unit("Alloc"), Some(MemoryUnit::KiloByte));
        assert_eq!(m.memory_unit("rss"), Some(MemoryUnit::Byte));
        assert_eq!(m.memory_unit("HeapSys"), Some(MemoryUnit::MegaByte));
    }

    #[test]
    fn config_file_mapper_bad_unit() {
        let config = r#"
[mapper.memory_bytes]
Alloc = "tb"
"#;
        match parse_config_file(config, 0) {
            Err(ConfigError::Mapper(MapperError::UnknownUnit { ref key, ref unit })) => {
                assert_eq!(key, "Alloc");
                assert_eq!(unit, "tb");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn config_file_readers() {
        let config = r#"
[readers]
  [readers.app]
  path = "/tmp/app.json"
  [readers.db]
  path = "/tmp/db.json"
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.readers.len(), 2);
        let app = &args.readers["readers.app"];
        assert_eq!(app.path, PathBuf::from("/tmp/app.json"));
        assert_eq!(app.config_path, Some("readers.app".to_string()));
        assert_eq!(args.readers["readers.db"].path, PathBuf::from("/tmp/db.json"));
    }

    #[test]
    fn config_file_reader_without_path() {
        let config = r#"
[readers.app]
file = "/tmp/app.json"
"#;
        match parse_config_file(config, 0) {
            Err(ConfigError::Invalid(ref msg)) => assert!(msg.starts_with("readers.app")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn config_file_null_recorder() {
        let config = r#"
[recorders]
  [recorders.null]
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert!(args.console.is_none());
        assert_eq!(args.null.unwrap().config_path, "recorders.null");
    }

    #[test]
    fn config_file_rejects_two_recorders() {
        let config = r#"
[recorders.console]
[recorders.null]
"#;
        match parse_config_file(config, 0) {
            Err(ConfigError::Invalid(ref msg)) => {
                assert!(msg.contains("recorders.console"));
                assert!(msg.contains("recorders.null"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn config_file_console_recorder() {
        let config = r#"
[recorders.console]
"#;
        let args = parse_config_file(config, 0).unwrap();
        assert_eq!(args.console.unwrap().config_path, "recorders.console");
        assert!(args.null.is_none());
    }

    #[test]
    fn toml_settings() {
        let value: toml::Value = toml::from_str(
            r#"
gc_types = ["a", "b"]
counts = [1, 2]
memory_bytes = { x = "kb", y = 3 }
"#,
        ).unwrap();
        assert!(value.has_key("gc_types"));
        assert!(!value.has_key("nope"));
        assert_eq!(value.get_string_list("gc_types"), vec!["a", "b"]);
        let map = value.get_string_map("memory_bytes");
        assert_eq!(map.len(), 1);
        assert_eq!(map["x"], "kb");
        assert!(value.get_string_list("counts").is_empty());
        assert!(value.get_string_list("memory_bytes").is_empty());
    }
}
