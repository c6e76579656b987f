use reader::{ReadError, Reader};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use token::TokenContext;

lazy_static! {
    /// Total payloads read from files
    pub static ref FILE_READER_PAYLOADS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total bytes read from files
    pub static ref FILE_READER_BYTES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total failed file reads
    pub static ref FILE_READER_ERRORS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Reads the whole of one file every cycle.
///
/// Useful when the monitored process, or a sidecar, periodically dumps its
/// runtime statistics to disk.
pub struct FileReader {
    name: String,
    path: PathBuf,
}

/// Configuration for `FileReader`
#[derive(Debug, Clone, Deserialize)]
pub struct FileReaderConfig {
    /// The reader's unique name in the configuration.
    #[serde(default)]
    pub config_path: Option<String>,
    /// The file holding the JSON payload.
    pub path: PathBuf,
}

impl FileReader {
    /// Create a new `FileReader`.
    pub fn new(config: FileReaderConfig) -> FileReader {
        let FileReaderConfig { config_path, path } = config;
        let name = config_path.unwrap_or_else(|| format!("readers.{}", path.display()));
        FileReader {
            name: name,
            path: path,
        }
    }
}

impl Reader for FileReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, ctx: &TokenContext) -> Result<Vec<u8>, ReadError> {
        if ctx.is_done() {
            return Err(ReadError::Cancelled);
        }
        let mut buf = Vec::new();
        let res = fs::File::open(&self.path).and_then(|mut fp| fp.read_to_end(&mut buf));
        match res {
            Ok(sz) => {
                FILE_READER_PAYLOADS.fetch_add(1, Ordering::Relaxed);
                FILE_READER_BYTES.fetch_add(sz, Ordering::Relaxed);
                trace!("[{}] {} read {} bytes from {:?}", ctx, self.name, sz, self.path);
                Ok(buf)
            }
            Err(e) => {
                FILE_READER_ERRORS.fetch_add(1, Ordering::Relaxed);
                error!("[{}] {} could not read {:?}: {}", ctx, self.name, self.path, e);
                Err(ReadError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;
    use token::Context;

    #[test]
    fn reads_whole_file() {
        let dir = TempDir::new("file_reader").unwrap();
        let path = dir.path().join("vars.json");
        fs::File::create(&path)
            .unwrap()
            .write_all(br#"{"Alloc": 1}"#)
            .unwrap();

        let mut reader = FileReader::new(FileReaderConfig {
            config_path: Some("readers.app".to_string()),
            path: path,
        });
        assert_eq!(reader.name(), "readers.app");
        let ctx = TokenContext::new(&Context::background());
        assert_eq!(reader.read(&ctx).unwrap(), br#"{"Alloc": 1}"#.to_vec());
        // a second cycle re-reads from the start
        assert_eq!(reader.read(&ctx).unwrap(), br#"{"Alloc": 1}"#.to_vec());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new("file_reader").unwrap();
        let mut reader = FileReader::new(FileReaderConfig {
            config_path: None,
            path: dir.path().join("absent.json"),
        });
        assert!(reader.name().starts_with("readers."));
        let ctx = TokenContext::new(&Context::background());
        match reader.read(&ctx) {
            Err(ReadError::Io(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn done_context_is_cancelled() {
        let dir = TempDir::new("file_reader").unwrap();
        let mut reader = FileReader::new(FileReaderConfig {
            config_path: None,
            path: dir.path().join("absent.json"),
        });
        let root = Context::background();
        let ctx = TokenContext::new(&root);
        root.cancel();
        match reader.read(&ctx) {
            Err(ReadError::Cancelled) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
