use recorder::{RecordError, Recorder};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use token::TokenContext;

lazy_static! {
    /// Total documents written by console recorders
    pub static ref CONSOLE_DOCUMENTS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Configuration for the `Console` recorder
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// The recorder's unique name in the configuration.
    pub config_path: String,
}

impl Default for ConsoleConfig {
    fn default() -> ConsoleConfig {
        ConsoleConfig {
            config_path: "recorders.console".to_string(),
        }
    }
}

/// Writes every document as one line.
///
/// Documents contain no newlines, so the output is a stream of JSON objects
/// one per line, ready for any line-oriented shipper.
pub struct Console<W> {
    name: String,
    out: W,
}

impl Console<io::Stdout> {
    /// Create a console recorder on stdout.
    pub fn new(config: &ConsoleConfig) -> Console<io::Stdout> {
        Console::with_writer(config, io::stdout())
    }
}

impl<W: Write> Console<W> {
    /// Create a console recorder on an arbitrary writer.
    pub fn with_writer(config: &ConsoleConfig, out: W) -> Console<W> {
        Console {
            name: config.config_path.clone(),
            out: out,
        }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Recorder for Console<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn record(&mut self, ctx: &TokenContext, doc: &[u8]) -> Result<(), RecordError> {
        self.out.write_all(doc)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        CONSOLE_DOCUMENTS.fetch_add(1, Ordering::Relaxed);
        trace!("[{}] {} wrote {} bytes", ctx, self.name, doc.len());
        Ok(())
    }
}
