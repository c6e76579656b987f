use recorder::{RecordError, Recorder};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use token::TokenContext;

lazy_static! {
    /// Total documents discarded by null recorders
    pub static ref NULL_DOCUMENTS: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Null recorder
///
/// This recorder is intended for testing and demonstration. Every document it
/// receives is dropped.
pub struct Null {
    name: String,
}

impl Null {
    /// Create a new Null recorder
    pub fn new(config: &NullConfig) -> Null {
        Null {
            name: config.config_path.clone(),
        }
    }
}

/// Configuration for the `Null` recorder
#[derive(Debug, Clone)]
pub struct NullConfig {
    /// The recorder's unique name in the configuration.
    pub config_path: String,
}

impl NullConfig {
    /// Create a new `NullConfig`
    pub fn new(config_path: String) -> NullConfig {
        NullConfig {
            config_path: config_path,
        }
    }
}

impl Recorder for Null {
    fn name(&self) -> &str {
        &self.name
    }

    fn record(&mut self, _: &TokenContext, _: &[u8]) -> Result<(), RecordError> {
        // discard document
        NULL_DOCUMENTS.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
