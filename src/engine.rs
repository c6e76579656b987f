//! The fetch cycle: read, classify, render, record.
//!
//! An `Engine` owns one reader, one recorder and its own copy of the mapper
//! rules. Each cycle runs under a fresh `TokenContext` whose id tags every log
//! line the cycle produces. A payload that fails as a whole is logged and not
//! recorded.

use chrono::Local;
use datatype::{Mapper, PayloadError};
use reader::{ReadError, Reader};
use recorder::{RecordError, Recorder};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use time;
use token::{Context, TokenContext};

lazy_static! {
    /// Total fetch cycles started
    pub static ref ENGINE_CYCLES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total documents handed to recorders successfully
    pub static ref ENGINE_RECORDED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total cycles that ended without recording
    pub static ref ENGINE_SKIPPED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Why a cycle did not record a document.
#[derive(Debug)]
pub enum CycleError {
    /// The reader failed.
    Read(ReadError),
    /// The payload was malformed or held nothing classifiable.
    Payload(PayloadError),
    /// The recorder failed.
    Record(RecordError),
    /// The cycle's context was done before the document was recorded.
    Cancelled,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CycleError::Read(ref e) => write!(f, "{}", e),
            CycleError::Payload(ref e) => write!(f, "{}", e),
            CycleError::Record(ref e) => write!(f, "{}", e),
            CycleError::Cancelled => write!(f, "cycle cancelled"),
        }
    }
}

impl Error for CycleError {
    fn description(&self) -> &str {
        match *self {
            CycleError::Read(_) => "read failed",
            CycleError::Payload(_) => "bad payload",
            CycleError::Record(_) => "record failed",
            CycleError::Cancelled => "cycle cancelled",
        }
    }

    fn cause(&self) -> Option<&Error> {
        match *self {
            CycleError::Read(ref e) => Some(e),
            CycleError::Payload(ref e) => Some(e),
            CycleError::Record(ref e) => Some(e),
            CycleError::Cancelled => None,
        }
    }
}

impl From<ReadError> for CycleError {
    fn from(e: ReadError) -> CycleError {
        match e {
            ReadError::Cancelled => CycleError::Cancelled,
            e => CycleError::Read(e),
        }
    }
}

impl From<RecordError> for CycleError {
    fn from(e: RecordError) -> CycleError {
        CycleError::Record(e)
    }
}

/// One reader wired to one recorder.
pub struct Engine {
    name: String,
    reader: Box<Reader + Send>,
    recorder: Box<Recorder + Send>,
    mapper: Mapper,
    timeout: Duration,
}

impl Engine {
    /// Create a new `Engine`.
    ///
    /// `mapper` should be this engine's own copy of the rules. Each cycle is
    /// given `timeout` to complete.
    pub fn new<S>(
        name: S,
        reader: Box<Reader + Send>,
        recorder: Box<Recorder + Send>,
        mapper: Mapper,
        timeout: Duration,
    ) -> Engine
    where
        S: Into<String>,
    {
        Engine {
            name: name.into(),
            reader: reader,
            recorder: recorder,
            mapper: mapper,
            timeout: timeout,
        }
    }

    /// The engine's name, usually its reader's configuration path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a single cycle under a context derived from `parent`.
    ///
    /// Returns the number of values in the recorded document.
    pub fn cycle(&mut self, parent: &Context) -> Result<usize, CycleError> {
        ENGINE_CYCLES.fetch_add(1, Ordering::Relaxed);
        let ctx = TokenContext::new(&parent.with_timeout(self.timeout));
        let res = self.run_cycle(&ctx);
        if let Err(ref e) = res {
            ENGINE_SKIPPED.fetch_add(1, Ordering::Relaxed);
            match *e {
                CycleError::Cancelled => info!("[{}] {}: {}", ctx, self.name, e),
                _ => error!("[{}] {}: {}", ctx, self.name, e),
            }
        }
        res
    }

    fn run_cycle(&mut self, ctx: &TokenContext) -> Result<usize, CycleError> {
        let start = Instant::now();
        let payload = self.reader.read(ctx)?;
        if ctx.is_done() {
            return Err(CycleError::Cancelled);
        }

        let container = self.mapper.container(ctx, &payload);
        if let Some(err) = container.error() {
            return Err(CycleError::Payload(err.clone()));
        }
        let doc = container.render(&Local::now());
        if ctx.is_done() {
            return Err(CycleError::Cancelled);
        }

        self.recorder.record(ctx, &doc)?;
        ENGINE_RECORDED.fetch_add(1, Ordering::Relaxed);
        debug!(
            "[{}] {} recorded {} values to {} in {}ns",
            ctx,
            self.name,
            container.len(),
            self.recorder.name(),
            time::elapsed_ns(start)
        );
        Ok(container.len())
    }

    /// Run cycles every `interval` until `parent` is done.
    pub fn run(&mut self, parent: &Context, interval: Duration) {
        info!("{} polling every {:?}", self.name, interval);
        while !parent.is_done() {
            let _ = self.cycle(parent);
            if !time::pause(parent, interval) {
                break;
            }
        }
        info!("{} stopped", self.name);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        payloads: Vec<Vec<u8>>,
    }

    impl Reader for Canned {
        fn name(&self) -> &str {
            "readers.canned"
        }

        fn read(&mut self, _: &TokenContext) -> Result<Vec<u8>, ReadError> {
            if self.payloads.is_empty() {
                return Err(ReadError::Cancelled);
            }
            Ok(self.payloads.remove(0))
        }
    }

    struct Collect {
        docs: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Recorder for Collect {
        fn name(&self) -> &str {
            "recorders.collect"
        }

        fn record(&mut self, _: &TokenContext, doc: &[u8]) -> Result<(), RecordError> {
            self.docs.lock().unwrap().push(doc.to_vec());
            Ok(())
        }
    }

    fn engine(payloads: Vec<&[u8]>) -> (Engine, Arc<Mutex<Vec<Vec<u8>>>>) {
        let docs = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::new(
            "readers.canned",
            Box::new(Canned {
                payloads: payloads.into_iter().map(|p| p.to_vec()).collect(),
            }),
            Box::new(Collect { docs: Arc::clone(&docs) }),
            Mapper::default(),
            Duration::from_secs(5),
        );
        (engine, docs)
    }

    #[test]
    fn good_payload_is_recorded() {
        let (mut engine, docs) = engine(vec![&br#"{"Alloc": 236478234, "NumGC": 3}"#[..]]);
        assert_eq!(engine.name(), "readers.canned");
        assert_eq!(engine.cycle(&Context::background()).unwrap(), 2);
        let docs = docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
        let doc = String::from_utf8(docs[0].clone()).unwrap();
        assert!(doc.starts_with("{\"@timestamp\":\""));
        assert!(doc.contains(r#""Alloc":225.523218"#));
        assert!(doc.contains(r#""NumGC":3.000000"#));
        assert!(doc.ends_with('}'));
    }

    #[test]
    fn bad_payloads_are_skipped() {
        let (mut engine, docs) = engine(vec![&b"{}"[..], &b"not json"[..]]);
        let root = Context::background();
        match engine.cycle(&root) {
            Err(CycleError::Payload(PayloadError::Unidentified)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match engine.cycle(&root) {
            Err(CycleError::Payload(PayloadError::Malformed(_))) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(docs.lock().unwrap().is_empty());
    }

    #[test]
    fn cancelled_parent_records_nothing() {
        let (mut engine, docs) = engine(vec![&br#"{"a": 1}"#[..]]);
        let root = Context::background();
        root.cancel();
        match engine.cycle(&root) {
            Err(CycleError::Cancelled) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(docs.lock().unwrap().is_empty());
    }

    #[test]
    fn run_stops_when_cancelled() {
        let (mut engine, _docs) = engine(vec![&br#"{"a": 1}"#[..]]);
        let root = Context::background();
        root.cancel();
        let start = Instant::now();
        engine.run(&root, Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
