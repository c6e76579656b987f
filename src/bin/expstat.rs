#![allow(unknown_lints)]

extern crate chan_signal;
extern crate chrono;
extern crate expstat;
extern crate fern;
extern crate serde_json;

#[macro_use]
extern crate log;

use chrono::Utc;
use expstat::datatype::mapper;
use expstat::engine::{self, Engine};
use expstat::reader::FileReader;
use expstat::recorder::{Console, Null, Recorder};
use expstat::token::Context;
use std::collections::HashMap;
use std::process;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

fn join_all(workers: HashMap<String, thread::JoinHandle<()>>) {
    for (worker_id, worker) in workers {
        if worker.join().is_err() {
            error!("worker {} panicked", worker_id);
        }
    }
}

fn main() {
    let args = match expstat::config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Signals must be masked before any other thread is spawned.
    let signal =
        chan_signal::notify(&[chan_signal::Signal::INT, chan_signal::Signal::TERM]);

    // Documents may go to stdout, so logs go to stderr.
    let logging = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("-"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
    if let Err(e) = logging {
        eprintln!("could not set up logging: {}", e);
        process::exit(1);
    }

    info!("expstat - {}", args.version);

    if args.readers.is_empty() {
        error!("no readers configured, nothing to do");
        process::exit(1);
    }

    let interval = Duration::from_secs(args.interval);
    let timeout = Duration::from_secs(args.timeout);
    let root = Context::background();

    // One thread per reader. Each engine gets its own copy of the rules so no
    // two threads ever share them.
    let mut workers: HashMap<String, thread::JoinHandle<()>> = HashMap::new();
    for (config_path, config) in args.readers {
        let recorder: Box<Recorder + Send> = match args.null {
            Some(ref cfg) => Box::new(Null::new(cfg)),
            None => match args.console {
                Some(ref cfg) => Box::new(Console::new(cfg)),
                None => Box::new(Null::new(&expstat::recorder::NullConfig::new(
                    "recorders.null".to_string(),
                ))),
            },
        };
        let mut worker = Engine::new(
            config_path.clone(),
            Box::new(FileReader::new(config)),
            recorder,
            args.mapper.clone(),
            timeout,
        );
        let ctx = root.clone();
        let handle = thread::Builder::new()
            .name(config_path.clone())
            .spawn(move || worker.run(&ctx, interval));
        match handle {
            Ok(handle) => {
                workers.insert(config_path, handle);
            }
            Err(e) => {
                error!("could not start {}: {}", config_path, e);
                process::exit(1);
            }
        }
    }

    let sig = signal.recv();
    info!("received {:?}, shutting down", sig);
    root.cancel();
    join_all(workers);

    info!(
        "cycles: {} recorded: {} skipped: {}",
        engine::ENGINE_CYCLES.load(Ordering::Relaxed),
        engine::ENGINE_RECORDED.load(Ordering::Relaxed),
        engine::ENGINE_SKIPPED.load(Ordering::Relaxed)
    );
    match serde_json::to_string(&mapper::counters()) {
        Ok(counters) => info!("classification counters: {}", counters),
        Err(e) => error!("could not encode counters: {}", e),
    }
}
