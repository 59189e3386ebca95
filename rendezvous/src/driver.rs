//! # Barrier Test Driver
//!
//! Runs a pool of workers against one shared [`Barrier`]: every worker loops
//! `iterations` times, waiting on the barrier once per iteration, and the
//! whole pool is spawned and joined again for each of `rounds` rounds.
//!
//! ```rust
//! use rendezvous::driver::{run, DriverConfig};
//!
//! let config = DriverConfig { threads: 4, iterations: 5, rounds: 2, ..Default::default() };
//! let report = run(&config).unwrap();
//! assert_eq!(report.releases, 10);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::round_span;
use crate::thread::{Barrier, DriverError, ThreadGroupCoordinator, ThreadOptions};

pub const DEFAULT_THREADS: usize = 4;
pub const DEFAULT_ITERATIONS: usize = 10;
pub const DEFAULT_ROUNDS: usize = 10;

/// Stack size given to named threads when `--named` is used without `--stack-size`.
pub const NAMED_THREAD_STACK_SIZE: usize = 40_000;

/// State shared by every worker of the pool
#[derive(Debug)]
pub struct WorkerContext {
    /// Barrier that paces each iteration; sized to the worker count
    barrier: Arc<Barrier>,

    /// Iterations each worker runs per round
    iterations: usize,

    /// Cycles completed, counted by the last arriver of each cycle
    releases: AtomicUsize,

    /// Workers that returned from their routine
    completions: AtomicUsize,
}

impl WorkerContext {
    pub fn new(barrier: Arc<Barrier>, iterations: usize) -> Self {
        Self {
            barrier,
            iterations,
            releases: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
        }
    }

    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::Acquire)
    }
}

/// Worker routine: run each iteration, then block until the rest of the pool
/// has finished it too.
pub fn tester(context: &WorkerContext) {
    for iteration in 1..=context.iterations {
        tracing::info!(iteration, "in iteration");

        if context.barrier.wait().is_leader() {
            context.releases.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(iteration, "barrier released");
        }
    }

    context.completions.fetch_add(1, Ordering::AcqRel);
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Workers per round; also the barrier capacity
    pub threads: usize,
    /// Barrier cycles per round
    pub iterations: usize,
    /// Spawn/join rounds
    pub rounds: usize,
    /// Uniform worker stack size in bytes
    pub stack_size: Option<usize>,
    /// Name workers `thread0`, `thread1`, ... with an explicit stack size each
    pub name_threads: bool,
    /// Also append logs to this file
    pub log_file: Option<String>,
    /// Log at DEBUG level
    pub verbose: bool,
    /// Print usage and exit
    pub help: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            iterations: DEFAULT_ITERATIONS,
            rounds: DEFAULT_ROUNDS,
            stack_size: None,
            name_threads: false,
            log_file: None,
            verbose: false,
            help: false,
        }
    }
}

impl DriverConfig {
    fn options() -> getopts::Options {
        let mut opts = getopts::Options::new();
        opts.optopt("w", "threads", "number of worker threads, or `auto` for one per cpu", "NUM");
        opts.optopt("i", "iterations", "barrier cycles per round", "NUM");
        opts.optopt("r", "rounds", "spawn/join rounds", "NUM");
        opts.optopt("s", "stack-size", "worker stack size in bytes", "BYTES");
        opts.optflag("n", "named", "name worker threads thread0, thread1, ...");
        opts.optopt("l", "log-file", "also append the log to FILE", "FILE");
        opts.optflag("v", "verbose", "log at debug level");
        opts.optflag("h", "help", "print this help");
        opts
    }

    /// Usage text for `program`.
    pub fn usage(program: &str) -> String {
        let brief = format!("Usage: {} [options]", program);
        Self::options().usage(&brief)
    }

    /// Constructs a configuration by parsing command-line arguments, not
    /// including the program name.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, DriverError> {
        let matches = Self::options()
            .parse(args)
            .map_err(|e| DriverError::Config(e.to_string()))?;

        let defaults = Self::default();
        let threads = match matches.opt_str("w").as_deref() {
            Some("auto") => num_cpus::get(),
            Some(raw) => parse_number("threads", raw)?,
            None => defaults.threads,
        };
        let iterations = match matches.opt_str("i") {
            Some(raw) => parse_number("iterations", &raw)?,
            None => defaults.iterations,
        };
        let rounds = match matches.opt_str("r") {
            Some(raw) => parse_number("rounds", &raw)?,
            None => defaults.rounds,
        };
        let stack_size = matches
            .opt_str("s")
            .map(|raw| parse_number("stack-size", &raw))
            .transpose()?;

        Ok(Self {
            threads,
            iterations,
            rounds,
            stack_size,
            name_threads: matches.opt_present("n"),
            log_file: matches.opt_str("l"),
            verbose: matches.opt_present("v"),
            help: matches.opt_present("h"),
        })
    }

    /// Spawn options for the worker pool.
    pub fn thread_options(&self) -> ThreadOptions {
        let mut options = ThreadOptions::new();
        if self.name_threads {
            let stack = self.stack_size.unwrap_or(NAMED_THREAD_STACK_SIZE);
            options = options
                .with_names((0..self.threads).map(|i| format!("thread{}", i)).collect())
                .with_stack_sizes(vec![stack; self.threads]);
        } else if let Some(bytes) = self.stack_size {
            options = options.with_stack_size(bytes);
        }
        options
    }
}

fn parse_number(option: &str, raw: &str) -> Result<usize, DriverError> {
    raw.parse()
        .map_err(|e| DriverError::Config(format!("invalid value `{}` for --{}: {}", raw, option, e)))
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub rounds_completed: usize,
    /// Barrier cycles observed across all rounds
    pub releases: usize,
    /// Workers that returned normally across all rounds
    pub worker_completions: usize,
    /// Final barrier generation
    pub generation: u64,
}

/// Run the barrier test described by `config`.
///
/// Stops at the first spawn or join failure. Workers of a partially spawned
/// round cannot complete a barrier cycle, so they are left to the process.
pub fn run(config: &DriverConfig) -> Result<RunReport, DriverError> {
    let barrier = Arc::new(Barrier::new(config.threads)?);
    let context = Arc::new(WorkerContext::new(Arc::clone(&barrier), config.iterations));
    let mut coordinator = ThreadGroupCoordinator::with_options(config.thread_options());

    for round in 0..config.rounds {
        let span = round_span!(round, threads = config.threads);
        let _guard = span.enter();
        tracing::info!("starting round");

        let group = coordinator
            .spawn(config.threads, tester, Arc::clone(&context))
            .inspect_err(|e| {
                crate::log_error!(e, operation = "spawn_n", started = e.started());
            })?;

        coordinator
            .join_all(group)
            .inspect_err(|e| {
                crate::log_error!(e, operation = "join");
            })?;
    }

    let report = RunReport {
        rounds_completed: config.rounds,
        releases: context.releases(),
        worker_completions: context.completions(),
        generation: barrier.generation(),
    };
    tracing::info!(releases = report.releases, "test done");
    Ok(report)
}
