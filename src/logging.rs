//! Verbose/quiet output control.
//!
//! Standard output on success is exactly the new image reference string
//! (§6); all progress and diagnostics go through [`Logger`] to standard
//! error so they never pollute that contract.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Logger {
    verbose: bool,
    start: Instant,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            start: Instant::now(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Per-blob / per-step diagnostic, shown only with `-v/--verbose`.
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[{:>6.2}s] {}", self.start.elapsed().as_secs_f64(), message);
        }
    }

    pub fn step(&self, message: &str) {
        eprintln!("==> {message}");
    }

    pub fn info(&self, message: &str) {
        eprintln!("{message}");
    }

    pub fn success(&self, message: &str) {
        eprintln!("--> {message}");
    }

    pub fn warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    pub fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}
