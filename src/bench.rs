//! Wall-clock timing with append-only log records.
//!
//! A record is one comma-separated line, `n_procs, resolution,
//! max_iter, seconds`, appended to a file under the log directory so
//! repeated runs accumulate into a dataset ready for plotting.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Times one run and appends the measurement to a log file.
#[derive(Debug)]
pub struct Benchmark {
    resolution: f64,
    max_iter: u32,
    n_procs: usize,
    log_dir: PathBuf,
    started: Option<Instant>,
    duration: f64,
}

impl Benchmark {
    /// A benchmark that logs under the default `./logs` directory.
    pub fn new(resolution: f64, max_iter: u32, n_procs: usize) -> Benchmark {
        Benchmark::with_log_dir(resolution, max_iter, n_procs, PathBuf::from("./logs"))
    }

    /// A benchmark that logs under an explicit directory.
    pub fn with_log_dir(
        resolution: f64,
        max_iter: u32,
        n_procs: usize,
        log_dir: PathBuf,
    ) -> Benchmark {
        Benchmark {
            resolution,
            max_iter,
            n_procs,
            log_dir,
            started: None,
            duration: 0.0,
        }
    }

    /// Starts (or restarts) the clock.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stops the clock and returns the seconds elapsed since `start`.
    /// A clock that was never started reads zero.
    pub fn stop(&mut self) -> f64 {
        self.duration = match self.started {
            Some(started) => started.elapsed().as_secs_f64(),
            None => 0.0,
        };
        self.duration
    }

    /// Appends one record to `<log_dir>/<file_name>`, creating the file
    /// on first use. A log that cannot be opened or written is reported
    /// on stderr; the measurement itself is never the reason a run
    /// fails.
    pub fn log(&self, file_name: &str) {
        let path = self.log_dir.join(file_name);
        let record = format!(
            "{}, {}, {}, {}\n",
            self.n_procs, self.resolution, self.max_iter, self.duration
        );
        let outcome = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(record.as_bytes()));
        if let Err(e) = outcome {
            eprintln!("could not append to logfile {}: {}", path.display(), e);
        }
    }
}
