//! Logging module for terminal and file based output control.
//!
//! Contains a custom logging implementation writing every record to a
//! size-bounded rotating file, while only surfacing the more severe
//! records on the terminal based on command line switches.
use clap::ArgMatches;
use logger::{Level, LevelFilter, Log, Metadata, Record};

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::types::UtilResult;

/// Default location of the log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "prepare-script.log";

/// Maximum size of a log file before it's rotated.
const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Number of rotated log files to keep around.
const MAX_LOG_BACKUPS: usize = 2;

/// Append-only file which rolls over to numbered backups once full.
///
/// Backups are named by suffixing the file path, so `prepare.log` rolls
/// into `prepare.log.1`, which in turn rolls into `prepare.log.2`, etc.
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    /// Opens (or creates) a rotating file at the provided path.
    pub fn open<P: Into<PathBuf>>(path: P, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            backups,
            file,
            written,
        })
    }

    /// Writes a single line, rotating beforehand if it would overflow.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let length = line.len() as u64 + 1;

        if self.written > 0 && self.written + length > self.max_bytes {
            self.rotate()?;
        }

        writeln!(self.file, "{}", line)?;
        self.written += length;

        Ok(())
    }

    /// Shifts all backups along by one and starts a fresh file.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        for idx in (1..self.backups).rev() {
            let from = backup_path(&self.path, idx);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, idx + 1))?;
            }
        }

        fs::rename(&self.path, backup_path(&self.path, 1))?;

        self.file = open_append(&self.path)?;
        self.written = 0;

        Ok(())
    }
}

/// Opens a file in append mode, creating it if necessary.
fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Builds the path of the backup with the provided index.
fn backup_path(path: &Path, idx: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", idx));
    PathBuf::from(name)
}

/// Logger writing to a rotating file and (selectively) to the terminal.
pub struct PrepLogger {
    console: LevelFilter,
    file: Mutex<RotatingFile>,
}

impl PrepLogger {
    /// Constructs a new logger around a file and a console threshold.
    pub fn new(file: RotatingFile, console: LevelFilter) -> Self {
        Self {
            console,
            file: Mutex::new(file),
        }
    }
}

// Prep logging implementation.
impl Log for PrepLogger {
    /// Returns enabled only for s3-migration-prep modules.
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("s3_migration_prep") && metadata.level() <= Level::Info
    }

    /// Logs out a `Record` when logging is enabled.
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();

        if level <= self.console {
            eprintln!("[{:<5}]  {}", level, record.args());
        }

        let line = format!(
            "{} [{:<5}]  {}",
            humantime::format_rfc3339_seconds(SystemTime::now()),
            level,
            record.args()
        );

        if let Ok(mut file) = self.file.lock() {
            // nowhere left to report a failing log file
            let _ = file.write_line(&line);
        }
    }

    /// Flushes this logger.
    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.file.flush();
        }
    }
}

/// Determines the console threshold from the provided arguments.
///
/// Warnings and errors are shown by default; `-q` narrows this down to
/// errors only, while `-v` widens it to include progress messages.
pub fn console_level(args: &ArgMatches) -> LevelFilter {
    if args.is_present("quiet") {
        LevelFilter::Error
    } else if args.is_present("verbose") {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

/// Initializes the logger based on the provided arguments.
pub fn init(args: &ArgMatches) -> UtilResult<()> {
    let path = args.value_of("log-file").unwrap_or(DEFAULT_LOG_FILE);
    let file = RotatingFile::open(path, MAX_LOG_BYTES, MAX_LOG_BACKUPS)?;
    let prep = Box::new(PrepLogger::new(file, console_level(args)));

    logger::set_boxed_logger(prep)?;
    logger::set_max_level(LevelFilter::Info);

    Ok(())
}
