//! Per-run logger with file and callback output.
//!
//! Each conversion run gets its own logger that:
//! - Writes to a dedicated log file
//! - Forwards messages to a callback (the CLI routes them into `tracing`)
//! - Supports compact mode with progress filtering
//! - Maintains a tail buffer of tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Mutable logger state, guarded by one lock.
struct Sink {
    /// Buffered log file; `None` once closed.
    file: Option<BufWriter<File>>,
    /// Most recent tool output lines, oldest first.
    tail: VecDeque<String>,
    /// Last progress percentage written in compact mode.
    last_progress: u32,
}

/// Per-run logger with dual output (file + callback).
///
/// Shared between steps behind an `Arc`; every method takes `&self`.
pub struct RunLogger {
    run_name: String,
    log_path: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
    sink: Mutex<Sink>,
}

impl RunLogger {
    /// Create a new run logger writing `<log_dir>/<run_name>.log`.
    ///
    /// The directory is created if needed. An existing log is never
    /// overwritten: a taken name gets a `-2`, `-3`, ... suffix.
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let (log_path, file) = create_unique(log_dir, &sanitize_filename(&run_name))?;
        let file = BufWriter::new(file);

        Ok(Self {
            sink: Mutex::new(Sink {
                file: Some(file),
                tail: VecDeque::with_capacity(config.error_tail),
                last_progress: 0,
            }),
            run_name,
            log_path,
            config,
            callback,
        })
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level >= self.config.level {
            self.emit(level, &self.stamp(message));
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a tool command line (`$ ...`).
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log a command one argument per line, shell continuation style.
    pub fn command_pretty(&self, program: &str, args: &[String]) {
        let formatted = args.iter().fold(program.to_string(), |mut acc, arg| {
            acc.push_str(" \\\n  ");
            acc.push_str(arg);
            acc
        });
        self.log(LogLevel::Info, &formatted);
    }

    /// Log a `=== Phase ===` marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    /// Log a `--- Section ---` marker.
    pub fn section(&self, section_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(section_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress percentage.
    ///
    /// In compact mode only crossings of `progress_step` boundaries and
    /// 100% are written. Returns whether anything was logged.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut sink = self.sink.lock();
            if percent / step <= sink.last_progress / step && percent < 100 {
                return false;
            }
            sink.last_progress = percent;
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record a line of tool output.
    ///
    /// Always kept in the tail buffer. Written out only when not compact
    /// and the level admits debug output.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        if self.config.error_tail > 0 {
            let mut sink = self.sink.lock();
            while sink.tail.len() >= self.config.error_tail {
                sink.tail.pop_front();
            }
            sink.tail.push_back(line.to_string());
        }

        if self.config.compact || self.config.level > LogLevel::Debug {
            return;
        }

        let line = if is_stderr {
            format!("[stderr] {}", line)
        } else {
            line.to_string()
        };
        self.emit(LogLevel::Debug, &self.stamp(&line));
    }

    /// Write the tail buffer at error level under a `[header/tail]` marker.
    pub fn show_tail(&self, header: &str) {
        let tail = self.get_tail();
        if tail.is_empty() {
            return;
        }

        self.emit(LogLevel::Error, &self.stamp(&format!("[{}/tail]", header)));
        for line in &tail {
            self.emit(LogLevel::Error, &self.stamp(line));
        }
    }

    pub fn clear_tail(&self) {
        self.sink.lock().tail.clear();
    }

    /// Copy of the tail buffer, oldest first.
    pub fn get_tail(&self) -> Vec<String> {
        self.sink.lock().tail.iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flush and release the log file. Later messages only reach the callback.
    pub fn close(&self) {
        let mut sink = self.sink.lock();
        if let Some(mut file) = sink.file.take() {
            let _ = file.flush();
        }
    }

    fn stamp(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn emit(&self, level: LogLevel, line: &str) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
        if let Some(callback) = &self.callback {
            callback(level, line);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Create `<stem>.log` in `dir`, or the first free `<stem>-N.log`.
fn create_unique(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    let mut attempt = 1u32;
    loop {
        let name = if attempt == 1 {
            format!("{}.log", stem)
        } else {
            format!("{}-{}.log", stem, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => {
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Replace characters that are not portable in file names with `_`.
fn sanitize_filename(name: &str) -> String {
    const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    name.replace(RESERVED, "_")
}

/// Assembles a [`RunLogger`] step by step.
pub struct RunLoggerBuilder {
    run_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl RunLoggerBuilder {
    pub fn new(run_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_name: run_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the level of the current config.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Create the log file and the logger.
    pub fn build(self) -> std::io::Result<RunLogger> {
        RunLogger::new(self.run_name, self.log_dir, self.config, self.callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("output-run", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().to_string_lossy().contains("output-run.log"));
        assert_eq!(logger.run_name(), "output-run");
    }

    #[test]
    fn same_run_name_keeps_earlier_log() {
        let dir = tempdir().unwrap();
        let first = RunLogger::new("video-20240101-120000", dir.path(), LogConfig::default(), None)
            .unwrap();
        first.info("first run");
        first.flush();

        let second = RunLogger::new("video-20240101-120000", dir.path(), LogConfig::default(), None)
            .unwrap();
        second.info("second run");
        second.flush();

        assert_ne!(first.log_path(), second.log_path());
        assert!(second.log_path().ends_with("video-20240101-120000-2.log"));
        let earlier = fs::read_to_string(first.log_path()).unwrap();
        assert!(earlier.contains("first run"));
        assert!(!earlier.contains("second run"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), LogConfig::default(), None).unwrap();

        logger.command("ffmpeg -i https://e.com/a.m3u8?t=***");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("$ ffmpeg -i https://e.com/a.m3u8?t=***"));
    }

    #[test]
    fn calls_callback_with_level() {
        let dir = tempdir().unwrap();
        let warn_count = Arc::new(AtomicUsize::new(0));
        let count_clone = warn_count.clone();

        let callback: LogCallback = Box::new(move |level, _msg| {
            if level == LogLevel::Warn {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let logger = RunLoggerBuilder::new("run", dir.path())
            .callback(callback)
            .build()
            .unwrap();

        logger.info("Message 1");
        logger.warn("Stream longer than anticipated");

        assert_eq!(warn_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn level_filters_debug() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let logger = RunLoggerBuilder::new("run", dir.path())
            .level(LogLevel::Warn)
            .callback(Box::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        logger.debug("hidden");
        logger.info("hidden");
        logger.error("shown");

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..LogConfig::default()
        };

        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        let written: Vec<u32> = [3, 19, 21, 33, 47, 60, 99, 100]
            .into_iter()
            .filter(|p| logger.progress(*p))
            .collect();
        assert_eq!(written, vec![21, 47, 60, 99, 100]);
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            ..LogConfig::default()
        };

        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        for frame in 1..=8 {
            logger.output_line(&format!("frame={}", frame), false);
        }

        assert_eq!(
            logger.get_tail(),
            vec!["frame=4", "frame=5", "frame=6", "frame=7", "frame=8"]
        );

        logger.clear_tail();
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn show_tail_writes_buffer_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), LogConfig::default(), None).unwrap();

        logger.output_line("Connection refused", true);
        logger.show_tail("download");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[download/tail]"));
        assert!(content.contains("Connection refused"));
    }

    #[test]
    fn command_pretty_splits_arguments() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        };
        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        logger.command_pretty("ffmpeg", &["-i".to_string(), "in.m3u8".to_string()]);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.starts_with("ffmpeg \\\n  -i \\\n  in.m3u8"));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("video-20240101-120000"), "video-20240101-120000");
        assert_eq!(sanitize_filename("live/stream:1"), "live_stream_1");
        assert_eq!(sanitize_filename("a<b>|c?"), "a_b__c_");
    }
}
