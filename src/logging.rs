//! Console output plus one file per log channel.
//!
//! Every channel writes through a daily rolling appender, e.g.
//! `logs/session.2026-10-19.log`, and only the newest [`KEEP_GENERATIONS`]
//! files of a channel are kept.

use clip_core::{log_channels, CoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const KEEP_GENERATIONS: usize = 3;

/// Directory and file name prefix of one channel's files.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFile {
    pub dir: PathBuf,
    pub prefix: &'static str,
}

impl ChannelFile {
    fn new(dir: PathBuf, prefix: &'static str) -> Self {
        Self { dir, prefix }
    }

    pub fn appender(&self) -> Result<RollingFileAppender, CoreError> {
        fs::create_dir_all(&self.dir)?;
        Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(self.prefix)
            .filename_suffix("log")
            .max_log_files(KEEP_GENERATIONS)
            .build(&self.dir)
            .map_err(|e| CoreError::Internal {
                message: format!(
                    "cannot open {} log in {}: {}",
                    self.prefix,
                    self.dir.display(),
                    e
                ),
            })
    }
}

pub struct LogFiles {
    pub session: ChannelFile,
    pub errors: ChannelFile,
    pub youtube: ChannelFile,
}

impl LogFiles {
    pub fn under(log_dir: &Path) -> Self {
        Self {
            session: ChannelFile::new(log_dir.to_path_buf(), "session"),
            errors: ChannelFile::new(log_dir.join("errors"), "error"),
            youtube: ChannelFile::new(log_dir.to_path_buf(), "youtube"),
        }
    }
}

/// Flushes the file writers when dropped; hold it for the life of the process.
#[must_use = "file logging stops once the guards are dropped"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Installs the global subscriber. `RUST_LOG` controls the console only.
pub fn init(log_dir: &Path) -> Result<LogGuards, CoreError> {
    let files = LogFiles::under(log_dir);

    let (session_writer, session_guard) = tracing_appender::non_blocking(files.session.appender()?);
    let (errors_writer, errors_guard) = tracing_appender::non_blocking(files.errors.appender()?);
    let (youtube_writer, youtube_guard) = tracing_appender::non_blocking(files.youtube.appender()?);

    let console = fmt::layer().with_target(false).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    let session = fmt::layer()
        .with_ansi(false)
        .with_writer(session_writer)
        .with_filter(Targets::new().with_target(log_channels::SESSION, LevelFilter::DEBUG));

    // Anything at error level lands here too, whatever its channel
    let errors = fmt::layer()
        .with_ansi(false)
        .with_writer(errors_writer)
        .with_filter(
            Targets::new()
                .with_target(log_channels::ERRORS, LevelFilter::TRACE)
                .with_default(LevelFilter::ERROR),
        );

    let youtube = fmt::layer()
        .with_ansi(false)
        .with_writer(youtube_writer)
        .with_filter(Targets::new().with_target(log_channels::YOUTUBE, LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(session)
        .with(errors)
        .with(youtube)
        .try_init()
        .map_err(|e| CoreError::Internal {
            message: format!("failed to install log subscriber: {}", e),
        })?;

    Ok(LogGuards {
        _guards: vec![session_guard, errors_guard, youtube_guard],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("test_logs_{}", uuid::Uuid::new_v4()))
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_channel_locations() {
        let files = LogFiles::under(Path::new("logs"));
        assert_eq!(files.session.dir, Path::new("logs"));
        assert_eq!(files.session.prefix, "session");
        assert_eq!(files.errors.dir, Path::new("logs/errors"));
        assert_eq!(files.errors.prefix, "error");
        assert_eq!(files.youtube.dir, Path::new("logs"));
        assert_eq!(files.youtube.prefix, "youtube");
    }

    #[test]
    fn test_appender_writes_dated_channel_file() {
        let dir = temp_dir();
        let files = LogFiles::under(&dir);

        let mut appender = files.session.appender().unwrap();
        appender.write_all(b"cycle done\n").unwrap();
        appender.flush().unwrap();

        let names = files_in(&dir);
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("session."));
        assert!(names[0].ends_with(".log"));
        let written = fs::read_to_string(dir.join(&names[0])).unwrap();
        assert_eq!(written, "cycle done\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_error_channel_directory_is_created() {
        let dir = temp_dir();
        let files = LogFiles::under(&dir);

        let mut appender = files.errors.appender().unwrap();
        appender.write_all(b"boom\n").unwrap();
        appender.flush().unwrap();

        let names = files_in(&dir.join("errors"));
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("error."));

        fs::remove_dir_all(&dir).ok();
    }
}
