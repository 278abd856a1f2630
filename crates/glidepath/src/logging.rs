use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Maximum log file size before trimming (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Size to keep after trimming (1 MB of most recent logs)
const KEEP_SIZE: u64 = 1024 * 1024;

const LOG_FILE_NAME: &str = "glidepath.log";

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// `glidepath.log` inside this directory
    File(PathBuf),
}

/// Trim the log file if it exceeds `max_size`, keeping the last `keep` bytes
fn trim_log_if_needed(log_path: &Path, max_size: u64, keep: u64) -> io::Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let metadata = fs::metadata(log_path)?;
    if metadata.len() <= max_size {
        return Ok(());
    }

    let mut file = File::open(log_path)?;
    let start_pos = metadata.len().saturating_sub(keep);
    file.seek(SeekFrom::Start(start_pos))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    drop(file);

    // Skip to the first newline to avoid partial lines
    let skip = buffer
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(log_path)?;
    file.write_all(b"--- Log trimmed (older entries removed) ---\n")?;
    file.write_all(&buffer[skip..])?;
    Ok(())
}

/// Produces writers for the shared log file
#[derive(Clone)]
struct LogWriterFactory {
    file: Arc<Mutex<File>>,
}

struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl LogWriter {
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut *file)
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            file: self.file.clone(),
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("glidepath={level},glidepath_core={level}")))
}

/// Initialize logging.
///
/// `RUST_LOG` overrides `level`. File logs go to `{dir}/glidepath.log`, which is
/// trimmed to its last 1MB on start-up once it grows past 5MB.
pub fn init_logging(target: &LogTarget, level: &str) -> color_eyre::Result<()> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter(level))
                .with(fmt::layer().with_writer(io::stderr).with_target(false))
                .init();
        }
        LogTarget::File(dir) => {
            fs::create_dir_all(dir)?;
            let log_path = dir.join(LOG_FILE_NAME);
            if let Err(e) = trim_log_if_needed(&log_path, MAX_LOG_SIZE, KEEP_SIZE) {
                eprintln!("Warning: Failed to trim log file: {e}");
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;

            tracing_subscriber::registry()
                .with(env_filter(level))
                .with(
                    fmt::layer()
                        .with_writer(LogWriterFactory {
                            file: Arc::new(Mutex::new(file)),
                        })
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(false),
                )
                .init();
            tracing::info!(log_path = %log_path.display(), "logging initialized");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_log_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "one\ntwo\n").unwrap();

        trim_log_if_needed(&path, 1024, 4).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_large_log_keeps_whole_recent_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "first line\nsecond line\nthird\n").unwrap();

        trim_log_if_needed(&path, 10, 12).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("--- Log trimmed"));
        assert!(content.ends_with("third\n"));
        assert!(!content.contains("first"));
    }

    #[test]
    fn test_missing_log_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(trim_log_if_needed(&dir.path().join("none.log"), 10, 5).is_ok());
    }
}
