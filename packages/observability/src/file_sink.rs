//! JSONL file logging.
//!
//! Appends one JSON object per event to a shared log file. Several CGI
//! processes may append concurrently, so every line is flushed on write.

use crate::{default_log_path, env_filter, init_stderr_only, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Line-flushed appending writer shared by all events of the process.
#[derive(Clone)]
pub struct AppendLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl AppendLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for AppendLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber.
#[derive(Clone)]
pub struct WriterFactory {
    writer: AppendLogWriter,
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = AppendLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}

/// One flat JSON object per event: timestamp, level, target, message and the
/// event's fields. Span context is left out; work blocks log their chain id
/// as a field instead.
pub fn jsonl_layer<S, W>(make_writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
        .with_ansi(false)
        .with_writer(make_writer)
}

/// Install the JSONL subscriber, falling back to stderr when the file is unusable.
pub fn init_file_subscriber(config: &LogConfig) {
    let Some(log_path) = config.log_path.clone().or_else(default_log_path) else {
        init_stderr_only(config);
        return;
    };

    let writer = match AppendLogWriter::new(&log_path) {
        Ok(writer) => writer,
        Err(err) => {
            init_stderr_only(config);
            tracing::warn!(
                log_path = %log_path.display(),
                error = %err,
                "log file unavailable, logging to stderr only"
            );
            return;
        }
    };

    let json_layer = jsonl_layer(WriterFactory { writer });

    let stderr_layer = if config.also_stderr {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer.with_filter(env_filter(&config.default_level)))
        .with(stderr_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(log_path = %log_path.display(), "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_append_log_writer_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("test.jsonl");

        let mut writer = AppendLogWriter::new(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_append_log_writer_appends_to_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.jsonl");
        std::fs::write(&path, "old\n").unwrap();

        let mut writer = AppendLogWriter::new(&path).unwrap();
        writer.write_all(b"new\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_jsonl_layer_writes_flat_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("admin.jsonl");
        let writer = AppendLogWriter::new(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(jsonl_layer(WriterFactory { writer }));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(revision = "3e8", chain = 7u64, "Committed write transaction");
            tracing::warn!("Rollback failed");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["message"], "Committed write transaction");
        assert_eq!(lines[0]["revision"], "3e8");
        assert_eq!(lines[0]["chain"], 7);
        assert!(lines[0]["timestamp"].is_string());
        assert!(lines[0].get("span").is_none());
        assert_eq!(lines[1]["level"], "WARN");
    }
}
