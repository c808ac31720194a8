//! Logging Sinks
//!
//! Process-wide log sink: an append-mode file plus an optional console
//! mirror, rendered as `[YYYY-MM-DD HH:MM:SS.mmm] [LEVEL] message`. The sink
//! handle is created by the entry point and passed down; a forked kitchen
//! re-points its inherited copy at `kitchen_<id>.log` and silences the
//! console, which only affects the child's address space.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct LogSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    console: AtomicBool,
    file: Mutex<Option<File>>,
}

impl LogSink {
    /// Open the append-mode log file and build the sink handle. Nothing is
    /// installed yet; see [`install`](LogSink::install).
    pub fn new(path: &Path, console: bool) -> io::Result<Self> {
        let file = open_log_file(path)?;
        Ok(Self {
            inner: Arc::new(SinkInner {
                console: AtomicBool::new(console),
                file: Mutex::new(Some(file)),
            }),
        })
    }

    /// Install this sink as the process-wide `tracing` subscriber.
    pub fn install(&self) -> anyhow::Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .event_format(TimestampedFormat)
            .with_env_filter(filter)
            .with_writer(self.clone())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
    }

    /// Re-point the sink at another file and set the console mirror. Used
    /// by a freshly forked kitchen before it enters its event loop.
    pub fn redirect(&self, path: &Path, console: bool) -> io::Result<()> {
        let file = open_log_file(path)?;
        *self.inner.file.lock().unwrap() = Some(file);
        self.inner.console.store(console, Ordering::Relaxed);
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> SinkWriter {
        SinkWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub struct SinkWriter {
    inner: Arc<SinkInner>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.console.load(Ordering::Relaxed) {
            let _ = io::stdout().write_all(buf);
        }
        if let Some(file) = self.inner.file.lock().unwrap().as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.inner.file.lock().unwrap().as_mut() {
            file.flush()?;
        }
        io::stdout().flush()
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `[YYYY-MM-DD HH:MM:SS.mmm] [LEVEL] message`
struct TimestampedFormat;

impl<S, N> FormatEvent<S, N> for TimestampedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        write!(
            writer,
            "[{timestamp}] [{}] ",
            level_label(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("plazza-log-{}-{name}", std::process::id()))
    }

    #[test]
    fn level_labels_match_the_log_format() {
        assert_eq!(level_label(&Level::WARN), "WARNING");
        assert_eq!(level_label(&Level::INFO), "INFO");
        assert_eq!(level_label(&Level::ERROR), "ERROR");
    }

    #[test]
    fn writer_appends_to_the_sink_file() {
        let path = scratch_path("write");
        let sink = LogSink::new(&path, false).unwrap();

        let mut writer = sink.make_writer();
        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        writer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first line\nsecond line\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn redirect_switches_the_sink_file() {
        let before = scratch_path("redirect-before");
        let after = scratch_path("redirect-after");
        let sink = LogSink::new(&before, false).unwrap();

        sink.make_writer().write_all(b"old\n").unwrap();
        sink.redirect(&after, false).unwrap();
        sink.make_writer().write_all(b"new\n").unwrap();

        assert_eq!(std::fs::read_to_string(&before).unwrap(), "old\n");
        assert_eq!(std::fs::read_to_string(&after).unwrap(), "new\n");
        let _ = std::fs::remove_file(&before);
        let _ = std::fs::remove_file(&after);
    }
}
