// src/tick_log.rs - Per-tick record of commanded positions
use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Receives one record per motion tick.
#[async_trait(?Send)]
pub trait TickSink {
    /// Called once before the first tick of a run.
    async fn begin(&mut self, _servo_count: usize) -> io::Result<()> {
        Ok(())
    }

    /// Called after every commanded tick with the session time and the
    /// vector actually sent.
    async fn record(&mut self, time: f64, commanded: &[i32]) -> io::Result<()>;

    /// Called once when the run ends.
    async fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type ExtraInfoFn<'a> = Box<dyn FnMut() -> String + 'a>;

/// Plain-text tick log: `time p0 p1 ... pN-1 [extra]` per line.
pub struct TickLog<'a, W> {
    writer: W,
    extra: Option<ExtraInfoFn<'a>>,
    lines: usize,
}

impl<'a, W> TickLog<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            extra: None,
            lines: 0,
        }
    }

    /// Append the output of `extra` to every line. It is called once per tick.
    pub fn with_extra(mut self, extra: impl FnMut() -> String + 'a) -> Self {
        self.extra = Some(Box::new(extra));
        self
    }

    /// Number of tick lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl TickLog<'_, BufWriter<File>> {
    /// Create (or truncate) a log file.
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref()).await?;
        tracing::info!("Logging ticks to {}", path.as_ref().display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

#[async_trait(?Send)]
impl<'a, W> TickSink for TickLog<'a, W>
where
    W: AsyncWrite + Unpin,
{
    async fn begin(&mut self, servo_count: usize) -> io::Result<()> {
        let header = format!(
            "# {}\n# time, servo goal positions ({}), extra\n",
            chrono::Local::now().to_rfc3339(),
            servo_count
        );
        self.writer.write_all(header.as_bytes()).await
    }

    async fn record(&mut self, time: f64, commanded: &[i32]) -> io::Result<()> {
        let mut line = format!("{:.6}", time);
        for position in commanded {
            line.push(' ');
            line.push_str(&position.to_string());
        }
        if let Some(extra) = self.extra.as_mut() {
            let info = extra();
            if !info.is_empty() {
                line.push(' ');
                line.push_str(&info);
            }
        }
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.lines += 1;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }
}
