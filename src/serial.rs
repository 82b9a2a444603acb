//! Sensor line source.
//!
//! The ingestion loop only needs "next line or timeout, as text". That seam
//! is the [`LineSource`] trait; [`SerialLineSource`] implements it over the
//! node's serial link with `tokio-serial`. Raw bytes are decoded lossily;
//! a garbled burst from the hardware link becomes a non-matching line, not
//! an error.

use crate::error::{AppResult, BridgeError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Capability: yield the next raw text line from the sensor transport.
#[async_trait]
pub trait LineSource: Send {
    /// Next line, or `None` if the read timed out with no complete line.
    ///
    /// The timeout keeps the caller's interval tick prompt even with no
    /// traffic on the link.
    async fn next_line(&mut self) -> AppResult<Option<String>>;
}

/// Line source over a buffered async reader with a per-read timeout.
///
/// Generic over the reader so tests can drive it from an in-memory stream.
pub struct TimedLineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin + Send> TimedLineReader<R> {
    /// Wrap `reader` with the given per-read timeout.
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            read_timeout,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for TimedLineReader<R> {
    async fn next_line(&mut self) -> AppResult<Option<String>> {
        // The partial line accumulated before a timeout stays in `buf` and is
        // completed by a later read.
        match tokio::time::timeout(self.read_timeout, read_to_newline(&mut self.reader, &mut self.buf))
            .await
        {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(BridgeError::Serial(format!("read failed: {e}"))),
            Ok(Ok(0)) if self.buf.is_empty() => {
                Err(BridgeError::Serial("unexpected EOF from sensor link".to_string()))
            }
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&self.buf).trim().to_string();
                self.buf.clear();
                Ok(Some(line))
            }
        }
    }
}

/// Read bytes until a newline, appending to `buf`. Returns bytes read.
async fn read_to_newline<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    reader.read_until(b'\n', buf).await
}

/// Serial-port line source for the sensor node.
pub struct SerialLineSource {
    inner: TimedLineReader<SerialStream>,
}

impl SerialLineSource {
    /// Open the serial port and wrap it as a line source.
    pub fn open(port: &str, baud_rate: u32, read_timeout: Duration) -> AppResult<Self> {
        let stream = tokio_serial::new(port, baud_rate)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("failed to open '{port}': {e}")))?;
        tracing::info!(port, baud_rate, "serial port opened");
        Ok(Self {
            inner: TimedLineReader::new(stream, read_timeout),
        })
    }
}

#[async_trait]
impl LineSource for SerialLineSource {
    async fn next_line(&mut self) -> AppResult<Option<String>> {
        self.inner.next_line().await
    }
}

/// Drive a [`LineSource`] from its own task, forwarding complete lines.
///
/// Decoupling the blocking read from the ingestion loop lets the loop
/// `select!` between line delivery and the interval tick without cancelling
/// a read mid-line. The task ends when the source fails or the receiver is
/// dropped; a source failure is delivered as the final message.
pub fn spawn_line_reader<S>(mut source: S) -> mpsc::Receiver<AppResult<String>>
where
    S: LineSource + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        loop {
            match source.next_line().await {
                Ok(Some(line)) => {
                    if !line.is_empty() && tx.send(Ok(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });
    rx
}
