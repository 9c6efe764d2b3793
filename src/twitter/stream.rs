//! Filtered stream reader.
//!
//! The streaming endpoint sends one JSON message per `\r\n` terminated line,
//! with blank lines as keep-alives. A background task splits the chunked
//! body into lines, decodes them and feeds a bounded channel.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::models::StreamMessage;

/// Capacity of the message channel; a full channel stops reading the body.
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Longest line kept before the reader gives up on it.
pub const MAX_LINE_LEN: usize = 512 * 1024;

/// Accumulates body chunks and yields complete, non-blank lines.
///
/// Lines longer than the limit are dropped with a warning. Once a pending
/// line overflows, the rest of it is skipped up to the next newline.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to hold no newline.
    scanned: usize,
    discarding: bool,
    max_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            discarding: false,
            max_len,
        }
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if self.discarding {
                self.discarding = false;
            } else if end - start > self.max_len {
                warn!(len = end - start, max = self.max_len, "Dropping oversized stream line");
            } else if let Some(line) = Self::to_line(&self.buf[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);

        if self.discarding || self.buf.len() > self.max_len {
            if !self.discarding {
                warn!(max = self.max_len, "Stream line exceeds limit, skipping to next newline");
                self.discarding = true;
            }
            self.buf.clear();
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Whatever is left after the body ended without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            self.buf.clear();
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Self::to_line(&raw)
    }

    fn to_line(raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Live subscription to the filtered stream.
///
/// Not restartable: once the remote closes the body the message channel
/// closes too.
pub struct FilterStream {
    messages: Option<mpsc::Receiver<StreamMessage>>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl FilterStream {
    /// Spawn the reader task over a response body.
    pub fn spawn<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let reader = tokio::spawn(read_body(body, tx, cancel.clone()));

        Self {
            messages: Some(rx),
            cancel,
            reader,
        }
    }

    /// Take ownership of the message receiver for the dispatch loop.
    /// Returns None if it was already taken.
    pub fn take_messages(&mut self) -> Option<mpsc::Receiver<StreamMessage>> {
        self.messages.take()
    }

    /// Stop the reader and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.reader.await {
            warn!("Stream reader task failed: {}", err);
        }
        info!("Filtered stream stopped");
    }
}

async fn read_body<S, E>(body: S, tx: mpsc::Sender<StreamMessage>, cancel: CancellationToken)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Stream reader cancelled");
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for line in lines.push(&bytes) {
                    if !forward(&line, &tx, &cancel).await {
                        return;
                    }
                }
            }
            Some(Err(err)) => {
                warn!("Stream read error: {}", err);
                break;
            }
            None => {
                info!("Stream ended by remote");
                break;
            }
        }
    }

    if let Some(line) = lines.finish() {
        forward(&line, &tx, &cancel).await;
    }
}

/// Decode and send one line. Returns false when the consumer is gone or
/// the reader was cancelled.
async fn forward(
    line: &str,
    tx: &mpsc::Sender<StreamMessage>,
    cancel: &CancellationToken,
) -> bool {
    let message = match StreamMessage::decode(line) {
        Ok(message) => message,
        Err(err) => {
            warn!("Skipping undecodable stream message: {}", err);
            return true;
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(message) => sent.is_ok(),
    }
}
