//! Streaming decode workers feeding bounded chunk queues.
//!
//! Each streaming call spawns exactly one worker that reads the HTTP body,
//! decodes chunks, and pushes them into a bounded channel. Every send races
//! the caller's cancellation token, so a cancelled consumer never leaves a
//! worker blocked on a full queue. The response body is owned by the worker
//! and therefore dropped (closed) on every exit path.

use crate::protocol::Protocol;
use crate::response::{self, StreamingChunk};
use crate::Error;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the chunk handoff queue between the decode worker and the
/// consumer.
pub(super) const CHUNK_QUEUE_DEPTH: usize = 32;

/// Terminal line emitted by local OpenAI-compatible servers.
const DONE_LINE: &str = "data: [DONE]";

/// Terminal payload in standard SSE streams.
const DONE_PAYLOAD: &str = "[DONE]";

/// Delivers one chunk, racing the cancellation token. Returns `false` when
/// the worker should stop (cancelled, or the consumer went away).
async fn deliver(
    tx: &mpsc::Sender<StreamingChunk>,
    cancel: &CancellationToken,
    chunk: StreamingChunk,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(chunk) => sent.is_ok(),
    }
}

/// What to do with one line of a line-oriented stream.
#[derive(Debug, PartialEq, Eq)]
enum LineAction<'a> {
    /// Blank line or other noise.
    Skip,
    /// The stream's terminal marker.
    Done,
    /// A chunk payload to decode.
    Payload(&'a str),
}

/// Classifies one trimmed line of a local-backend stream. Accepts both
/// SSE `data:`-prefixed lines and bare NDJSON lines.
fn classify_line(line: &str) -> LineAction<'_> {
    if line.is_empty() {
        return LineAction::Skip;
    }
    if line == DONE_LINE {
        return LineAction::Done;
    }
    LineAction::Payload(line.strip_prefix("data: ").unwrap_or(line))
}

/// Spawns the line-oriented decode worker used by local OpenAI-compatible
/// backends.
///
/// Reads the body line by line, skips blanks and malformed chunks, stops on
/// the `data: [DONE]` line, and emits one final error chunk on a hard read
/// failure.
pub(super) fn spawn_line_decoder(
    response: reqwest::Response,
    protocol: Protocol,
    cancel: CancellationToken,
) -> mpsc::Receiver<StreamingChunk> {
    let (tx, rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("stream cancelled by caller");
                    return;
                }
                item = body.next() => item,
            };

            let bytes = match item {
                // Body exhausted; any partial trailing line is dropped.
                None => return,
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    let chunk =
                        StreamingChunk::from_error(Error::stream(format!("read failed: {e}")));
                    deliver(&tx, &cancel, chunk).await;
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                match classify_line(line.trim()) {
                    LineAction::Skip => continue,
                    LineAction::Done => return,
                    LineAction::Payload(payload) => {
                        match response::parse_stream_chunk(protocol, payload.as_bytes()) {
                            Ok(chunk) => {
                                if !deliver(&tx, &cancel, chunk).await {
                                    return;
                                }
                            }
                            Err(e) => {
                                // One bad chunk must not kill the stream.
                                tracing::debug!(error = %e, "skipping malformed stream chunk");
                            }
                        }
                    }
                }
            }
        }
    });

    rx
}

/// Spawns the SSE event decode worker used by cloud backends.
///
/// Event framing (including `event:` prefixes and multi-line data) is
/// handled by `eventsource-stream`; this worker only recognizes the
/// `[DONE]` payload, decodes chunks, and carries hard failures as a final
/// error chunk.
pub(super) fn spawn_event_decoder(
    response: reqwest::Response,
    protocol: Protocol,
    cancel: CancellationToken,
) -> mpsc::Receiver<StreamingChunk> {
    let (tx, rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut events = response.bytes_stream().eventsource();

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("stream cancelled by caller");
                    return;
                }
                item = events.next() => item,
            };

            match item {
                None => return,
                Some(Err(e)) => {
                    let chunk =
                        StreamingChunk::from_error(Error::stream(format!("read failed: {e}")));
                    deliver(&tx, &cancel, chunk).await;
                    return;
                }
                Some(Ok(event)) => {
                    if event.data == DONE_PAYLOAD {
                        return;
                    }
                    match response::parse_stream_chunk(protocol, event.data.as_bytes()) {
                        Ok(chunk) => {
                            if !deliver(&tx, &cancel, chunk).await {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping malformed stream chunk");
                        }
                    }
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line(""), LineAction::Skip);
        assert_eq!(classify_line("data: [DONE]"), LineAction::Done);
        assert_eq!(
            classify_line(r#"data: {"model":"m"}"#),
            LineAction::Payload(r#"{"model":"m"}"#)
        );
        // Bare NDJSON lines pass through unchanged.
        assert_eq!(
            classify_line(r#"{"model":"m"}"#),
            LineAction::Payload(r#"{"model":"m"}"#)
        );
    }
}
