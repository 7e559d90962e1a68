// Streaming response handling
// Incremental UTF-8 decode of a chunked body with per-chunk callbacks

use futures::StreamExt;
use reqwest::Response;

use super::WorkflowError;

/// Receives decoded text as a streaming body arrives
pub trait StreamObserver: Send {
    /// Called for every non-empty decoded chunk
    fn on_chunk(&mut self, chunk: &str);

    /// Called once when the stream ends normally
    fn on_complete(&mut self) {
        log::debug!("[workflow] Stream complete");
    }

    /// Called once when reading the stream fails
    fn on_error(&mut self, error: WorkflowError) {
        log::error!("[workflow] Stream error: {}", error);
    }
}

/// Observer that accumulates the streamed text
#[derive(Debug, Default)]
pub struct StreamCollector {
    accumulated_content: String,
    chunks: usize,
    completed: bool,
    error: Option<String>,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.accumulated_content
    }

    pub fn into_content(self) -> String {
        self.accumulated_content
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl StreamObserver for StreamCollector {
    fn on_chunk(&mut self, chunk: &str) {
        self.chunks += 1;
        self.accumulated_content.push_str(chunk);
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }

    fn on_error(&mut self, error: WorkflowError) {
        self.error = Some(error.to_string());
    }
}

/// UTF-8 decoder that carries split multi-byte sequences across chunks
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the buffered input as forms complete characters.
    /// Invalid sequences become U+FFFD; an incomplete tail stays buffered.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            let (valid, error_len) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(e) => (e.valid_up_to(), e.error_len()),
            };

            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

            match error_len {
                Some(len) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid + len);
                }
                None => {
                    self.pending.drain(..valid);
                    break;
                }
            }
        }

        out
    }

    /// Bytes still waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End of input: drop any incomplete trailing sequence.
    /// Returns true when bytes were dropped.
    pub fn finish(&mut self) -> bool {
        let dropped = !self.pending.is_empty();
        self.pending.clear();
        dropped
    }
}

/// Consume a streaming body, feeding decoded text to `observer`.
///
/// Never fails itself; read errors go to `on_error`.
pub async fn handle_streaming_response<O>(response: Response, observer: &mut O)
where
    O: StreamObserver + ?Sized,
{
    let mut decoder = Utf8ChunkDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => {
                let text = decoder.decode(&bytes);
                if !text.is_empty() {
                    observer.on_chunk(&text);
                }
            }
            Err(e) => {
                observer.on_error(WorkflowError::Stream(e.to_string()));
                return;
            }
        }
    }

    if decoder.finish() {
        log::debug!("[workflow] Dropped incomplete UTF-8 sequence at end of stream");
    }
    observer.on_complete();
}
