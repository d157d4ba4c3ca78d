//! Conversation stream orchestration
//!
//! Drives one request from raw transport chunks to a terminal turn state:
//! pull chunk, reassemble wire objects, fold them into the turn, notify the
//! caller, and on termination resolve citations against the assembled
//! answer. Failures are classified into the closed [`StreamError`] set;
//! cancellation is a normal terminal phase, not an error.

use crate::assembler::{DeltaAssembler, TurnState};
use crate::buffer::ChunkBuffer;
use crate::cancellation::CancellationToken;
use crate::citations::CitationResolver;
use crate::types::StreamError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Response;
use tracing::{debug, warn};

/// Callback invoked after every successfully assembled wire object so the
/// caller can render in-place progress.
pub type DeltaCallback = Box<dyn Fn(&TurnState) -> Result<()> + Send + Sync>;

/// Pull-based source of transport chunks (live HTTP response or scripted
/// replay), so both run through identical processing.
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk, `Ok(None)` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Live HTTP response chunk stream.
pub struct HttpChunkStream {
    response: Response,
}

impl HttpChunkStream {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("HTTP chunk error: {}", e)),
        }
    }
}

/// Scripted chunk stream for fixtures and tests. Yields the given chunks in
/// order, then either end-of-stream or a scripted transport failure.
pub struct ReplayChunkStream {
    chunks: Vec<Vec<u8>>,
    current_index: usize,
    trailing_error: Option<String>,
}

impl ReplayChunkStream {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            current_index: 0,
            trailing_error: None,
        }
    }

    /// End the replay with a transport failure instead of a clean close.
    pub fn failing_with(mut self, error: impl Into<String>) -> Self {
        self.trailing_error = Some(error.into());
        self
    }
}

#[async_trait]
impl ChunkStream for ReplayChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.current_index < self.chunks.len() {
            let chunk = self.chunks[self.current_index].clone();
            self.current_index += 1;
            return Ok(Some(chunk));
        }
        match self.trailing_error.take() {
            Some(error) => Err(anyhow::anyhow!(error)),
            None => Ok(None),
        }
    }
}

/// Lifecycle of a conversation stream. Transitions only move forward:
/// `Idle → Reading ↔ Assembling → Done | Cancelled | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    Reading,
    Assembling,
    Done,
    Cancelled,
    Failed,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamPhase::Done | StreamPhase::Cancelled | StreamPhase::Failed
        )
    }
}

/// Orchestrates buffer and assembler across the lifetime of one request.
///
/// One instance serves one request; the phase is queryable afterwards to
/// distinguish a completed stream from a cancelled one, since both return
/// `Ok` with whatever content was assembled.
pub struct ConversationStream {
    buffer: ChunkBuffer,
    assembler: DeltaAssembler,
    resolver: CitationResolver,
    phase: StreamPhase,
}

impl Default for ConversationStream {
    fn default() -> Self {
        Self::new(CitationResolver::new())
    }
}

impl ConversationStream {
    pub fn new(resolver: CitationResolver) -> Self {
        Self {
            buffer: ChunkBuffer::new(),
            assembler: DeltaAssembler::new(),
            resolver,
            phase: StreamPhase::Idle,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Consume `source` until end-of-stream, cancellation, or a terminal
    /// failure.
    ///
    /// `on_delta` fires after each chunk that advanced the turn. On a clean
    /// end and on cancellation the assembled answer is passed through the
    /// citation resolver and the turn is returned; content gathered before
    /// a cancellation is never rolled back. Any other outcome returns the
    /// classified error, with the detail logged rather than exposed.
    pub async fn run(
        &mut self,
        source: &mut dyn ChunkStream,
        token: &CancellationToken,
        on_delta: Option<&DeltaCallback>,
    ) -> Result<TurnState, StreamError> {
        let mut turn = TurnState::new();
        self.phase = StreamPhase::Reading;

        loop {
            if token.is_triggered() {
                debug!("cancellation observed before read");
                return Ok(self.finish(turn, StreamPhase::Cancelled));
            }

            match source.next_chunk().await {
                Ok(Some(chunk)) => {
                    self.phase = StreamPhase::Assembling;
                    // The callback fires once per decoded object, not once
                    // per transport chunk: a chunk carrying several objects
                    // must surface every intermediate turn state.
                    for obj in self.buffer.push(&chunk) {
                        if let Err(err) = self.assembler.apply(&obj, &mut turn) {
                            return Err(self.fail(err));
                        }
                        if obj.is_heartbeat() {
                            continue;
                        }
                        if let Some(callback) = on_delta {
                            if let Err(err) = callback(&turn) {
                                return Err(self.fail(StreamError::Transport(format!(
                                    "delta callback failed: {err}"
                                ))));
                            }
                        }
                    }
                    self.phase = StreamPhase::Reading;
                }
                Ok(None) => break,
                Err(err) => {
                    // A read torn down by cancellation is not a failure.
                    if token.is_triggered() {
                        debug!("read aborted by cancellation: {err}");
                        return Ok(self.finish(turn, StreamPhase::Cancelled));
                    }
                    return Err(self.fail(StreamError::Transport(err.to_string())));
                }
            }
        }

        if self.buffer.has_pending() {
            return Err(self.fail(StreamError::Transport(
                "stream ended with an incomplete object buffered".to_string(),
            )));
        }
        if turn.assistant.is_none() && turn.tool.is_none() {
            return Err(self.fail(StreamError::ContentAbsence));
        }

        Ok(self.finish(turn, StreamPhase::Done))
    }

    /// Resolve citations against the assembled answer and seal the turn.
    fn finish(&mut self, mut turn: TurnState, phase: StreamPhase) -> TurnState {
        let citations = turn
            .tool_content()
            .map(|content| content.citations)
            .unwrap_or_default();
        let resolved = self.resolver.resolve(&turn.assistant_content, &citations);
        if let Some(assistant) = turn.assistant.as_mut() {
            assistant.content = resolved.text.clone();
        }
        turn.resolved = Some(resolved);
        self.phase = phase;
        turn
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        warn!("stream failed: {err}");
        self.phase = StreamPhase::Failed;
        err
    }
}
