//! Reassembly of wire objects from arbitrarily chunked transport bytes
//!
//! The transport delivers one logical JSON stream as a sequence of byte
//! chunks whose boundaries carry no meaning: a single object may arrive
//! split across several chunks, and one chunk may carry several objects.
//! The buffer accumulates bytes and drains every complete leading object
//! on each push, retaining the incomplete tail for the next push.

use crate::types::WireObject;
use tracing::trace;

/// Accumulates transport bytes until complete JSON objects can be decoded.
///
/// Never fails on truncation: an incomplete tail is simply kept until more
/// bytes arrive. An empty object (`{}`) decodes successfully and is emitted
/// like any other; it is the assembler's job to recognize heartbeats.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    // Bytes, not a String: chunk boundaries may split UTF-8 code points.
    pending: Vec<u8>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk and drain every complete object now available.
    ///
    /// Returns the decoded objects in stream order; returns an empty vec
    /// when the buffered bytes do not yet form a complete object.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<WireObject> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.pending.extend_from_slice(chunk);

        let mut objects = Vec::new();
        let mut consumed = 0;

        let mut iter =
            serde_json::Deserializer::from_slice(&self.pending).into_iter::<WireObject>();
        loop {
            match iter.next() {
                Some(Ok(obj)) => {
                    objects.push(obj);
                    consumed = iter.byte_offset();
                }
                Some(Err(_)) | None => break,
            }
        }

        // Whatever did not decode stays buffered untouched; the next chunk
        // may complete it.
        if consumed > 0 {
            self.pending.drain(..consumed);
        }
        trace!(
            decoded = objects.len(),
            buffered = self.pending.len(),
            "chunk buffered"
        );
        objects
    }

    /// True if undecoded bytes remain buffered.
    pub fn has_pending(&self) -> bool {
        !self
            .pending
            .iter()
            .all(|b| b.is_ascii_whitespace())
    }
}
