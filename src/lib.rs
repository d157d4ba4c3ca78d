//! Streaming ingestion and citation resolution for chat conversations
//!
//! This crate implements:
//! - Reassembly of JSON wire objects from arbitrarily chunked transport
//!   bytes via [`ChunkBuffer`]
//! - Folding of partial delta messages into one logical assistant turn via
//!   [`DeltaAssembler`]
//! - Rewriting of inline `[doc<id>]` citation tokens into a stable,
//!   de-duplicated reference list via [`CitationResolver`]
//! - A per-request orchestration loop with explicit phases and a closed
//!   error taxonomy via [`ConversationStream`]
//! - Cooperative cancellation with at most one live stream per governed
//!   scope via [`CancellationGate`]
//! - Conversation thread ownership at the presentation boundary via
//!   [`ConversationStateManager`]


pub mod assembler;
pub mod buffer;
pub mod cancellation;
pub mod citations;
pub mod conversations;
pub mod stream;
pub mod types;

pub use assembler::{DeltaAssembler, TurnState};
pub use buffer::ChunkBuffer;
pub use cancellation::{CancellationGate, CancellationToken, GateScope};
pub use citations::{CitationResolver, ResolvedAnswer};
pub use conversations::ConversationStateManager;
pub use stream::{
    ChunkStream, ConversationStream, DeltaCallback, HttpChunkStream, ReplayChunkStream,
    StreamPhase,
};
pub use types::*;
