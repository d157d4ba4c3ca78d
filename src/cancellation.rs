//! Cooperative cancellation for in-flight conversation streams
//!
//! A token is a shared flag observed by the stream loop at its suspension
//! points; the gate is a registry guaranteeing at most one live stream per
//! governed scope by triggering any superseded token before issuing a new
//! one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Shared cancellation flag. Cloning yields a handle to the same flag.
///
/// Triggering is idempotent and remains a safe no-op after the governed
/// stream has completed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Which tokens [`CancellationGate::replace`] supersedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateScope {
    /// Replace only the token previously issued for the same conversation.
    #[default]
    PerConversation,
    /// Replace every live token, regardless of conversation.
    Global,
}

/// Registry of live cancellation tokens keyed by conversation id.
#[derive(Debug, Default)]
pub struct CancellationGate {
    scope: GateScope,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl CancellationGate {
    pub fn new(scope: GateScope) -> Self {
        Self {
            scope,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for `conversation_id`, triggering whatever it
    /// supersedes under the configured scope. This is the only way a stream
    /// obtains its token, which is what enforces "at most one live stream"
    /// by construction.
    pub fn replace(&self, conversation_id: &str) -> CancellationToken {
        let mut tokens = self.tokens.lock().unwrap();
        match self.scope {
            GateScope::PerConversation => {
                if let Some(previous) = tokens.remove(conversation_id) {
                    debug!(conversation_id, "superseding previous stream");
                    previous.trigger();
                }
            }
            GateScope::Global => {
                for (_, previous) in tokens.drain() {
                    previous.trigger();
                }
            }
        }

        let token = CancellationToken::new();
        tokens.insert(conversation_id.to_string(), token.clone());
        token
    }

    /// Trigger every live token. Bound to the user-facing stop action.
    pub fn stop(&self) {
        let mut tokens = self.tokens.lock().unwrap();
        for (_, token) in tokens.drain() {
            token.trigger();
        }
    }

    /// Drop the registry entry once its stream has terminated. Triggering
    /// an already-released token elsewhere stays a no-op.
    pub fn release(&self, conversation_id: &str) {
        self.tokens.lock().unwrap().remove(conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_triggers_previous_token_for_same_conversation() {
        let gate = CancellationGate::new(GateScope::PerConversation);
        let first = gate.replace("conv-1");
        assert!(!first.is_triggered());

        let second = gate.replace("conv-1");
        assert!(first.is_triggered());
        assert!(!second.is_triggered());
    }

    #[test]
    fn per_conversation_scope_leaves_other_conversations_running() {
        let gate = CancellationGate::new(GateScope::PerConversation);
        let one = gate.replace("conv-1");
        let two = gate.replace("conv-2");

        gate.replace("conv-1");
        assert!(one.is_triggered());
        assert!(!two.is_triggered());
    }

    #[test]
    fn global_scope_supersedes_all_live_tokens() {
        let gate = CancellationGate::new(GateScope::Global);
        let one = gate.replace("conv-1");
        let two = gate.replace("conv-2");
        assert!(one.is_triggered());

        let three = gate.replace("conv-3");
        assert!(two.is_triggered());
        assert!(!three.is_triggered());
    }

    #[test]
    fn stop_triggers_everything() {
        let gate = CancellationGate::new(GateScope::PerConversation);
        let one = gate.replace("conv-1");
        let two = gate.replace("conv-2");

        gate.stop();
        assert!(one.is_triggered());
        assert!(two.is_triggered());
    }

    #[test]
    fn trigger_after_release_is_a_no_op() {
        let gate = CancellationGate::new(GateScope::PerConversation);
        let token = gate.replace("conv-1");
        gate.release("conv-1");

        // The stream is gone; triggering must not panic or affect new tokens.
        token.trigger();
        let fresh = gate.replace("conv-1");
        assert!(!fresh.is_triggered());
    }
}
