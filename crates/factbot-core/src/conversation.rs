//! Few-shot conversation state owned by a classification stage
//!
//! A conversation starts with a fixed seed (system preamble followed by worked
//! examples) and then grows by one (user, assistant) pair per successful
//! classification. The seed is only ever removed by replacing the whole state
//! with a fresh one of the next generation.

use crate::types::{Exchange, Role};
use std::sync::Arc;

/// Ordered exchange log of one stage
#[derive(Debug, Clone)]
pub struct ConversationState {
    seed: Arc<[Exchange]>,
    exchanges: Vec<Exchange>,
    generation: u64,
}

impl ConversationState {
    /// Create the first generation from a seed.
    ///
    /// The seed normally begins with a system exchange; the remaining
    /// entries are worked examples.
    pub fn new(seed: Vec<Exchange>) -> Self {
        let seed: Arc<[Exchange]> = seed.into();
        Self {
            exchanges: seed.to_vec(),
            seed,
            generation: 0,
        }
    }

    /// Fresh state holding only the seed, one generation after this one
    pub fn next_generation(&self) -> Self {
        Self {
            seed: Arc::clone(&self.seed),
            exchanges: self.seed.to_vec(),
            generation: self.generation + 1,
        }
    }

    /// The seed exchanges (preamble and examples)
    pub fn seed(&self) -> &[Exchange] {
        &self.seed
    }

    /// All exchanges, seed first
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Number of live (user, assistant) pairs appended since the seed
    pub fn live_pairs(&self) -> usize {
        (self.exchanges.len() - self.seed.len()) / 2
    }

    /// Copy the current exchanges for use in a completion call
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            exchanges: self.exchanges.clone(),
            generation: self.generation,
        }
    }

    /// Append a live pair produced from a snapshot of `generation`.
    ///
    /// Returns `false` and leaves the state untouched when the snapshot
    /// belongs to an earlier generation.
    pub fn append_pair(
        &mut self,
        generation: u64,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.exchanges.reserve(2);
        self.exchanges.push(Exchange::user(user));
        self.exchanges.push(Exchange::assistant(assistant));
        true
    }
}

/// Point-in-time copy of a conversation, taken for a single call
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    exchanges: Vec<Exchange>,
    generation: u64,
}

impl ConversationSnapshot {
    /// Generation of the state the snapshot was taken from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Consume the snapshot, appending the user input as the final turn
    pub fn with_user_turn(mut self, text: impl Into<String>) -> Vec<Exchange> {
        self.exchanges.push(Exchange::new(Role::User, text));
        self.exchanges
    }
}
