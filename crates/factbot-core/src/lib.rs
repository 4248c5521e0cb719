//! FactBot Core
//!
//! Core types, traits, and utilities shared across FactBot components.
//!
//! This crate provides:
//! - Conversation types (`Exchange`, `Role`) and the per-stage `ConversationState`
//! - Message types flowing from the chat gateway into the pipeline
//! - The `Verdict` produced by each classification stage
//! - Error types and result handling
//! - Collaborator traits for the completion backend and the chat gateway

pub mod completion;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod types;
pub mod verdict;

pub use completion::{CompletionClient, CompletionRequest};
pub use conversation::{ConversationSnapshot, ConversationState};
pub use error::{Error, Result};
pub use gateway::ChatGateway;
pub use types::{Exchange, InboundMessage, PendingMessage, Role};
pub use verdict::{Verdict, VerdictTag};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::completion::{CompletionClient, CompletionRequest};
    pub use crate::error::{Error, Result};
    pub use crate::gateway::ChatGateway;
    pub use crate::types::{Exchange, PendingMessage, Role};
    pub use crate::verdict::{Verdict, VerdictTag};
}
