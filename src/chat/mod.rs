//! Chat orchestration: sending messages, keeping the conversation list in sync,
//! and the client facade tying both to the shared state.

pub mod client;
pub mod orchestrator;
pub mod synchronizer;
pub mod title;

pub use client::ChatClient;
pub use orchestrator::{Delivery, MessageSendOrchestrator, SendFailure, SendOutcome};
pub use synchronizer::{ConversationListSynchronizer, DeleteOutcome, LoadOutcome, RefreshOutcome};
pub use title::derive_title;
