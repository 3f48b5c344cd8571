//! Session state: known conversations, the active conversation and the UI flags.

pub mod state;
pub mod store;

pub use state::SessionState;
pub use store::SessionStore;
