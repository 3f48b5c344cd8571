//! Authentication: observable sign-in state and the register/login/logout flows.

pub mod session;
pub mod store;

pub use session::AuthSession;
pub use store::{AuthState, AuthStore};
