//! Per-session conversation memory
//!
//! Sessions are created lazily, appended to on every exchange and removed
//! only by an explicit reset.

mod store;
pub mod types;

pub use store::SessionStore;
pub use types::Session;
