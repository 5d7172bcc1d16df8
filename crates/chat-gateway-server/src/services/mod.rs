pub mod cache;
pub mod engine;
pub mod orchestrator;
pub mod session;

pub use cache::ResponseCache;
pub use engine::{AnsweringEngine, HttpAnsweringEngine};
pub use orchestrator::{ChatOrchestrator, WarmupReport};
pub use session::SessionStore;
