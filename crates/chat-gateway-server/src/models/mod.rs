pub mod chat;

pub use chat::{AnswerPayload, Message, Role, SessionId};
