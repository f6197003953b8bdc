//! Common imports for typical chat-session usage.
//!
//! This module intentionally exports the most frequently used session and
//! data types so examples and application code need fewer import lines.
pub use crate::{
    AbortHandle, AgentError, AgentService, ChatError, ChatSession, Message, MessageId, Notice,
    Role, StreamEvent, ThreadId, Transcript, TurnFailure,
};
