//! Streaming chat core for the FlowSEO research assistant.
//!
//! The crate owns one real protocol problem: consuming an incrementally
//! delivered event stream from a remote agent (partial reads, blank-line
//! framing, event-type dispatch) and reconciling it into an ordered,
//! UI-safe conversation transcript. Everything around it (auth, billing,
//! rendering) stays outside.
//!
//! Concrete agent backends are namespaced under `vendors::*`.
//!
//! # Usage (LangGraph)
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use flowseo_chat::prelude::*;
//! use flowseo_chat::vendors::langgraph::LangGraphAgent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let agent = Arc::new(LangGraphAgent::from_env()?);
//! let mut session = ChatSession::new(agent);
//!
//! session
//!     .initialize_thread("conv-1", Message::system("How can I help with your SEO research?"))
//!     .await?;
//! session.send_message("keyword ideas for a bakery", false).await?;
//!
//! for message in session.transcript() {
//!     println!("{:?}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```

/// Agent service contract and thread identifiers.
pub mod agent;
/// Public error types used by the chat API.
pub mod errors;
/// Stream-event interpretation into turn effects.
pub mod event;
/// Common imports for typical usage.
pub mod prelude;
/// Per-conversation session controller and reactive state.
pub mod session;
/// Wire-format frame decoding and event parsing.
pub mod sse;
/// Message data model and transcript reconciliation.
pub mod transcript;
/// Concrete agent-backend integrations.
pub mod vendors;

pub use agent::{AgentByteStream, AgentService, ThreadId};
pub use errors::{AgentError, ChatError, TurnFailure};
pub use event::{StreamEvent, TurnEffect, interpret_event};
pub use session::{AbortHandle, ChatSession, Notice, ThreadCache};
pub use sse::{SseDecoder, parse_frame};
pub use transcript::{Message, MessageId, Role, Transcript};
