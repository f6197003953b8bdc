use std::fmt;
use std::pin::Pin;

use crate::errors::AgentError;

/// Opaque identifier for a remote conversation thread.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Creates a thread id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the thread id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Raw byte stream produced by a running turn, in the wire format consumed by
/// `SseDecoder`.
pub type AgentByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, AgentError>> + Send + 'static>>;

/// Contract for the remote conversational-agent backend.
///
/// `create_thread` is not idempotent; callers must reuse a recorded thread id
/// unless they deliberately want a fresh thread.
#[async_trait::async_trait]
pub trait AgentService: Send + Sync {
    /// Creates a new remote conversation thread.
    async fn create_thread(&self) -> Result<ThreadId, AgentError>;

    /// Starts a streaming run on `thread` with the user's input and returns
    /// the raw event byte stream.
    async fn stream_run(
        &self,
        thread: &ThreadId,
        user_input: &str,
    ) -> Result<AgentByteStream, AgentError>;
}
