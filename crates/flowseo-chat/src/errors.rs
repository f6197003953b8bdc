/// Errors returned by an `AgentService` implementation before they are
/// normalized for the chat session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The agent backend returned an application-level failure (HTTP status,
    /// auth, etc.).
    #[error("agent error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Agent response shape was invalid.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl AgentError {
    /// Creates a backend-level error.
    pub fn provider(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Provider {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message }
            | Self::Protocol { message } => message,
        }
    }
}

/// Terminal failure of an in-flight turn, surfaced into the transcript as an
/// error entry and through the notice channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum TurnFailure {
    /// The agent backend rejected or failed the turn.
    #[error("agent failure: {message}")]
    Agent { message: String },
    /// Network/stream transport failed mid-turn.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The session detected a protocol or invariant error.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The turn was cancelled by the caller.
    #[error("turn cancelled")]
    Cancelled,
}

/// Top-level error type for the public chat session API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client/session configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input.
    #[error("validation error: {0}")]
    Validation(String),
    /// No remote thread exists yet; sends are rejected until one does.
    #[error("chat session not initialized")]
    NotInitialized,
    /// The injected message-quota gate rejected the send.
    #[error("message limit reached")]
    LimitReached,
    /// Agent service error outside an in-flight turn.
    #[error(transparent)]
    Agent(AgentError),
    /// Terminal failure of a started turn.
    #[error(transparent)]
    TurnFailed(TurnFailure),
}

impl From<AgentError> for ChatError {
    fn from(value: AgentError) -> Self {
        ChatError::Agent(value)
    }
}

impl From<TurnFailure> for ChatError {
    fn from(value: TurnFailure) -> Self {
        ChatError::TurnFailed(value)
    }
}

pub(crate) fn turn_failure_from_agent_error(err: &AgentError) -> TurnFailure {
    match err {
        AgentError::Provider { message, .. } => TurnFailure::Agent {
            message: message.clone(),
        },
        AgentError::Transport { message } => TurnFailure::Transport {
            message: message.clone(),
        },
        AgentError::Protocol { message } => TurnFailure::Protocol {
            message: message.clone(),
        },
    }
}
