use std::time::Duration;

use crate::errors::ChatError;

const DEFAULT_ASSISTANT_ID: &str = "agent";

/// Configuration for the LangGraph agent client.
#[derive(Clone, Debug)]
pub struct LangGraphConfig {
    /// API key sent as the `X-Api-Key` header.
    pub api_key: String,
    /// Base URL of the LangGraph deployment.
    pub base_url: String,
    /// Assistant to run on each turn.
    pub assistant_id: String,
    /// Default HTTP timeout for non-streaming requests.
    pub timeout: Duration,
}

impl LangGraphConfig {
    /// Creates a config with the given credentials and deployment URL.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `LANGGRAPH_API_KEY` and `LANGGRAPH_BASE_URL`,
    /// with an optional `LANGGRAPH_ASSISTANT_ID` override.
    pub fn from_env() -> Result<Self, ChatError> {
        let api_key = std::env::var("LANGGRAPH_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ChatError::Config(
                "missing LANGGRAPH_API_KEY for LangGraph agent".into(),
            ));
        }
        let base_url = std::env::var("LANGGRAPH_BASE_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ChatError::Config(
                "missing LANGGRAPH_BASE_URL for LangGraph agent".into(),
            ));
        }
        let mut config = Self::new(api_key, base_url);
        if let Ok(assistant_id) = std::env::var("LANGGRAPH_ASSISTANT_ID")
            && !assistant_id.trim().is_empty()
        {
            config.assistant_id = assistant_id;
        }
        Ok(config)
    }

    /// Overrides the assistant id (defaults to `agent`).
    pub fn assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = assistant_id.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn threads_url(&self) -> String {
        format!("{}/threads", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn runs_stream_url(&self, thread_id: &str) -> String {
        format!(
            "{}/threads/{}/runs/stream",
            self.base_url.trim_end_matches('/'),
            thread_id
        )
    }

    pub(crate) fn history_url(&self, thread_id: &str) -> String {
        format!(
            "{}/threads/{}/history",
            self.base_url.trim_end_matches('/'),
            thread_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_tolerate_trailing_slash_in_base() {
        let config = LangGraphConfig::new("key", "https://example.test/");
        assert_eq!(config.threads_url(), "https://example.test/threads");
        assert_eq!(
            config.runs_stream_url("t-1"),
            "https://example.test/threads/t-1/runs/stream"
        );
        assert_eq!(
            config.history_url("t-1"),
            "https://example.test/threads/t-1/history"
        );
    }

    #[test]
    fn assistant_id_defaults_to_agent() {
        let config = LangGraphConfig::new("key", "https://example.test");
        assert_eq!(config.assistant_id, "agent");
    }
}
