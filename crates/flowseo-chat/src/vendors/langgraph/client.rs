use futures::StreamExt as _;
use tracing::debug;

use crate::agent::{AgentByteStream, AgentService, ThreadId};
use crate::errors::{AgentError, ChatError};

use super::config::LangGraphConfig;

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(serde::Deserialize)]
struct CreateThreadResponse {
    #[serde(default)]
    thread_id: String,
}

/// Agent service backed by a LangGraph deployment's threads/runs API.
pub struct LangGraphAgent {
    client: reqwest::Client,
    config: LangGraphConfig,
}

impl LangGraphAgent {
    /// Creates an agent client from explicit configuration.
    pub fn new(config: LangGraphConfig) -> Result<Self, ChatError> {
        if config.api_key.trim().is_empty() {
            return Err(ChatError::Config(
                "LangGraph config api_key must not be empty".into(),
            ));
        }
        if config.base_url.trim().is_empty() {
            return Err(ChatError::Config(
                "LangGraph config base_url must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build LangGraph client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates an agent client from `LANGGRAPH_*` environment variables.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(LangGraphConfig::from_env()?)
    }

    /// Fetches the raw history of a thread.
    ///
    /// Not consumed by `ChatSession` (the transcript is rebuilt client-side);
    /// exposed for callers that want to restore past conversations.
    pub async fn thread_history(
        &self,
        thread: &ThreadId,
    ) -> Result<serde_json::Value, AgentError> {
        let response = self
            .client
            .get(self.config.history_url(thread.as_str()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::transport(format!("LangGraph history request failed: {e}")))?;
        let response = check_status(response, "history").await?;
        response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("invalid LangGraph history body: {e}")))
    }
}

#[async_trait::async_trait]
impl AgentService for LangGraphAgent {
    async fn create_thread(&self) -> Result<ThreadId, AgentError> {
        debug!("creating LangGraph thread");
        let response = self
            .client
            .post(self.config.threads_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AgentError::transport(format!("LangGraph thread request failed: {e}")))?;
        let response = check_status(response, "create thread").await?;

        let body: CreateThreadResponse = response
            .json()
            .await
            .map_err(|e| AgentError::protocol(format!("invalid create-thread body: {e}")))?;
        if body.thread_id.trim().is_empty() {
            return Err(AgentError::protocol(
                "create-thread response carried no thread_id",
            ));
        }
        Ok(ThreadId::new(body.thread_id))
    }

    async fn stream_run(
        &self,
        thread: &ThreadId,
        user_input: &str,
    ) -> Result<AgentByteStream, AgentError> {
        debug!(%thread, assistant_id = %self.config.assistant_id, "starting LangGraph run stream");
        let body = build_run_body(&self.config.assistant_id, user_input);
        let response = self
            .client
            .post(self.config.runs_stream_url(thread.as_str()))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::transport(format!("LangGraph run request failed: {e}")))?;
        let response = check_status(response, "run stream").await?;

        let stream = response
            .bytes_stream()
            .map(|item| {
                item.map_err(|e| {
                    AgentError::transport(format!("LangGraph streaming read failed: {e}"))
                })
            });
        Ok(Box::pin(stream))
    }
}

async fn check_status(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(AgentError::provider(
        format!("LangGraph {operation} failed with status {status}: {body}"),
        Some(status.as_u16()),
    ))
}

pub(crate) fn build_run_body(assistant_id: &str, user_input: &str) -> serde_json::Value {
    serde_json::json!({
        "input": {
            "messages": [
                { "role": "user", "content": user_input }
            ]
        },
        "assistant_id": assistant_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_body_wraps_input_as_a_user_message() {
        let body = build_run_body("agent", "best keywords for bakeries");
        assert_eq!(body["assistant_id"], "agent");
        let message = &body["input"]["messages"][0];
        assert_eq!(message["role"], "user");
        assert_eq!(message["content"], "best keywords for bakeries");
    }

    #[test]
    fn new_rejects_blank_credentials() {
        let err = LangGraphAgent::new(LangGraphConfig::new("  ", "https://example.test"));
        assert!(matches!(err, Err(ChatError::Config(_))));
        let err = LangGraphAgent::new(LangGraphConfig::new("key", ""));
        assert!(matches!(err, Err(ChatError::Config(_))));
    }

    #[tokio::test]
    async fn env_gated_smoke_create_thread_if_configured() {
        if LangGraphConfig::from_env().is_err() {
            eprintln!("skipping LangGraph smoke test (LANGGRAPH_* env missing)");
            return;
        }
        let agent = LangGraphAgent::from_env().expect("agent");
        let thread = agent.create_thread().await;
        assert!(thread.is_ok(), "LangGraph smoke failed: {thread:?}");
    }
}
