use tracing::warn;

use crate::transcript::MessageId;

/// One typed event decoded from the agent's wire stream.
///
/// Unrecognized kinds are tolerated so the backend can introduce new event
/// kinds without breaking this client.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamEvent {
    /// Event kind as sent on the wire (for example `metadata` or `values`).
    pub kind: String,
    /// Parsed JSON payload.
    pub payload: serde_json::Value,
}

/// Effect of one stream event on the visible conversation.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnEffect {
    /// A `metadata` event arrived: the assistant is working.
    TypingStarted,
    /// A `values` snapshot carried new authoritative content for the open
    /// assistant message. Full replacement, never an append: snapshots are
    /// cumulative, a later one always supersedes.
    AssistantContent {
        target: MessageId,
        content: String,
    },
}

/// Maps a stream event to its effect on the current turn, if any.
///
/// `target` is the id of the turn's open assistant placeholder. A `values`
/// event arriving without one is logged and dropped; a later snapshot
/// naturally supersedes, so nothing is queued.
pub fn interpret_event(event: &StreamEvent, target: Option<&MessageId>) -> Option<TurnEffect> {
    match event.kind.as_str() {
        "metadata" => Some(TurnEffect::TypingStarted),
        "values" => {
            let Some(content) = latest_assistant_content(&event.payload) else {
                return None;
            };
            match target {
                Some(target) => Some(TurnEffect::AssistantContent {
                    target: target.clone(),
                    content,
                }),
                None => {
                    warn!("received a values event but no assistant message is open");
                    None
                }
            }
        }
        other => {
            warn!(kind = %other, "unhandled stream event kind");
            None
        }
    }
}

/// Pulls the last assistant entry out of a `values` conversation snapshot.
fn latest_assistant_content(payload: &serde_json::Value) -> Option<String> {
    let messages = payload.get("messages")?.as_array()?;
    let latest = messages
        .iter()
        .rev()
        .find(|entry| entry.get("type").and_then(|v| v.as_str()) == Some("ai"))?;
    Some(
        latest
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    )
}
