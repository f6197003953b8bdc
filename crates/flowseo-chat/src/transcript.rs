use chrono::{DateTime, Utc};
use tracing::warn;

/// Stable, never-reused identifier for a transcript message.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MessageId(pub uuid::Uuid);

impl MessageId {
    /// Creates a fresh random message id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single transcript entry.
///
/// `id`, `role`, and `timestamp` are fixed at creation; only `content` and
/// `is_error` may change afterwards, and only for the turn's open assistant
/// message (or its error-path overwrite).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    /// Creates a message with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    /// Creates an immutable user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates the empty assistant placeholder that a streaming turn fills in.
    pub fn assistant_placeholder() -> Self {
        Self::new(Role::Assistant, "")
    }

    /// Creates a system message (for example a conversation's seed/welcome
    /// message).
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Ordered conversation transcript. Insertion order is display order;
/// append-only apart from the reconciler's replace-by-id operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all entries and starts over from a single seed message.
    pub fn reset(&mut self, seed: Message) {
        self.messages.clear();
        self.messages.push(seed);
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the ordered entries.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Looks up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Replaces the content of the message with the given id, preserving its
    /// position, id, role, and timestamp.
    ///
    /// Snapshots are authoritative and cumulative, so this is a full
    /// replacement and idempotent by construction. A missing id is logged and
    /// the update dropped (never queued): a later snapshot supersedes anyway.
    /// Returns whether the target was found.
    pub fn replace_content(&mut self, id: &MessageId, content: &str) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                message.content.clear();
                message.content.push_str(content);
                true
            }
            None => {
                warn!(%id, "assistant message placeholder not found; dropping content update");
                false
            }
        }
    }

    /// Converts the message with the given id into a terminal error entry, or
    /// appends a fresh assistant error message if the placeholder is gone.
    pub fn mark_error(&mut self, id: &MessageId, content: impl Into<String>) {
        let content = content.into();
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                message.content = content;
                message.is_error = true;
            }
            None => {
                warn!(%id, "error target not found; appending a new error message");
                let mut message = Message::new(Role::Assistant, content);
                message.is_error = true;
                self.messages.push(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript_with_placeholder() -> (Transcript, MessageId) {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("question"));
        let placeholder = Message::assistant_placeholder();
        let id = placeholder.id.clone();
        transcript.push(placeholder);
        (transcript, id)
    }

    #[test]
    fn replace_content_preserves_identity_and_order() {
        let (mut transcript, id) = transcript_with_placeholder();
        let before = transcript.get(&id).cloned().expect("placeholder");

        assert!(transcript.replace_content(&id, "answer"));

        let after = transcript.get(&id).expect("placeholder still present");
        assert_eq!(after.id, before.id);
        assert_eq!(after.role, before.role);
        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.content, "answer");
        assert!(!after.is_error);
        assert_eq!(transcript.messages()[1].id, id);
    }

    #[test]
    fn replace_content_is_idempotent() {
        let (mut transcript, id) = transcript_with_placeholder();
        transcript.replace_content(&id, "same");
        let once = transcript.clone();
        transcript.replace_content(&id, "same");
        assert_eq!(transcript, once);
    }

    #[test]
    fn shorter_snapshot_overwrites_longer_intermediate() {
        let (mut transcript, id) = transcript_with_placeholder();
        transcript.replace_content(&id, "a long intermediate answer");
        transcript.replace_content(&id, "short");
        assert_eq!(transcript.get(&id).unwrap().content, "short");
    }

    #[test]
    fn replace_content_on_missing_id_leaves_transcript_unchanged() {
        let (mut transcript, _) = transcript_with_placeholder();
        let before = transcript.clone();
        assert!(!transcript.replace_content(&MessageId::new(), "ignored"));
        assert_eq!(transcript, before);
    }

    #[test]
    fn mark_error_overwrites_placeholder_in_place() {
        let (mut transcript, id) = transcript_with_placeholder();
        transcript.mark_error(&id, "Error: it broke");
        let entry = transcript.get(&id).expect("placeholder");
        assert!(entry.is_error);
        assert_eq!(entry.content, "Error: it broke");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn mark_error_appends_when_placeholder_is_gone() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("question"));
        transcript.mark_error(&MessageId::new(), "Error: it broke");
        assert_eq!(transcript.len(), 2);
        let last = transcript.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.role, Role::Assistant);
    }

    #[test]
    fn reset_replaces_everything_with_the_seed() {
        let (mut transcript, _) = transcript_with_placeholder();
        transcript.reset(Message::system("welcome"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].content, "welcome");
    }
}
