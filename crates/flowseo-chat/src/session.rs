use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::agent::{AgentService, ThreadId};
use crate::errors::{ChatError, TurnFailure, turn_failure_from_agent_error};
use crate::event::{TurnEffect, interpret_event};
use crate::sse::{SseDecoder, parse_frame};
use crate::transcript::{Message, MessageId, Role, Transcript};

const NOTICE_BUFFER: usize = 16;
const DEFAULT_THREAD_CACHE_CAPACITY: usize = 64;

/// Non-blocking user-facing notification (the toast equivalent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Handle used to request cancellation of the turn currently in flight.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and takes the error path: the open
    /// placeholder becomes a terminal error entry and the session returns to
    /// ready.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Bounded map from conversation id to the remote thread it already owns.
///
/// Reopening a conversation reuses its thread instead of creating a fresh one.
/// When full, the oldest entry is evicted.
pub struct ThreadCache {
    capacity: usize,
    entries: HashMap<String, ThreadId>,
    order: VecDeque<String>,
}

impl ThreadCache {
    /// Creates a cache holding at most `capacity` conversations (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns the cached thread for a conversation, if any.
    pub fn get(&self, conversation_id: &str) -> Option<ThreadId> {
        self.entries.get(conversation_id).cloned()
    }

    /// Records the thread owned by a conversation, evicting the oldest entry
    /// when the cache is full.
    pub fn insert(&mut self, conversation_id: &str, thread: ThreadId) {
        if self.entries.insert(conversation_id.to_string(), thread).is_some() {
            return;
        }
        self.order.push_back(conversation_id.to_string());
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            debug!(conversation_id = %oldest, "evicting oldest cached thread");
            self.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ThreadCache {
    fn default() -> Self {
        Self::new(DEFAULT_THREAD_CACHE_CAPACITY)
    }
}

/// Per-conversation chat session: owns the transcript, the remote thread
/// binding, and all turn state.
///
/// Each session is an independent value with no shared mutable state, so any
/// number of conversations may have turns in flight concurrently. Within one
/// session at most one turn is in flight: `send_message` takes `&mut self`,
/// so a second concurrent send is a compile error rather than a queued or
/// interleaved turn.
pub struct ChatSession {
    agent: Arc<dyn AgentService>,
    thread_cache: ThreadCache,
    thread_id: Option<ThreadId>,
    conversation_id: Option<String>,
    transcript: Transcript,
    current_assistant_id: Option<MessageId>,
    decoder: SseDecoder,
    sent_count: u64,
    messages_tx: watch::Sender<Vec<Message>>,
    typing_tx: watch::Sender<bool>,
    loading_tx: watch::Sender<bool>,
    notices_tx: mpsc::Sender<Notice>,
    notices_rx: Option<mpsc::Receiver<Notice>>,
    abort_tx: watch::Sender<bool>,
}

impl ChatSession {
    /// Creates a session backed by the given agent service.
    pub fn new(agent: Arc<dyn AgentService>) -> Self {
        let (messages_tx, _) = watch::channel(Vec::new());
        let (typing_tx, _) = watch::channel(false);
        let (loading_tx, _) = watch::channel(false);
        let (notices_tx, notices_rx) = mpsc::channel(NOTICE_BUFFER);
        let (abort_tx, _) = watch::channel(false);
        Self {
            agent,
            thread_cache: ThreadCache::default(),
            thread_id: None,
            conversation_id: None,
            transcript: Transcript::new(),
            current_assistant_id: None,
            decoder: SseDecoder::default(),
            sent_count: 0,
            messages_tx,
            typing_tx,
            loading_tx,
            notices_tx,
            notices_rx: Some(notices_rx),
            abort_tx,
        }
    }

    /// Observable ordered transcript.
    pub fn messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages_tx.subscribe()
    }

    /// Observable typing indicator.
    pub fn is_typing(&self) -> watch::Receiver<bool> {
        self.typing_tx.subscribe()
    }

    /// Observable busy flag (true during thread initialization and for the
    /// whole of an in-flight turn).
    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    /// Takes the notice receiver. Returns `None` after the first call.
    pub fn take_notices(&mut self) -> Option<mpsc::Receiver<Notice>> {
        self.notices_rx.take()
    }

    /// Returns a handle that cancels the turn currently in flight.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Returns the bound remote thread, if one exists.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    /// Returns the conversation this session is bound to, if initialized.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Current transcript entries.
    pub fn transcript(&self) -> &[Message] {
        self.transcript.messages()
    }

    /// Number of sends accepted by this session (for the caller's quota
    /// accounting).
    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    /// Binds the session to a conversation and makes sure it has a remote
    /// thread, reusing a cached one when the conversation was opened before.
    ///
    /// The transcript is reset to `seed` (the welcome message) either way.
    /// On thread-creation failure the error is returned but the session stays
    /// usable: sends are rejected with [`ChatError::NotInitialized`] until a
    /// later `initialize_thread` succeeds.
    pub async fn initialize_thread(
        &mut self,
        conversation_id: &str,
        seed: Message,
    ) -> Result<(), ChatError> {
        self.set_loading(true);
        debug!(%conversation_id, "initializing chat thread");
        self.conversation_id = Some(conversation_id.to_string());

        let result = match self.thread_cache.get(conversation_id) {
            Some(thread) => {
                debug!(%thread, "reusing cached thread");
                self.thread_id = Some(thread);
                Ok(())
            }
            None => match self.agent.create_thread().await {
                Ok(thread) => {
                    debug!(%thread, "created new thread");
                    self.thread_cache.insert(conversation_id, thread.clone());
                    self.thread_id = Some(thread);
                    Ok(())
                }
                Err(err) => {
                    warn!(error = %err, "failed to initialize chat thread");
                    self.thread_id = None;
                    self.notify(Notice::new(
                        "Error",
                        "Failed to initialize chat session. Please refresh.",
                    ));
                    Err(ChatError::Agent(err))
                }
            },
        };

        self.transcript.reset(seed);
        self.publish_messages();
        self.set_loading(false);
        result
    }

    /// Runs one full user turn: appends the user message, opens an assistant
    /// placeholder, streams the agent's response into it, and finalizes.
    ///
    /// Preflight rejections (`limit_reached`, no thread, empty input) return
    /// `Err` and leave all state untouched. Once the turn has started, any
    /// failure resolves `Ok(())`: the placeholder is converted into a visible
    /// error entry, a notice is pushed, and the session returns to ready so
    /// the user can resend.
    pub async fn send_message(
        &mut self,
        content: &str,
        limit_reached: bool,
    ) -> Result<(), ChatError> {
        if limit_reached {
            self.notify(Notice::new(
                "Message limit reached",
                "You've reached your plan's message limit. Please upgrade to continue.",
            ));
            return Err(ChatError::LimitReached);
        }
        let Some(thread) = self.thread_id.clone() else {
            self.notify(Notice::new(
                "Error",
                "Chat session not initialized. Please wait or refresh.",
            ));
            return Err(ChatError::NotInitialized);
        };
        if content.trim().is_empty() {
            return Err(ChatError::Validation(
                "message content must not be empty".into(),
            ));
        }

        self.transcript.push(Message::user(content));
        self.sent_count += 1;
        self.set_loading(true);

        let placeholder = Message::assistant_placeholder();
        self.current_assistant_id = Some(placeholder.id.clone());
        self.transcript.push(placeholder);
        self.publish_messages();

        self.decoder.reset();
        self.abort_tx.send_replace(false);
        let mut abort_rx = self.abort_tx.subscribe();

        let mut stream = match self.agent.stream_run(&thread, content).await {
            Ok(stream) => stream,
            Err(err) => {
                self.fail_turn(turn_failure_from_agent_error(&err));
                return Ok(());
            }
        };

        loop {
            tokio::select! {
                changed = abort_rx.changed() => {
                    if changed.is_ok() && *abort_rx.borrow() {
                        debug!("turn aborted by caller");
                        self.fail_turn(TurnFailure::Cancelled);
                        return Ok(());
                    }
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(chunk)) => self.ingest_chunk(&chunk),
                        Some(Err(err)) => {
                            self.fail_turn(turn_failure_from_agent_error(&err));
                            return Ok(());
                        }
                        None => {
                            self.finish_turn();
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn ingest_chunk(&mut self, chunk: &[u8]) {
        for frame in self.decoder.push_chunk(chunk) {
            self.apply_frame(&frame);
        }
    }

    fn apply_frame(&mut self, frame: &str) {
        for event in parse_frame(frame) {
            match interpret_event(&event, self.current_assistant_id.as_ref()) {
                Some(TurnEffect::TypingStarted) => self.set_typing(true),
                Some(TurnEffect::AssistantContent { target, content }) => {
                    self.transcript.replace_content(&target, &content);
                    self.publish_messages();
                }
                None => {}
            }
        }
    }

    fn finish_turn(&mut self) {
        for frame in self.decoder.finish() {
            self.apply_frame(&frame);
        }
        self.set_typing(false);
        self.current_assistant_id = None;
        self.set_loading(false);
        debug!("turn stream ended; buffer flushed, typing stopped");
    }

    fn fail_turn(&mut self, failure: TurnFailure) {
        self.decoder.reset();
        self.set_typing(false);
        let text = format!("Error: {failure}");
        match self.current_assistant_id.take() {
            Some(target) => self.transcript.mark_error(&target, text),
            None => {
                let mut message = Message::new(Role::Assistant, text);
                message.is_error = true;
                self.transcript.push(message);
            }
        }
        self.publish_messages();
        self.notify(Notice::new(
            "Error",
            format!("Failed to get a response: {failure}. Please try again."),
        ));
        self.set_loading(false);
    }

    fn publish_messages(&self) {
        self.messages_tx
            .send_replace(self.transcript.messages().to_vec());
    }

    fn set_typing(&self, on: bool) {
        if *self.typing_tx.borrow() != on {
            self.typing_tx.send_replace(on);
        }
    }

    fn set_loading(&self, on: bool) {
        if *self.loading_tx.borrow() != on {
            self.loading_tx.send_replace(on);
        }
    }

    fn notify(&self, notice: Notice) {
        if let Err(err) = self.notices_tx.try_send(notice) {
            warn!(error = %err, "dropping notice; receiver missing or lagging");
        }
    }
}
