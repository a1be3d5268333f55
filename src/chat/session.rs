//! One user's conversation: history, chips, typing flag and lifecycle.
//!
//! All state sits behind a single short-lived lock that is never held across
//! an `.await`. The typing flag doubles as the turn guard: it is checked and
//! set under that lock, so at most one AI request is in flight per session
//! no matter how many callers race on [`ConversationSession::send_message`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::persona::{
    self, EMAIL_CONFIRMATION_TEXT, EMAIL_TOAST_TEXT, INIT_FAILURE_TEXT, TURN_FAILURE_TEXT,
};
use crate::agent::{AiClient, AiRequest};
use crate::analytics::{Analytics, EVENT_SEND_MESSAGE, EVENT_SUBMIT_EMAIL};
use crate::chat::events::ChatEvent;
use crate::chat::parser::parse;
use crate::chat::scheduler::{self, DeliverySink, Pacing};
use crate::chat::segmenter::segment;
use crate::db::SessionStore;
use crate::errors::AppError;
use crate::models::{HistoryEntry, Message, Profile};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
/// How long an ended session stays readable before it may be evicted.
pub const ENDED_SESSION_GRACE: Duration = Duration::from_secs(60);
const EVENT_CAPACITY: usize = 256;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    })
}

/// True when the whole of `text` (untrimmed) looks like an email address.
pub fn is_email(text: &str) -> bool {
    email_regex().is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    AwaitingAi,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A reply is still being requested or typed out.
    Busy,
    Empty,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    EmailCaptured,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub phase: SessionPhase,
    pub messages: Vec<Message>,
    pub chips: Vec<String>,
    pub typing: bool,
    pub ended: bool,
    pub toast: Option<String>,
    pub draft: String,
}

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ai: Arc<dyn AiClient>,
    pub store: Arc<dyn SessionStore>,
    pub analytics: Arc<dyn Analytics>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub pacing: Pacing,
    pub ai_timeout: Duration,
    /// Sessions untouched for this long are evicted.
    pub idle_ttl: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            ai_timeout: DEFAULT_AI_TIMEOUT,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    messages: Vec<Message>,
    chips: Vec<String>,
    typing: bool,
    toast: Option<String>,
    draft: String,
    transcript: Vec<HistoryEntry>,
    next_id: u64,
    last_activity: Instant,
}

pub struct ConversationSession {
    id: String,
    profile: Profile,
    /// Id of the mirrored database record; `None` disables persistence.
    store_session_id: Option<String>,
    system_instruction: String,
    collaborators: Collaborators,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    events: broadcast::Sender<ChatEvent>,
}

impl ConversationSession {
    pub fn new(
        id: String,
        profile: Profile,
        store_session_id: Option<String>,
        collaborators: Collaborators,
        settings: SessionSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            system_instruction: persona::system_instruction(&profile),
            id,
            profile,
            store_session_id,
            collaborators,
            settings,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Idle,
                messages: Vec::new(),
                chips: Vec::new(),
                typing: false,
                toast: None,
                draft: String::new(),
                transcript: Vec::new(),
                next_id: 1,
                last_activity: Instant::now(),
            }),
            events,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            id: self.id.clone(),
            phase: state.phase,
            messages: state.messages.clone(),
            chips: state.chips.clone(),
            typing: state.typing,
            ended: state.phase == SessionPhase::Ended,
            toast: state.toast.clone(),
            draft: state.draft.clone(),
        }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.draft = text.into();
        state.last_activity = Instant::now();
    }

    /// True once the session has sat untouched past its TTL. Ended sessions
    /// only get [`ENDED_SESSION_GRACE`]; a session typing out a reply never
    /// expires.
    pub fn is_expired(&self) -> bool {
        let state = self.state.lock();
        if state.typing {
            return false;
        }
        let ttl = match state.phase {
            SessionPhase::Ended => ENDED_SESSION_GRACE.min(self.settings.idle_ttl),
            _ => self.settings.idle_ttl,
        };
        state.last_activity.elapsed() >= ttl
    }

    /// Opens the conversation with the user's worry. Only the first call
    /// has any effect.
    pub async fn start(self: &Arc<Self>) {
        let worry = {
            let mut state = self.state.lock();
            if state.phase != SessionPhase::Idle {
                debug!(session = %self.id, "Session already started");
                return;
            }
            state.phase = SessionPhase::AwaitingAi;
            let message = self.append(&mut state, self.profile.worry_content.clone(), true);
            state.typing = true;
            self.publish(ChatEvent::Typing { typing: true });
            message
        };

        info!(session = %self.id, "Session started");
        self.persist_message(&worry);
        self.run_turn(worry.text, INIT_FAILURE_TEXT).await;
    }

    /// Submits a user turn; `None` sends the current draft.
    ///
    /// Returns once the reply has been received and its delivery scheduled
    /// (or once the failure message has been appended).
    pub async fn send_message(self: &Arc<Self>, text: Option<&str>) -> SendOutcome {
        let (message, captured_email) = {
            let mut state = self.state.lock();
            if state.typing || state.phase == SessionPhase::Idle {
                return SendOutcome::Rejected(RejectReason::Busy);
            }
            if state.phase == SessionPhase::Ended {
                return SendOutcome::Rejected(RejectReason::Ended);
            }
            let text = match text {
                Some(text) => text.to_string(),
                None => state.draft.clone(),
            };
            if text.trim().is_empty() {
                return SendOutcome::Rejected(RejectReason::Empty);
            }

            if !state.chips.is_empty() {
                state.chips.clear();
                self.publish(ChatEvent::Chips { chips: Vec::new() });
            }
            let message = self.append(&mut state, text, true);
            state.draft.clear();

            let captured_email = is_email(&message.text);
            if captured_email {
                state.phase = SessionPhase::Ended;
                self.publish(ChatEvent::Ended);
                state.toast = Some(EMAIL_TOAST_TEXT.to_string());
                self.publish(ChatEvent::Toast { text: state.toast.clone() });
                self.append(&mut state, EMAIL_CONFIRMATION_TEXT, false);
            } else {
                state.phase = SessionPhase::AwaitingAi;
                state.typing = true;
                self.publish(ChatEvent::Typing { typing: true });
            }
            (message, captured_email)
        };

        if captured_email {
            info!(session = %self.id, "Email captured, session ended");
            self.collaborators.analytics.track_event(EVENT_SUBMIT_EMAIL, None);
            self.persist_email(message.text);
            self.hide_toast_later();
            return SendOutcome::EmailCaptured;
        }

        self.collaborators.analytics.track_event(EVENT_SEND_MESSAGE, None);
        self.persist_message(&message);
        self.run_turn(message.text, TURN_FAILURE_TEXT).await;
        SendOutcome::Accepted
    }

    async fn run_turn(self: &Arc<Self>, text: String, failure_text: &str) {
        let history = self.state.lock().transcript.clone();
        let request = AiRequest {
            system_instruction: self.system_instruction.clone(),
            history,
            message: text.clone(),
        };

        match self.request_reply(request).await {
            Ok(raw) => {
                let parsed = parse(&raw);
                let chunks = segment(&parsed.body);
                {
                    let mut state = self.state.lock();
                    state.transcript.push(HistoryEntry::user(text));
                    state.transcript.push(HistoryEntry::model(raw));
                    state.phase = SessionPhase::Active;
                }
                info!(
                    session = %self.id,
                    chunks = chunks.len(),
                    chips = parsed.chips.len(),
                    is_final = parsed.is_final,
                    "Delivering reply"
                );

                let session = Arc::clone(self);
                let pacing = self.settings.pacing;
                tokio::spawn(async move {
                    scheduler::deliver(pacing, chunks, parsed.chips, &*session).await;
                });
            }
            Err(e) => {
                warn!(session = %self.id, "Chat turn failed: {e}");
                let mut state = self.state.lock();
                state.phase = SessionPhase::Active;
                state.typing = false;
                self.publish(ChatEvent::Typing { typing: false });
                self.append(&mut state, failure_text, false);
            }
        }
    }

    async fn request_reply(&self, request: AiRequest) -> Result<String, AppError> {
        let timeout = self.settings.ai_timeout;
        match tokio::time::timeout(timeout, self.collaborators.ai.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::AgentTimeout { seconds: timeout.as_secs() }),
        }
    }

    fn append(&self, state: &mut SessionState, text: impl Into<String>, is_user: bool) -> Message {
        let id = state.next_id;
        state.next_id += 1;
        state.last_activity = Instant::now();
        let message = if is_user { Message::user(id, text) } else { Message::assistant(id, text) };
        state.messages.push(message.clone());
        self.publish(ChatEvent::Message { message: message.clone() });
        message
    }

    fn publish(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist_message(&self, message: &Message) {
        let Some(session_id) = self.store_session_id.clone() else {
            return;
        };
        let store = Arc::clone(&self.collaborators.store);
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_message(&session_id, &message).await {
                warn!(session = %session_id, message_id = message.id, "Message not persisted: {e}");
            }
        });
    }

    fn persist_email(&self, email: String) {
        let Some(session_id) = self.store_session_id.clone() else {
            return;
        };
        let store = Arc::clone(&self.collaborators.store);
        tokio::spawn(async move {
            if let Err(e) = store.update_session_email(&session_id, &email).await {
                warn!(session = %session_id, "Email not persisted: {e}");
            }
        });
    }

    fn hide_toast_later(self: &Arc<Self>) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(TOAST_DURATION).await;
            let mut state = session.state.lock();
            if state.toast.take().is_some() {
                session.publish(ChatEvent::Toast { text: None });
            }
        });
    }
}

impl DeliverySink for ConversationSession {
    fn emit(&self, chunk: String) {
        let message = {
            let mut state = self.state.lock();
            self.append(&mut state, chunk, false)
        };
        self.persist_message(&message);
    }

    fn complete(&self, chips: Vec<String>) {
        let mut state = self.state.lock();
        state.typing = false;
        state.chips = chips.clone();
        state.last_activity = Instant::now();
        self.publish(ChatEvent::Typing { typing: false });
        self.publish(ChatEvent::Chips { chips });
        debug!(session = %self.id, "Reply delivered");
    }
}
