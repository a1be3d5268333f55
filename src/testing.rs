//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::agent::{AiClient, AiRequest};
use crate::analytics::Analytics;
use crate::chat::session::Collaborators;
use crate::db::SessionStore;
use crate::errors::AppError;
use crate::models::{Message, Profile};

pub enum Reply {
    Text(&'static str),
    Fail,
    /// Never resolves.
    Hang,
}

/// Answers requests from a script; an exhausted script fails.
#[derive(Default)]
pub struct MockAi {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<AiRequest>>,
}

impl MockAi {
    pub fn with(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::default() })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl AiClient for MockAi {
    async fn send(&self, request: AiRequest) -> Result<String, AppError> {
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail) | None => {
                Err(AppError::InferenceError { message: "connection reset".to_string() })
            }
        }
    }
}

#[derive(Default)]
pub struct MockStore {
    pub fail_create: bool,
    pub fail_saves: bool,
    pub created: Mutex<Vec<Profile>>,
    pub messages: Mutex<Vec<(String, Message)>>,
    pub emails: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SessionStore for MockStore {
    async fn create_session(&self, profile: &Profile) -> Result<String, AppError> {
        if self.fail_create {
            return Err(AppError::StoreUnavailable);
        }
        let mut created = self.created.lock();
        created.push(profile.clone());
        Ok(format!("db-{}", created.len()))
    }

    async fn save_message(&self, session_id: &str, message: &Message) -> Result<(), AppError> {
        if self.fail_saves {
            return Err(AppError::StoreUnavailable);
        }
        self.messages.lock().push((session_id.to_string(), message.clone()));
        Ok(())
    }

    async fn update_session_email(&self, session_id: &str, email: &str) -> Result<(), AppError> {
        self.emails.lock().push((session_id.to_string(), email.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockAnalytics {
    pub events: Mutex<Vec<(String, Option<serde_json::Value>)>>,
}

impl MockAnalytics {
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Analytics for MockAnalytics {
    fn track_event(&self, name: &str, params: Option<serde_json::Value>) {
        self.events.lock().push((name.to_string(), params));
    }
}

pub struct Mocks {
    pub ai: Arc<MockAi>,
    pub store: Arc<MockStore>,
    pub analytics: Arc<MockAnalytics>,
}

impl Mocks {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self::with_store(replies, MockStore::default())
    }

    pub fn with_store(replies: Vec<Reply>, store: MockStore) -> Self {
        Self {
            ai: MockAi::with(replies),
            store: Arc::new(store),
            analytics: Arc::new(MockAnalytics::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ai: self.ai.clone(),
            store: self.store.clone(),
            analytics: self.analytics.clone(),
        }
    }
}

pub fn profile() -> Profile {
    Profile {
        my_nickname: "민수".to_string(),
        gender: "남자".to_string(),
        partner_name: "지연".to_string(),
        relationship: "썸".to_string(),
        worry_content: "걔가 읽씹했어".to_string(),
    }
}
