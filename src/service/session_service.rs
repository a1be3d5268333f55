use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::EVENT_START_CHAT;
use crate::chat::session::{Collaborators, ConversationSession, SendOutcome, SessionSettings};
use crate::errors::AppError;
use crate::models::{Profile, StartSessionResponse};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type Registry = RwLock<HashMap<String, Arc<ConversationSession>>>;

/// Owns every live conversation. A session lives from `start_session`
/// until `end_session` ("start over") or until the background sweep finds
/// it expired.
#[derive(Clone)]
pub struct SessionService {
    collaborators: Collaborators,
    settings: SessionSettings,
    sessions: Arc<Registry>,
}

impl SessionService {
    /// Must be called inside a tokio runtime; spawns the expiry sweep, which
    /// stops once the last clone of the service is dropped.
    pub fn new(collaborators: Collaborators, settings: SessionSettings) -> Self {
        let sessions: Arc<Registry> = Arc::default();
        tokio::spawn(sweep_expired(Arc::downgrade(&sessions)));
        Self { collaborators, settings, sessions }
    }

    /// Validates the landing form, records it, and kicks off the first turn
    /// in the background.
    pub async fn start_session(&self, profile: Profile) -> Result<StartSessionResponse, AppError> {
        profile.validate()?;

        self.collaborators
            .analytics
            .track_event(EVENT_START_CHAT, Some(json!({ "relationship": profile.relationship })));

        let store_session_id = match self.collaborators.store.create_session(&profile).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Continuing without persistence, session record not created: {e}");
                None
            }
        };
        let persisted = store_session_id.is_some();

        let id = Uuid::new_v4().to_string();
        let session = ConversationSession::new(
            id.clone(),
            profile,
            store_session_id,
            self.collaborators.clone(),
            self.settings,
        );
        self.sessions.write().insert(id.clone(), Arc::clone(&session));
        info!(session = %id, persisted, "Session created");

        tokio::spawn(async move {
            session.start().await;
        });

        Ok(StartSessionResponse { session_id: id, persisted })
    }

    pub fn get(&self, id: &str) -> Result<Arc<ConversationSession>, AppError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub async fn send_message(&self, id: &str, text: Option<&str>) -> Result<SendOutcome, AppError> {
        let session = self.get(id)?;
        Ok(session.send_message(text).await)
    }

    pub fn set_draft(&self, id: &str, text: String) -> Result<(), AppError> {
        self.get(id)?.set_draft(text);
        Ok(())
    }

    /// Drops the session from the registry. Reply chunks already scheduled
    /// still finish in the background.
    pub fn end_session(&self, id: &str) -> Result<(), AppError> {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(_) => {
                info!(session = %id, live = self.session_count(), "Session torn down");
                Ok(())
            }
            None => Err(AppError::SessionNotFound { id: id.to_string() }),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

async fn sweep_expired(sessions: Weak<Registry>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let Some(registry) = sessions.upgrade() else {
            debug!("Session registry dropped, stopping expiry sweep");
            break;
        };
        let mut registry = registry.write();
        let before = registry.len();
        registry.retain(|_, session| !session.is_expired());
        let evicted = before - registry.len();
        if evicted > 0 {
            info!(evicted, live = registry.len(), "Evicted expired sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::SessionPhase;
    use crate::testing::{profile, MockStore, Mocks, Reply};
    use std::time::Duration;

    fn service(mocks: &Mocks) -> SessionService {
        SessionService::new(mocks.collaborators(), SessionSettings::default())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_session_registers_and_starts() {
        let mocks = Mocks::new(vec![Reply::Text("헐 ||| 진짜? __CHIPS__: 응 | 아니")]);
        let svc = service(&mocks);

        let started = svc.start_session(profile()).await.unwrap();
        assert!(started.persisted);
        assert_eq!(svc.session_count(), 1);

        settle().await;
        let snap = svc.get(&started.session_id).unwrap().snapshot();
        assert_eq!(snap.phase, SessionPhase::Active);
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.chips, vec!["응", "아니"]);

        let events = mocks.analytics.events.lock();
        assert_eq!(events[0].0, EVENT_START_CHAT);
        assert_eq!(events[0].1, Some(json!({ "relationship": "썸" })));
        assert_eq!(mocks.store.created.lock().len(), 1);
        assert!(mocks.store.messages.lock().iter().all(|(sid, _)| sid == "db-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_profile_is_rejected_before_anything_happens() {
        let mocks = Mocks::new(vec![]);
        let svc = service(&mocks);
        let mut p = profile();
        p.my_nickname = " ".to_string();

        let err = svc.start_session(p).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(svc.session_count(), 0);
        assert!(mocks.analytics.events.lock().is_empty());
        assert_eq!(mocks.ai.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_still_starts_chat() {
        let mocks = Mocks::with_store(
            vec![Reply::Text("헐")],
            MockStore { fail_create: true, ..MockStore::default() },
        );
        let svc = service(&mocks);

        let started = svc.start_session(profile()).await.unwrap();
        assert!(!started.persisted);
        settle().await;

        let snap = svc.get(&started.session_id).unwrap().snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert!(mocks.store.messages.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_session_is_not_found() {
        let mocks = Mocks::new(vec![]);
        let svc = service(&mocks);
        assert!(matches!(svc.get("nope"), Err(e) if e.is_not_found()));
        assert!(svc.send_message("nope", Some("hi")).await.unwrap_err().is_not_found());
        assert!(svc.end_session("nope").unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session_removes_it() {
        let mocks = Mocks::new(vec![Reply::Text("헐")]);
        let svc = service(&mocks);
        let started = svc.start_session(profile()).await.unwrap();

        svc.end_session(&started.session_id).unwrap();
        assert_eq!(svc.session_count(), 0);
        assert!(svc.get(&started.session_id).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted_after_ttl() {
        let mocks = Mocks::new(vec![Reply::Text("헐")]);
        let settings = SessionSettings { idle_ttl: Duration::from_secs(600), ..SessionSettings::default() };
        let svc = SessionService::new(mocks.collaborators(), settings);
        let started = svc.start_session(profile()).await.unwrap();
        let t0 = tokio::time::Instant::now();

        tokio::time::sleep_until(t0 + Duration::from_secs(570)).await;
        assert_eq!(svc.session_count(), 1);

        tokio::time::sleep_until(t0 + Duration::from_secs(700)).await;
        assert_eq!(svc.session_count(), 0);
        assert!(matches!(svc.get(&started.session_id), Err(e) if e.is_not_found()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_sessions_are_swept() {
        let mocks = Mocks::new((0..5).map(|_| Reply::Text("헐")).collect());
        let svc = service(&mocks);
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(svc.start_session(profile()).await.unwrap().session_id);
        }
        settle().await;

        for id in &ids {
            let outcome = svc.send_message(id, Some("foo@bar.com")).await.unwrap();
            assert_eq!(outcome, SendOutcome::EmailCaptured);
        }
        assert_eq!(svc.session_count(), 5);

        tokio::time::sleep(Duration::from_secs(3 * 60)).await;
        assert_eq!(svc.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_message_through_service() {
        let mocks = Mocks::new(vec![Reply::Text("헐"), Reply::Text("그래서?")]);
        let svc = service(&mocks);
        let started = svc.start_session(profile()).await.unwrap();
        settle().await;

        svc.set_draft(&started.session_id, "어제 봤어".to_string()).unwrap();
        let outcome = svc.send_message(&started.session_id, None).await.unwrap();
        assert_eq!(outcome, SendOutcome::Accepted);
        assert_eq!(mocks.ai.request_count(), 2);
    }
}
