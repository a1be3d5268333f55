use serde::Serialize;

use crate::chat::session::SessionSnapshot;
use crate::models::Message;

/// State changes pushed to subscribers of a session.
///
/// Serialized internally tagged, e.g. `{ "type": "typing", "typing": true }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Full state, sent first to every new subscriber and after a lag.
    Snapshot { snapshot: SessionSnapshot },
    Message { message: Message },
    Typing { typing: bool },
    Chips { chips: Vec<String> },
    Ended,
    /// `text` is `None` once the toast should disappear.
    Toast { text: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_internally_tagged() {
        let json = serde_json::to_value(ChatEvent::Typing { typing: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "typing", "typing": true }));

        let json = serde_json::to_value(ChatEvent::Ended).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "ended" }));

        let json = serde_json::to_value(ChatEvent::Chips { chips: vec!["응".into()] }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "chips", "chips": ["응"] }));
    }
}
