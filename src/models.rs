use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const MAX_NAME_LENGTH: usize = 40;
const MAX_LABEL_LENGTH: usize = 40;
const MAX_WORRY_LENGTH: usize = 2000;

/// Profile submitted from the landing form. Interpolated into the persona
/// prompt and stored as the session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub my_nickname: String,
    pub gender: String,
    pub partner_name: String,
    pub relationship: String,
    pub worry_content: String,
}

impl Profile {
    /// Checks every required field is present and within bounds.
    /// Values are kept verbatim; only the emptiness check trims.
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("my_nickname", &self.my_nickname, MAX_NAME_LENGTH),
            ("gender", &self.gender, MAX_LABEL_LENGTH),
            ("partner_name", &self.partner_name, MAX_NAME_LENGTH),
            ("worry_content", &self.worry_content, MAX_WORRY_LENGTH),
        ];
        for (name, value, max_length) in fields {
            if value.trim().is_empty() {
                return Err(AppError::EmptyField { field_name: name.to_string() });
            }
            let actual_length = value.chars().count();
            if actual_length > max_length {
                return Err(AppError::FieldTooLong {
                    field_name: name.to_string(),
                    max_length,
                    actual_length,
                });
            }
        }

        let relationship_length = self.relationship.chars().count();
        if relationship_length > MAX_LABEL_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "relationship".to_string(),
                max_length: MAX_LABEL_LENGTH,
                actual_length: relationship_length,
            });
        }
        Ok(())
    }
}

/// One chat bubble in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), is_user: true, timestamp: Utc::now() }
    }

    pub fn assistant(id: u64, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), is_user: false, timestamp: Utc::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One entry of the transcript replayed to the AI collaborator.
/// Model entries keep the raw reply, markers included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

// ── API payloads ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    /// Whether the session record reached the database.
    pub persisted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            my_nickname: "고갤러".to_string(),
            gender: "남자".to_string(),
            partner_name: "김민지".to_string(),
            relationship: "썸".to_string(),
            worry_content: "답장은 빠른데 스토리가 수상해".to_string(),
        }
    }

    #[test]
    fn test_valid_profile_passes() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let mut p = profile();
        p.partner_name = "   ".to_string();
        match p.validate() {
            Err(AppError::EmptyField { field_name }) => assert_eq!(field_name, "partner_name"),
            other => panic!("expected EmptyField, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_relationship_is_allowed() {
        let mut p = profile();
        p.relationship = String::new();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_overlong_worry_is_rejected() {
        let mut p = profile();
        p.worry_content = "가".repeat(MAX_WORRY_LENGTH + 1);
        assert!(matches!(
            p.validate(),
            Err(AppError::FieldTooLong { actual_length, .. }) if actual_length == MAX_WORRY_LENGTH + 1
        ));
    }

    #[test]
    fn test_message_constructors_set_sender() {
        assert!(Message::user(1, "hi").is_user);
        assert!(!Message::assistant(2, "yo").is_user);
    }
}
