use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::todo_model::Priority;

/// Body of `POST /todos`. Owner fields are not part of it, whatever the client sends.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoDTO {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_team_todo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDateTime>,
}

/// Body of `PATCH /todos/{id}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoDTO {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Missing leaves the due date alone, `null` clears it
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDateTime>>,
}

/// Marks a key that was sent, even as `null`, as `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageDTO {
    pub message: String,
}

impl MessageDTO {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_due_date_null_differs_from_missing() {
        let missing: UpdateTodoDTO = serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assert_eq!(missing.due_date, None);

        let cleared: UpdateTodoDTO = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTodoDTO =
            serde_json::from_str(r#"{"dueDate":"2026-01-02T03:04:05"}"#).unwrap();
        assert!(matches!(set.due_date, Some(Some(_))));
    }

    #[test]
    fn test_cleared_due_date_is_sent_as_null() {
        let patch = UpdateTodoDTO {
            due_date: Some(None),
            ..Default::default()
        };

        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"dueDate":null}"#);
        assert_eq!(serde_json::to_string(&UpdateTodoDTO::default()).unwrap(), "{}");
    }
}
