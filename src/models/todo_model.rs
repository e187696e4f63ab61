use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::user_model::SlimUser;

/// Longest todo text accepted, counted in characters after trimming
pub const MAX_TEXT_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!("Unknown priority '{}'", other)),
        }
    }
}

/// How close an open todo is to its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DueStatus {
    Overdue,
    DueSoon,
    Upcoming,
}

impl DueStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DueStatus::Overdue => "overdue",
            DueStatus::DueSoon => "due soon",
            DueStatus::Upcoming => "upcoming",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: uuid::Uuid,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub owner_id: uuid::Uuid,
    pub owner_name: String,
    pub is_team_todo: bool,
    pub last_completed_by: Option<String>,
    pub last_completed_at: Option<NaiveDateTime>,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Todo {
    /// Builds a fresh record owned by `owner`. Owner fields only ever come from here.
    pub fn new_for(
        owner: &SlimUser,
        text: String,
        priority: Priority,
        is_team_todo: bool,
        due_date: Option<NaiveDateTime>,
    ) -> Self {
        let created_at = now();

        Self {
            id: uuid::Uuid::new_v4(),
            text,
            completed: false,
            priority,
            owner_id: owner.id,
            owner_name: owner.name.clone(),
            is_team_todo,
            last_completed_by: None,
            last_completed_at: None,
            due_date,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_owned_by(&self, user_id: uuid::Uuid) -> bool {
        self.owner_id == user_id
    }

    /// A todo is visible to its owner, and to everyone when it is a team todo
    pub fn is_visible_to(&self, user_id: uuid::Uuid) -> bool {
        self.is_owned_by(user_id) || self.is_team_todo
    }

    pub fn due_status(&self, at: NaiveDateTime) -> Option<DueStatus> {
        if self.completed {
            return None;
        }

        let due = self.due_date?;

        if due < at {
            Some(DueStatus::Overdue)
        } else if due - at <= Duration::hours(24) {
            Some(DueStatus::DueSoon)
        } else {
            Some(DueStatus::Upcoming)
        }
    }
}

/// Trims and checks todo text. Returns the stored form.
pub fn normalize_text(raw: &str) -> Result<String, String> {
    let text = raw.trim();

    if text.is_empty() {
        return Err("Todo text cannot be empty".to_string());
    }

    if text.chars().count() > MAX_TEXT_LEN {
        return Err(format!(
            "Todo text cannot be longer than {} characters",
            MAX_TEXT_LEN
        ));
    }

    Ok(text.to_string())
}

/// Current UTC time at microsecond precision, the resolution Postgres keeps
pub fn now() -> NaiveDateTime {
    let ts = Utc::now().naive_utc();
    ts.with_nanosecond((ts.nanosecond() / 1_000) * 1_000)
        .unwrap_or(ts)
}

/// Timestamp for a write that must land strictly after `previous`
pub fn next_update_stamp(previous: NaiveDateTime) -> NaiveDateTime {
    let current = now();

    if current > previous {
        current
    } else {
        previous + Duration::microseconds(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub personal_todos: u64,
    pub team_todos: u64,
    pub high_priority: u64,
    pub completion_rate: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    fn owner() -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            email: "ann@example.com".to_string(),
            name: "Ann".to_string(),
        }
    }

    #[test]
    fn test_visibility_rule() {
        let ann = owner();
        let stranger = uuid::Uuid::new_v4();

        let personal = Todo::new_for(&ann, "Buy milk".into(), Priority::Normal, false, None);
        let team = Todo::new_for(&ann, "Deploy".into(), Priority::High, true, None);

        assert!(personal.is_visible_to(ann.id));
        assert!(!personal.is_visible_to(stranger));
        assert!(team.is_visible_to(ann.id));
        assert!(team.is_visible_to(stranger));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Deploy  "), Ok("Deploy".to_string()));
        assert!(normalize_text("   ").is_err());
        assert!(normalize_text(&"a".repeat(MAX_TEXT_LEN)).is_ok());
        assert!(normalize_text(&"a".repeat(MAX_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn test_due_status() {
        let ann = owner();
        let at = now();
        let mut todo = Todo::new_for(&ann, "Report".into(), Priority::Normal, false, None);

        assert_eq!(todo.due_status(at), None);

        todo.due_date = Some(at - Duration::minutes(5));
        assert_eq!(todo.due_status(at), Some(DueStatus::Overdue));

        todo.due_date = Some(at + Duration::hours(3));
        assert_eq!(todo.due_status(at), Some(DueStatus::DueSoon));

        todo.due_date = Some(at + Duration::days(3));
        assert_eq!(todo.due_status(at), Some(DueStatus::Upcoming));

        todo.completed = true;
        assert_eq!(todo.due_status(at), None);
    }

    #[test]
    fn test_next_update_stamp_is_strictly_later() {
        let future = now() + Duration::seconds(10);

        assert!(next_update_stamp(future) > future);
        assert!(next_update_stamp(now() - Duration::seconds(1)) <= now());
    }

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = Todo::new_for(&owner(), "Deploy".into(), Priority::High, true, None);
        let json = serde_json::to_value(&todo).unwrap();

        assert_eq!(json["isTeamTodo"], true);
        assert_eq!(json["ownerName"], "Ann");
        assert_eq!(json["priority"], "high");
        assert!(json["lastCompletedBy"].is_null());
    }
}
