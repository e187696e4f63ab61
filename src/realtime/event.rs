use serde::{Deserialize, Serialize};

use crate::models::todo_model::Todo;

/// Wire payload of a `deleteTodo` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedTodo {
    pub id: uuid::Uuid,
}

/// A committed mutation, as published on the broadcast channel
#[derive(Debug, Clone, PartialEq)]
pub enum TodoEvent {
    Created(Todo),
    Updated(Todo),
    /// Owner and sharing flag ride along for scoping; only the id goes on the wire
    Deleted {
        id: uuid::Uuid,
        owner_id: uuid::Uuid,
        is_team_todo: bool,
    },
}

impl TodoEvent {
    pub fn deleted(todo: &Todo) -> Self {
        TodoEvent::Deleted {
            id: todo.id,
            owner_id: todo.owner_id,
            is_team_todo: todo.is_team_todo,
        }
    }

    /// Event name used on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            TodoEvent::Created(_) => "newTodo",
            TodoEvent::Updated(_) => "updateTodo",
            TodoEvent::Deleted { .. } => "deleteTodo",
        }
    }

    pub fn todo_id(&self) -> uuid::Uuid {
        match self {
            TodoEvent::Created(todo) | TodoEvent::Updated(todo) => todo.id,
            TodoEvent::Deleted { id, .. } => *id,
        }
    }

    /// Same rule the list endpoints apply
    pub fn is_visible_to(&self, user_id: uuid::Uuid) -> bool {
        match self {
            TodoEvent::Created(todo) | TodoEvent::Updated(todo) => todo.is_visible_to(user_id),
            TodoEvent::Deleted {
                owner_id,
                is_team_todo,
                ..
            } => *owner_id == user_id || *is_team_todo,
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            TodoEvent::Created(todo) | TodoEvent::Updated(todo) => serde_json::to_value(todo),
            TodoEvent::Deleted { id, .. } => serde_json::to_value(DeletedTodo { id: *id }),
        }
    }

    /// Renders one server-sent-events frame
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "event: {}\ndata: {}\n\n",
            self.wire_name(),
            self.payload()?
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{todo_model::Priority, user_model::SlimUser};

    fn ann() -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
        }
    }

    #[test]
    fn test_delete_frame_carries_only_id() {
        let todo = Todo::new_for(&ann(), "Buy milk".into(), Priority::Normal, false, None);
        let frame = TodoEvent::deleted(&todo).to_sse_frame().unwrap();

        assert_eq!(
            frame,
            format!("event: deleteTodo\ndata: {{\"id\":\"{}\"}}\n\n", todo.id)
        );
    }

    #[test]
    fn test_event_scoping() {
        let owner = ann();
        let other = uuid::Uuid::new_v4();

        let personal = Todo::new_for(&owner, "Buy milk".into(), Priority::Normal, false, None);
        let team = Todo::new_for(&owner, "Deploy".into(), Priority::Normal, true, None);

        assert!(!TodoEvent::Created(personal.clone()).is_visible_to(other));
        assert!(!TodoEvent::deleted(&personal).is_visible_to(other));
        assert!(TodoEvent::deleted(&personal).is_visible_to(owner.id));
        assert!(TodoEvent::Updated(team.clone()).is_visible_to(other));
        assert!(TodoEvent::deleted(&team).is_visible_to(other));
    }
}
