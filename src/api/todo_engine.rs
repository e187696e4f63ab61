//! Authorization and mutation rules for todos.
//!
//! Every read and write goes through the visibility rule: a caller sees a
//! todo they own, or any team todo. Anything else is reported as not found.
//! Deleting is stricter and only works for the owner. Non-owners editing a
//! team todo get their patch narrowed to the completion flag.
//!
//! There is no version check: two writers racing on the same todo both
//! succeed and the later write wins.

use std::sync::Arc;

use crate::{
    api::{
        dtos::todo::{CreateTodoDTO, UpdateTodoDTO},
        errors::TodoApiError,
    },
    models::{
        todo_model::{next_update_stamp, normalize_text, StatsSummary, Todo},
        user_model::SlimUser,
    },
    realtime::{Broadcaster, TodoEvent},
    store::{TodoChanges, TodoCounts, TodoRepository, TodoScope},
};

/// A patch after the engine decided what the caller may touch
#[derive(Debug, Clone, PartialEq)]
pub enum RestrictedPatch {
    /// The owner may change every editable field
    Full(UpdateTodoDTO),
    /// Everyone else, on a team todo, may only flip completion
    CompletionOnly { completed: Option<bool> },
}

impl RestrictedPatch {
    pub fn for_caller(todo: &Todo, caller: &SlimUser, patch: UpdateTodoDTO) -> Self {
        if todo.is_owned_by(caller.id) {
            RestrictedPatch::Full(patch)
        } else {
            if patch.text.is_some() || patch.priority.is_some() || patch.due_date.is_some() {
                log::debug!(
                    "Dropping non-completion fields from {}'s patch of team todo {}",
                    caller.id,
                    todo.id
                );
            }
            RestrictedPatch::CompletionOnly {
                completed: patch.completed,
            }
        }
    }

    /// Turns the patch into store writes, or `None` when nothing is left to write
    fn into_changes(self, current: &Todo) -> Result<Option<TodoChanges>, TodoApiError> {
        let mut changes = TodoChanges::stamped(next_update_stamp(current.updated_at));

        match self {
            RestrictedPatch::Full(patch) => {
                if patch.text.is_none()
                    && patch.completed.is_none()
                    && patch.priority.is_none()
                    && patch.due_date.is_none()
                {
                    return Ok(None);
                }

                changes.text = match patch.text {
                    Some(raw) => Some(normalize_text(&raw).map_err(TodoApiError::BadRequest)?),
                    None => None,
                };
                changes.completed = patch.completed;
                changes.priority = patch.priority;
                changes.due_date = patch.due_date;
            }
            RestrictedPatch::CompletionOnly { completed } => match completed {
                Some(completed) => changes.completed = Some(completed),
                None => return Ok(None),
            },
        }

        Ok(Some(changes))
    }
}

impl From<TodoCounts> for StatsSummary {
    fn from(counts: TodoCounts) -> Self {
        let completion_rate = if counts.total == 0 {
            0.0
        } else {
            counts.completed as f64 / counts.total as f64 * 100.0
        };

        StatsSummary {
            total: counts.total,
            completed: counts.completed,
            pending: counts.total - counts.completed,
            personal_todos: counts.personal,
            team_todos: counts.team,
            high_priority: counts.high_priority,
            completion_rate,
        }
    }
}

#[derive(Clone)]
pub struct TodoEngine {
    repo: Arc<dyn TodoRepository>,
    broadcaster: Broadcaster,
}

impl TodoEngine {
    pub fn new(repo: Arc<dyn TodoRepository>, broadcaster: Broadcaster) -> Self {
        Self { repo, broadcaster }
    }

    /// Everything the caller can see, newest first
    pub fn list_visible(&self, caller: &SlimUser) -> Result<Vec<Todo>, TodoApiError> {
        self.repo.find_matching(TodoScope::Visible(caller.id))
    }

    /// Only the caller's own todos, newest first
    pub fn list_owned(&self, caller: &SlimUser) -> Result<Vec<Todo>, TodoApiError> {
        self.repo.find_matching(TodoScope::Owned(caller.id))
    }

    pub fn create(&self, draft: CreateTodoDTO, caller: &SlimUser) -> Result<Todo, TodoApiError> {
        let text = normalize_text(&draft.text).map_err(TodoApiError::BadRequest)?;

        let todo = Todo::new_for(
            caller,
            text,
            draft.priority.unwrap_or_default(),
            draft.is_team_todo.unwrap_or(false),
            draft.due_date,
        );

        let inserted = self.repo.insert(todo)?;

        log::info!(
            "{} created {} todo {}",
            caller.id,
            if inserted.is_team_todo { "team" } else { "personal" },
            inserted.id
        );
        self.broadcaster.publish(TodoEvent::Created(inserted.clone()));

        Ok(inserted)
    }

    pub fn update(
        &self,
        id: uuid::Uuid,
        patch: UpdateTodoDTO,
        caller: &SlimUser,
    ) -> Result<Todo, TodoApiError> {
        let current = self.find_visible(id, caller)?;

        let changes = match RestrictedPatch::for_caller(&current, caller, patch)
            .into_changes(&current)?
        {
            Some(changes) => changes,
            None => return Ok(current),
        };

        let updated = self
            .repo
            .update_by_id(id, changes)?
            .ok_or_else(TodoApiError::todo_not_found)?;

        self.broadcaster.publish(TodoEvent::Updated(updated.clone()));

        Ok(updated)
    }

    /// Flips completion. On team todos every flip, either way, records who
    /// did it and when.
    pub fn toggle_complete(&self, id: uuid::Uuid, caller: &SlimUser) -> Result<Todo, TodoApiError> {
        let current = self.find_visible(id, caller)?;

        let mut changes = TodoChanges::stamped(next_update_stamp(current.updated_at));
        changes.completed = Some(!current.completed);

        if current.is_team_todo {
            changes.last_completed_by = Some(caller.name.clone());
            changes.last_completed_at = Some(changes.updated_at);
        }

        let updated = self
            .repo
            .update_by_id(id, changes)?
            .ok_or_else(TodoApiError::todo_not_found)?;

        self.broadcaster.publish(TodoEvent::Updated(updated.clone()));

        Ok(updated)
    }

    /// Owner-only, team todos included
    pub fn delete(&self, id: uuid::Uuid, caller: &SlimUser) -> Result<Todo, TodoApiError> {
        let deleted = self
            .repo
            .delete_by_id(id, TodoScope::Owned(caller.id))?
            .ok_or_else(TodoApiError::todo_not_found)?;

        log::info!("{} deleted todo {}", caller.id, deleted.id);
        self.broadcaster.publish(TodoEvent::deleted(&deleted));

        Ok(deleted)
    }

    pub fn stats(&self, caller: &SlimUser) -> Result<StatsSummary, TodoApiError> {
        Ok(self.repo.aggregate(TodoScope::Visible(caller.id))?.into())
    }

    fn find_visible(&self, id: uuid::Uuid, caller: &SlimUser) -> Result<Todo, TodoApiError> {
        self.repo
            .find_by_id(id, TodoScope::Visible(caller.id))?
            .ok_or_else(TodoApiError::todo_not_found)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{models::todo_model::Priority, store::MemoryTodoRepository};

    fn user(name: &str) -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn engine() -> (TodoEngine, Broadcaster) {
        let broadcaster = Broadcaster::new(32);
        let engine = TodoEngine::new(Arc::new(MemoryTodoRepository::new()), broadcaster.clone());
        (engine, broadcaster)
    }

    fn draft(text: &str, team: bool) -> CreateTodoDTO {
        CreateTodoDTO {
            text: text.to_string(),
            is_team_todo: Some(team),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_sets_owner_and_defaults() {
        let (engine, _) = engine();
        let ann = user("Ann");

        let todo = engine
            .create(
                CreateTodoDTO {
                    text: "  Buy milk ".into(),
                    ..Default::default()
                },
                &ann,
            )
            .unwrap();

        assert_eq!(todo.text, "Buy milk");
        assert_eq!(todo.owner_id, ann.id);
        assert_eq!(todo.owner_name, "Ann");
        assert!(!todo.is_team_todo);
        assert!(!todo.completed);
        assert_eq!(todo.priority, Priority::Normal);
    }

    #[test]
    fn test_create_rejects_blank_text() {
        let (engine, broadcaster) = engine();
        let mut events = broadcaster.subscribe();

        let result = engine.create(draft("   ", false), &user("Ann"));

        assert!(matches!(result, Err(TodoApiError::BadRequest(_))));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_personal_todo_invisible_to_others() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        let milk = engine.create(draft("Buy milk", false), &ann).unwrap();

        assert!(engine.list_visible(&bob).unwrap().is_empty());
        assert!(matches!(
            engine.toggle_complete(milk.id, &bob),
            Err(TodoApiError::NotFound(_))
        ));
        assert!(matches!(
            engine.update(milk.id, UpdateTodoDTO::default(), &bob),
            Err(TodoApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_non_owner_patch_is_narrowed_to_completion() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        let deploy = engine.create(draft("Deploy", true), &ann).unwrap();

        let updated = engine
            .update(
                deploy.id,
                UpdateTodoDTO {
                    text: Some("x".into()),
                    completed: Some(true),
                    priority: Some(Priority::High),
                    due_date: None,
                },
                &bob,
            )
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.text, "Deploy");
        assert_eq!(updated.priority, Priority::Normal);
    }

    #[test]
    fn test_owner_can_clear_due_date_but_others_cannot() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        let due = crate::models::todo_model::now() + chrono::Duration::hours(3);
        let deploy = engine
            .create(
                CreateTodoDTO {
                    due_date: Some(due),
                    ..draft("Deploy", true)
                },
                &ann,
            )
            .unwrap();

        let clear = || UpdateTodoDTO {
            due_date: Some(None),
            ..Default::default()
        };

        let untouched = engine.update(deploy.id, clear(), &bob).unwrap();
        assert_eq!(untouched.due_date, Some(due));

        let cleared = engine.update(deploy.id, clear(), &ann).unwrap();
        assert_eq!(cleared.due_date, None);

        let kept = engine
            .update(
                deploy.id,
                UpdateTodoDTO {
                    text: Some("Deploy v2".into()),
                    ..Default::default()
                },
                &ann,
            )
            .unwrap();
        assert_eq!(kept.due_date, None);
        assert_eq!(kept.text, "Deploy v2");
    }

    #[test]
    fn test_non_owner_patch_without_completion_changes_nothing() {
        let (engine, broadcaster) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        let deploy = engine.create(draft("Deploy", true), &ann).unwrap();
        let mut events = broadcaster.subscribe();

        let unchanged = engine
            .update(
                deploy.id,
                UpdateTodoDTO {
                    text: Some("hijacked".into()),
                    ..Default::default()
                },
                &bob,
            )
            .unwrap();

        assert_eq!(unchanged, deploy);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_owner_update_bumps_updated_at_only() {
        let (engine, _) = engine();
        let ann = user("Ann");

        let todo = engine.create(draft("Deploy", false), &ann).unwrap();
        let updated = engine
            .update(
                todo.id,
                UpdateTodoDTO {
                    text: Some("Deploy v2".into()),
                    ..Default::default()
                },
                &ann,
            )
            .unwrap();

        assert_eq!(updated.text, "Deploy v2");
        assert!(updated.updated_at > todo.updated_at);
        assert_eq!(updated.created_at, todo.created_at);
    }

    #[test]
    fn test_owner_update_validates_text() {
        let (engine, _) = engine();
        let ann = user("Ann");

        let todo = engine.create(draft("Deploy", false), &ann).unwrap();
        let result = engine.update(
            todo.id,
            UpdateTodoDTO {
                text: Some("y".repeat(101)),
                ..Default::default()
            },
            &ann,
        );

        assert!(matches!(result, Err(TodoApiError::BadRequest(_))));
    }

    #[test]
    fn test_team_toggle_records_completer_both_ways() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");
        let cat = user("Cat");

        let deploy = engine.create(draft("Deploy", true), &ann).unwrap();

        let done = engine.toggle_complete(deploy.id, &bob).unwrap();
        assert!(done.completed);
        assert_eq!(done.last_completed_by.as_deref(), Some("Bob"));
        let first_at = done.last_completed_at.unwrap();

        let undone = engine.toggle_complete(deploy.id, &cat).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.last_completed_by.as_deref(), Some("Cat"));
        assert!(undone.last_completed_at.unwrap() > first_at);
    }

    #[test]
    fn test_personal_toggle_leaves_completion_metadata_empty() {
        let (engine, _) = engine();
        let ann = user("Ann");

        let todo = engine.create(draft("Buy milk", false), &ann).unwrap();
        let toggled = engine.toggle_complete(todo.id, &ann).unwrap();

        assert!(toggled.completed);
        assert!(toggled.last_completed_by.is_none());
        assert!(toggled.last_completed_at.is_none());
    }

    #[test]
    fn test_delete_is_owner_only_even_for_team_todos() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        let deploy = engine.create(draft("Deploy", true), &ann).unwrap();

        assert!(matches!(
            engine.delete(deploy.id, &bob),
            Err(TodoApiError::NotFound(_))
        ));
        assert!(engine.toggle_complete(deploy.id, &bob).is_ok());

        assert_eq!(engine.delete(deploy.id, &ann).unwrap().id, deploy.id);
        assert!(engine.list_visible(&ann).unwrap().is_empty());
    }

    #[test]
    fn test_stats_on_empty_set() {
        let (engine, _) = engine();

        let stats = engine.stats(&user("Ann")).unwrap();

        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(!stats.completion_rate.is_nan());
    }

    #[test]
    fn test_stats_over_visible_set() {
        let (engine, _) = engine();
        let ann = user("Ann");
        let bob = user("Bob");

        engine.create(draft("Buy milk", false), &ann).unwrap();
        let deploy = engine
            .create(
                CreateTodoDTO {
                    text: "Deploy".into(),
                    is_team_todo: Some(true),
                    priority: Some(Priority::High),
                    due_date: None,
                },
                &ann,
            )
            .unwrap();
        engine.create(draft("Read book", false), &bob).unwrap();
        engine.toggle_complete(deploy.id, &bob).unwrap();

        let stats = engine.stats(&bob).unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.personal_todos, 1);
        assert_eq!(stats.team_todos, 1);
        assert_eq!(stats.high_priority, 1);
        assert_eq!(stats.completion_rate, 50.0);
    }

    #[test]
    fn test_mutations_are_broadcast() {
        let (engine, broadcaster) = engine();
        let ann = user("Ann");
        let mut events = broadcaster.subscribe();

        let todo = engine.create(draft("Deploy", true), &ann).unwrap();
        let toggled = engine.toggle_complete(todo.id, &ann).unwrap();
        engine.delete(todo.id, &ann).unwrap();

        assert_eq!(*events.try_recv().unwrap(), TodoEvent::Created(todo.clone()));
        assert_eq!(*events.try_recv().unwrap(), TodoEvent::Updated(toggled));
        assert_eq!(*events.try_recv().unwrap(), TodoEvent::deleted(&todo));
    }
}
