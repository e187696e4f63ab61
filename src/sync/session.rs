use crate::{
    models::{
        todo_model::{next_update_stamp, Todo},
        user_model::SlimUser,
    },
    realtime::DeletedTodo,
};

use super::sse::SseFrame;

/// A broadcast as the client receives it
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Created(Todo),
    Updated(Todo),
    Deleted(uuid::Uuid),
}

impl RemoteEvent {
    /// Parses a server-sent frame. Unknown event names yield `None`.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>, serde_json::Error> {
        let event = match frame.event.as_str() {
            "newTodo" => RemoteEvent::Created(serde_json::from_str(&frame.data)?),
            "updateTodo" => RemoteEvent::Updated(serde_json::from_str(&frame.data)?),
            "deleteTodo" => {
                let deleted: DeletedTodo = serde_json::from_str(&frame.data)?;
                RemoteEvent::Deleted(deleted.id)
            }
            _ => return Ok(None),
        };

        Ok(Some(event))
    }
}

/// Local view of one logged-in user's todos.
///
/// Created when login succeeds and ended on logout; nothing survives it.
#[derive(Debug)]
pub struct SyncSession {
    user: SlimUser,
    todos: Vec<Todo>,
}

impl SyncSession {
    pub fn start(user: SlimUser) -> Self {
        log::debug!("Sync session started for {}", user.id);

        Self {
            user,
            todos: Vec::new(),
        }
    }

    /// Tears the session down, dropping the local copy
    pub fn end(self) {
        log::debug!(
            "Sync session for {} ended with {} todos cached",
            self.user.id,
            self.todos.len()
        );
    }

    pub fn user(&self) -> &SlimUser {
        &self.user
    }

    /// Newest first
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: uuid::Uuid) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Todos the user owns
    pub fn mine(&self) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|todo| todo.is_owned_by(self.user.id))
            .collect()
    }

    /// Team todos owned by somebody else
    pub fn team(&self) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|todo| !todo.is_owned_by(self.user.id))
            .collect()
    }

    /// Replaces the local set with a full fetch from the server
    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        let user_id = self.user.id;

        self.todos = todos
            .into_iter()
            .filter(|todo| todo.is_visible_to(user_id))
            .collect();
        self.sort();
    }

    /// Reconciles one event. Returns whether the local set changed.
    pub fn apply(&mut self, event: RemoteEvent) -> bool {
        let changed = match event {
            RemoteEvent::Created(todo) => {
                if !todo.is_visible_to(self.user.id) || self.position(todo.id).is_some() {
                    false
                } else {
                    self.todos.push(todo);
                    true
                }
            }
            RemoteEvent::Updated(todo) => {
                if !todo.is_visible_to(self.user.id) {
                    false
                } else {
                    match self.position(todo.id) {
                        Some(index) if self.todos[index] == todo => false,
                        Some(index) => {
                            self.todos[index] = todo;
                            true
                        }
                        // a creation we never heard about
                        None => {
                            self.todos.push(todo);
                            true
                        }
                    }
                }
            }
            RemoteEvent::Deleted(id) => match self.position(id) {
                Some(index) => {
                    self.todos.remove(index);
                    true
                }
                None => false,
            },
        };

        if changed {
            self.sort();
        }

        changed
    }

    /// Flips completion locally before the server confirms. Returns the
    /// previous version for [`SyncSession::restore`].
    pub fn optimistic_toggle(&mut self, id: uuid::Uuid) -> Option<Todo> {
        let index = self.position(id)?;
        let previous = self.todos[index].clone();

        let todo = &mut self.todos[index];
        todo.completed = !todo.completed;
        todo.updated_at = next_update_stamp(todo.updated_at);

        if todo.is_team_todo {
            todo.last_completed_by = Some(self.user.name.clone());
            todo.last_completed_at = Some(todo.updated_at);
        }

        Some(previous)
    }

    /// Puts back a version saved before an optimistic change that the
    /// server rejected. A todo deleted in the meantime stays deleted.
    pub fn restore(&mut self, previous: Todo) {
        if let Some(index) = self.position(previous.id) {
            self.todos[index] = previous;
            self.sort();
        }
    }

    fn position(&self, id: uuid::Uuid) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }

    fn sort(&mut self) {
        self.todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;
    use crate::{
        models::todo_model::Priority,
        realtime::TodoEvent,
    };

    fn user(name: &str) -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn todo(owner: &SlimUser, text: &str, team: bool) -> Todo {
        Todo::new_for(owner, text.into(), Priority::Normal, team, None)
    }

    #[test]
    fn test_mine_and_team_views() {
        let ann = user("Ann");
        let bob = user("Bob");
        let mut session = SyncSession::start(ann.clone());

        session.replace_all(vec![
            todo(&ann, "Buy milk", false),
            todo(&ann, "Deploy", true),
            todo(&bob, "Review", true),
            todo(&bob, "Bob's secret", false),
        ]);

        let mine: Vec<&str> = session.mine().iter().map(|t| t.text.as_str()).collect();
        let team: Vec<&str> = session.team().iter().map(|t| t.text.as_str()).collect();

        assert_eq!(mine.len(), 2);
        assert!(mine.contains(&"Buy milk") && mine.contains(&"Deploy"));
        assert_eq!(team, vec!["Review"]);
    }

    #[test]
    fn test_create_is_deduplicated() {
        let ann = user("Ann");
        let mut session = SyncSession::start(ann.clone());
        let deploy = todo(&ann, "Deploy", true);

        session.replace_all(vec![deploy.clone()]);

        assert!(!session.apply(RemoteEvent::Created(deploy)));
        assert_eq!(session.todos().len(), 1);
    }

    #[test]
    fn test_update_is_idempotent_and_upserts() {
        let ann = user("Ann");
        let bob = user("Bob");
        let mut session = SyncSession::start(bob);

        let mut deploy = todo(&ann, "Deploy", true);
        assert!(session.apply(RemoteEvent::Updated(deploy.clone())));

        deploy.completed = true;
        assert!(session.apply(RemoteEvent::Updated(deploy.clone())));
        let once: Vec<Todo> = session.todos().to_vec();

        assert!(!session.apply(RemoteEvent::Updated(deploy)));
        assert_eq!(session.todos(), once.as_slice());
    }

    #[test]
    fn test_delete_of_unknown_id_is_noop() {
        let mut session = SyncSession::start(user("Ann"));

        assert!(!session.apply(RemoteEvent::Deleted(uuid::Uuid::new_v4())));
    }

    #[test]
    fn test_events_for_invisible_todos_are_ignored() {
        let ann = user("Ann");
        let bob = user("Bob");
        let mut session = SyncSession::start(bob);

        assert!(!session.apply(RemoteEvent::Created(todo(&ann, "Buy milk", false))));
        assert!(session.todos().is_empty());
    }

    #[test]
    fn test_sorted_newest_first() {
        let ann = user("Ann");
        let mut session = SyncSession::start(ann.clone());

        let mut older = todo(&ann, "older", false);
        older.created_at = older.created_at - Duration::minutes(5);
        let newer = todo(&ann, "newer", false);

        session.apply(RemoteEvent::Created(older));
        session.apply(RemoteEvent::Created(newer));

        assert_eq!(session.todos()[0].text, "newer");
        assert_eq!(session.todos()[1].text, "older");
    }

    #[test]
    fn test_optimistic_toggle_and_restore() {
        let ann = user("Ann");
        let bob = user("Bob");
        let mut session = SyncSession::start(bob);
        let deploy = todo(&ann, "Deploy", true);
        session.replace_all(vec![deploy.clone()]);

        let previous = session.optimistic_toggle(deploy.id).unwrap();
        let toggled = session.get(deploy.id).unwrap();
        assert!(toggled.completed);
        assert_eq!(toggled.last_completed_by.as_deref(), Some("Bob"));

        session.restore(previous);
        assert_eq!(session.get(deploy.id), Some(&deploy));
    }

    #[test]
    fn test_frames_from_the_server_reconcile() {
        let ann = user("Ann");
        let mut session = SyncSession::start(ann.clone());
        let deploy = todo(&ann, "Deploy", true);

        for server_event in [TodoEvent::Created(deploy.clone()), TodoEvent::deleted(&deploy)] {
            let raw = server_event.to_sse_frame().unwrap();
            let mut decoder = crate::sync::SseDecoder::new();
            let frame = raw
                .lines()
                .find_map(|line| decoder.push_line(line))
                .unwrap();

            let event = RemoteEvent::from_frame(&frame).unwrap().unwrap();
            assert!(session.apply(event));
        }

        assert!(session.todos().is_empty());
    }

    #[test]
    fn test_unknown_frame_is_skipped() {
        let frame = SseFrame {
            event: "message".into(),
            data: "{}".into(),
        };

        assert_eq!(RemoteEvent::from_frame(&frame).unwrap(), None);
    }
}
