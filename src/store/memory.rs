use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::{IdentityStore, TodoChanges, TodoCounts, TodoRepository, TodoScope};
use crate::{
    api::errors::TodoApiError,
    models::{todo_model::Todo, user_model::User},
};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, TodoApiError> {
    lock.read().map_err(|_| {
        log::error!("In-memory store lock poisoned");
        TodoApiError::StorageError
    })
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, TodoApiError> {
    lock.write().map_err(|_| {
        log::error!("In-memory store lock poisoned");
        TodoApiError::StorageError
    })
}

/// Process-local todo store, used by tests and `TODO_STORE=memory`
#[derive(Debug, Default)]
pub struct MemoryTodoRepository {
    todos: RwLock<HashMap<uuid::Uuid, Todo>>,
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TodoRepository for MemoryTodoRepository {
    fn insert(&self, todo: Todo) -> Result<Todo, TodoApiError> {
        let mut todos = write(&self.todos)?;

        if todos.contains_key(&todo.id) {
            return Err(TodoApiError::BadRequest("Todo already exists".into()));
        }

        todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    fn find_by_id(&self, id: uuid::Uuid, scope: TodoScope) -> Result<Option<Todo>, TodoApiError> {
        let todos = read(&self.todos)?;

        Ok(todos.get(&id).filter(|todo| scope.matches(todo)).cloned())
    }

    fn find_matching(&self, scope: TodoScope) -> Result<Vec<Todo>, TodoApiError> {
        let todos = read(&self.todos)?;

        let mut matching: Vec<Todo> = todos
            .values()
            .filter(|todo| scope.matches(todo))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching)
    }

    fn update_by_id(
        &self,
        id: uuid::Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, TodoApiError> {
        let mut todos = write(&self.todos)?;

        Ok(todos.get_mut(&id).map(|todo| {
            changes.apply_to(todo);
            todo.clone()
        }))
    }

    fn delete_by_id(
        &self,
        id: uuid::Uuid,
        scope: TodoScope,
    ) -> Result<Option<Todo>, TodoApiError> {
        let mut todos = write(&self.todos)?;

        match todos.get(&id) {
            Some(todo) if scope.matches(todo) => Ok(todos.remove(&id)),
            _ => Ok(None),
        }
    }

    fn aggregate(&self, scope: TodoScope) -> Result<TodoCounts, TodoApiError> {
        let todos = read(&self.todos)?;

        let mut counts = TodoCounts::default();
        for todo in todos.values().filter(|todo| scope.matches(todo)) {
            counts.record(todo.completed, todo.is_team_todo, todo.priority);
        }

        Ok(counts)
    }
}

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<uuid::Uuid, User>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn create_user(&self, user: User) -> Result<User, TodoApiError> {
        let mut users = write(&self.users)?;

        if users.values().any(|u| u.email == user.email) {
            return Err(TodoApiError::BadRequest("Email already registered".into()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, TodoApiError> {
        let users = read(&self.users)?;

        Ok(users.values().find(|u| u.email == email).cloned())
    }

    fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<User>, TodoApiError> {
        let users = read(&self.users)?;

        Ok(users.get(&id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, TodoApiError> {
        let users = read(&self.users)?;

        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(all)
    }
}
