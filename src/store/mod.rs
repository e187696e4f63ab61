//! Persistence seams for todos and users.
//!
//! Both stores are synchronous; handlers call them from `web::block` the same
//! way they call diesel directly. Every single-record write is atomic at the
//! store, which is the only concurrency guarantee the engine relies on.

mod memory;
mod postgres;

use std::sync::Arc;

use chrono::NaiveDateTime;
use diesel::r2d2::ConnectionManager;
use r2d2::Pool;

pub use memory::{MemoryIdentityStore, MemoryTodoRepository};
pub use postgres::{PgIdentityStore, PgTodoRepository};

use crate::{
    api::errors::TodoApiError,
    config::{self, StoreKind},
    models::{
        todo_model::{Priority, Todo},
        user_model::User,
    },
};

/// Row predicate for todo lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoScope {
    /// Owned by the user, or shared with the team
    Visible(uuid::Uuid),
    /// Owned by the user
    Owned(uuid::Uuid),
}

impl TodoScope {
    pub fn matches(&self, todo: &Todo) -> bool {
        match *self {
            TodoScope::Visible(user_id) => todo.is_visible_to(user_id),
            TodoScope::Owned(user_id) => todo.is_owned_by(user_id),
        }
    }
}

/// Field writes for a single todo. `None` leaves the stored value alone.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the due date
    pub due_date: Option<Option<NaiveDateTime>>,
    pub last_completed_by: Option<String>,
    pub last_completed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl TodoChanges {
    pub fn stamped(updated_at: NaiveDateTime) -> Self {
        Self {
            text: None,
            completed: None,
            priority: None,
            due_date: None,
            last_completed_by: None,
            last_completed_at: None,
            updated_at,
        }
    }

    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(text) = &self.text {
            todo.text = text.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(by) = &self.last_completed_by {
            todo.last_completed_by = Some(by.clone());
        }
        if let Some(at) = self.last_completed_at {
            todo.last_completed_at = Some(at);
        }
        todo.updated_at = self.updated_at;
    }
}

/// Raw counters behind the stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: u64,
    pub completed: u64,
    pub personal: u64,
    pub team: u64,
    pub high_priority: u64,
}

impl TodoCounts {
    pub fn record(&mut self, completed: bool, is_team_todo: bool, priority: Priority) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
        if is_team_todo {
            self.team += 1;
        } else {
            self.personal += 1;
        }
        if priority == Priority::High {
            self.high_priority += 1;
        }
    }
}

pub trait TodoRepository: Send + Sync {
    fn insert(&self, todo: Todo) -> Result<Todo, TodoApiError>;

    fn find_by_id(&self, id: uuid::Uuid, scope: TodoScope) -> Result<Option<Todo>, TodoApiError>;

    /// All todos in scope, newest first
    fn find_matching(&self, scope: TodoScope) -> Result<Vec<Todo>, TodoApiError>;

    /// Writes `changes` to one record. Last write wins.
    fn update_by_id(
        &self,
        id: uuid::Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, TodoApiError>;

    /// Removes the record if it is in scope and hands back what was removed
    fn delete_by_id(&self, id: uuid::Uuid, scope: TodoScope)
        -> Result<Option<Todo>, TodoApiError>;

    fn aggregate(&self, scope: TodoScope) -> Result<TodoCounts, TodoApiError>;
}

pub trait IdentityStore: Send + Sync {
    /// Fails with `BadRequest` when the email is taken
    fn create_user(&self, user: User) -> Result<User, TodoApiError>;

    fn find_by_email(&self, email: &str) -> Result<Option<User>, TodoApiError>;

    fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<User>, TodoApiError>;

    fn list_users(&self) -> Result<Vec<User>, TodoApiError>;
}

pub struct Stores {
    pub todos: Arc<dyn TodoRepository>,
    pub identities: Arc<dyn IdentityStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            todos: Arc::new(MemoryTodoRepository::new()),
            identities: Arc::new(MemoryIdentityStore::new()),
        }
    }
}

/// Builds the stores selected by `TODO_STORE`
pub fn build_stores() -> Result<Stores, String> {
    match config::store_kind() {
        StoreKind::Memory => {
            log::warn!("Using the in-memory store, nothing will survive a restart");
            Ok(Stores::in_memory())
        }
        StoreKind::Postgres => {
            let database_url =
                config::database_url().ok_or_else(|| "DATABASE_URL must be set".to_string())?;

            let manager = ConnectionManager::<diesel::PgConnection>::new(database_url);

            let pool = Pool::builder()
                .build(manager)
                .map_err(|e| format!("Failed to connect to PG database: {}", e))?;

            Ok(Stores {
                todos: Arc::new(PgTodoRepository::new(pool.clone())),
                identities: Arc::new(PgIdentityStore::new(pool)),
            })
        }
    }
}
