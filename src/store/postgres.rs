use chrono::NaiveDateTime;
use diesel::pg::Pg;
use diesel::prelude::*;

use super::{IdentityStore, TodoChanges, TodoCounts, TodoRepository, TodoScope};
use crate::{
    api::errors::TodoApiError,
    models::{
        todo_model::{Priority, Todo},
        user_model::User,
        Pool,
    },
    schema::todos,
};

#[derive(Debug, Clone, Insertable, Queryable)]
#[table_name = "todos"]
struct TodoRow {
    id: uuid::Uuid,
    text: String,
    completed: bool,
    priority: String,
    owner_id: uuid::Uuid,
    owner_name: String,
    is_team_todo: bool,
    last_completed_by: Option<String>,
    last_completed_at: Option<NaiveDateTime>,
    due_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[table_name = "todos"]
struct TodoRowChanges {
    text: Option<String>,
    completed: Option<bool>,
    priority: Option<String>,
    due_date: Option<Option<NaiveDateTime>>,
    last_completed_by: Option<String>,
    last_completed_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

fn parse_priority(raw: &str) -> Priority {
    raw.parse().unwrap_or_else(|e| {
        log::warn!("{} in stored todo, treating as normal", e);
        Priority::Normal
    })
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            priority: parse_priority(&row.priority),
            id: row.id,
            text: row.text,
            completed: row.completed,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            is_team_todo: row.is_team_todo,
            last_completed_by: row.last_completed_by,
            last_completed_at: row.last_completed_at,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Todo> for TodoRow {
    fn from(todo: &Todo) -> Self {
        TodoRow {
            id: todo.id,
            text: todo.text.clone(),
            completed: todo.completed,
            priority: todo.priority.as_str().to_string(),
            owner_id: todo.owner_id,
            owner_name: todo.owner_name.clone(),
            is_team_todo: todo.is_team_todo,
            last_completed_by: todo.last_completed_by.clone(),
            last_completed_at: todo.last_completed_at,
            due_date: todo.due_date,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

impl From<TodoChanges> for TodoRowChanges {
    fn from(changes: TodoChanges) -> Self {
        TodoRowChanges {
            text: changes.text,
            completed: changes.completed,
            priority: changes.priority.map(|p| p.as_str().to_string()),
            due_date: changes.due_date,
            last_completed_by: changes.last_completed_by,
            last_completed_at: changes.last_completed_at,
            updated_at: changes.updated_at,
        }
    }
}

/// Boxed `todos` query narrowed to `scope`
fn scoped<'a>(scope: TodoScope) -> todos::BoxedQuery<'a, Pg> {
    use crate::schema::todos::dsl::*;

    match scope {
        TodoScope::Visible(user) => todos
            .filter(owner_id.eq(user).or(is_team_todo.eq(true)))
            .into_boxed(),
        TodoScope::Owned(user) => todos.filter(owner_id.eq(user)).into_boxed(),
    }
}

pub struct PgTodoRepository {
    pool: Pool,
}

impl PgTodoRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl TodoRepository for PgTodoRepository {
    fn insert(&self, todo: Todo) -> Result<Todo, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let inserted: TodoRow = diesel::insert_into(todos)
            .values(&TodoRow::from(&todo))
            .get_result(conn)?;

        Ok(inserted.into())
    }

    fn find_by_id(&self, todo_id: uuid::Uuid, scope: TodoScope) -> Result<Option<Todo>, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let found = scoped(scope)
            .filter(id.eq(todo_id))
            .first::<TodoRow>(conn)
            .optional()?;

        Ok(found.map(Todo::from))
    }

    fn find_matching(&self, scope: TodoScope) -> Result<Vec<Todo>, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let rows = scoped(scope)
            .order(created_at.desc())
            .load::<TodoRow>(conn)?;

        Ok(rows.into_iter().map(Todo::from).collect())
    }

    fn update_by_id(
        &self,
        todo_id: uuid::Uuid,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let updated = diesel::update(todos.find(todo_id))
            .set(&TodoRowChanges::from(changes))
            .get_result::<TodoRow>(conn)
            .optional()?;

        Ok(updated.map(Todo::from))
    }

    fn delete_by_id(
        &self,
        todo_id: uuid::Uuid,
        scope: TodoScope,
    ) -> Result<Option<Todo>, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let deleted = match scope {
            TodoScope::Owned(user) => {
                diesel::delete(todos.filter(id.eq(todo_id)).filter(owner_id.eq(user)))
                    .get_result::<TodoRow>(conn)
                    .optional()?
            }
            TodoScope::Visible(user) => diesel::delete(
                todos
                    .filter(id.eq(todo_id))
                    .filter(owner_id.eq(user).or(is_team_todo.eq(true))),
            )
            .get_result::<TodoRow>(conn)
            .optional()?,
        };

        Ok(deleted.map(Todo::from))
    }

    fn aggregate(&self, scope: TodoScope) -> Result<TodoCounts, TodoApiError> {
        use crate::schema::todos::dsl::*;

        let conn = &self.pool.get()?;

        let rows = scoped(scope)
            .select((completed, is_team_todo, priority))
            .load::<(bool, bool, String)>(conn)?;

        let mut counts = TodoCounts::default();
        for (done, team, raw_priority) in rows {
            counts.record(done, team, parse_priority(&raw_priority));
        }

        Ok(counts)
    }
}

pub struct PgIdentityStore {
    pool: Pool,
}

impl PgIdentityStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl IdentityStore for PgIdentityStore {
    fn create_user(&self, new_user: User) -> Result<User, TodoApiError> {
        use crate::schema::users::dsl::*;

        let conn = &self.pool.get()?;

        let existing = users
            .filter(email.eq(&new_user.email))
            .first::<User>(conn)
            .optional()?;

        if existing.is_some() {
            return Err(TodoApiError::BadRequest("Email already registered".into()));
        }

        let inserted: User = diesel::insert_into(users)
            .values(&new_user)
            .get_result(conn)?;

        Ok(inserted)
    }

    fn find_by_email(&self, user_email: &str) -> Result<Option<User>, TodoApiError> {
        use crate::schema::users::dsl::*;

        let conn = &self.pool.get()?;

        Ok(users
            .filter(email.eq(user_email))
            .first::<User>(conn)
            .optional()?)
    }

    fn find_by_id(&self, user_id: uuid::Uuid) -> Result<Option<User>, TodoApiError> {
        use crate::schema::users::dsl::*;

        let conn = &self.pool.get()?;

        Ok(users.find(user_id).first::<User>(conn).optional()?)
    }

    fn list_users(&self) -> Result<Vec<User>, TodoApiError> {
        use crate::schema::users::dsl::*;

        let conn = &self.pool.get()?;

        Ok(users.order(created_at.asc()).load::<User>(conn)?)
    }
}
