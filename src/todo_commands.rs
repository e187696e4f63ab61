use anyhow::anyhow;
use chrono::Duration;
use inquire::Text;

use crate::{
    api::dtos::{
        auth::{LoginDTO, SignupRequestDTO},
        todo::{CreateTodoDTO, UpdateTodoDTO},
    },
    errors::TodoError,
    models::todo_model::{self, Priority, Todo},
    store::build_stores,
    sync::ApiClient,
    ui::todo_list_renderer::render_todo_board,
    utils::{clear_credentials, save_credentials, Credentials},
};

/// Options for `create`, straight from the command line
#[derive(Debug, Default)]
pub struct NewTodoOptions {
    pub text: Option<String>,
    pub team: bool,
    pub priority: Option<Priority>,
    pub due_in_hours: Option<i64>,
}

fn parse_id(raw: &str) -> anyhow::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| anyhow!("'{}' is not a valid todo id", raw))
}

/// Adds a hint for the errors a user can act on
fn explain(e: TodoError) -> anyhow::Error {
    if e.is_unauthorized() {
        anyhow!("{}. Log in again with `team-todo login`", e)
    } else if e.is_not_found() {
        anyhow!("No such todo, or you are not allowed to change it")
    } else {
        e.into()
    }
}

fn remember(credentials: Credentials) -> anyhow::Result<()> {
    save_credentials(&credentials).map_err(|e| anyhow!("Could not save credentials: {}", e))
}

pub fn signup(name: String, email: String, password: String) -> anyhow::Result<()> {
    let response = ApiClient::anonymous().register(&SignupRequestDTO {
        name,
        email,
        password,
    })?;

    println!("Signup Successful, welcome {}", response.user.name);

    remember(Credentials {
        token: response.token,
        user: response.user,
    })?;

    println!("You are now logged in");

    Ok(())
}

pub fn login(email: String, password: String) -> anyhow::Result<()> {
    let response = ApiClient::anonymous().login(&LoginDTO { email, password })?;

    let name = response.user.name.clone();

    remember(Credentials {
        token: response.token,
        user: response.user,
    })?;

    println!("You are now logged in as {}", name);

    Ok(())
}

pub fn logout() -> anyhow::Result<()> {
    match ApiClient::from_saved_credentials() {
        Ok((client, _)) => {
            if let Err(e) = client.logout() {
                log::debug!("Server logout failed: {}", e);
            }
        }
        Err(_) => {
            println!("Not logged in");
            return Ok(());
        }
    }

    clear_credentials().map_err(|e| anyhow!("Could not remove credentials: {}", e))?;

    println!("Logged out");

    Ok(())
}

pub fn me() -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let user = client.me()?;

    println!("{} <{}>", user.name, user.email);
    println!("id: {}", user.id);

    Ok(())
}

/// One todo per line: id, mark, priority, text, then owner and due details
fn format_todo_line(todo: &Todo, now: chrono::NaiveDateTime) -> String {
    let mut line = format!(
        "{} [{}] {:<6} {}",
        todo.id,
        if todo.completed { "x" } else { " " },
        todo.priority.as_str(),
        todo.text
    );

    if todo.is_team_todo {
        line.push_str(&format!("  (team, by {})", todo.owner_name));
    }

    if let Some(status) = todo.due_status(now) {
        line.push_str(&format!("  [{}]", status.label()));
    }

    if let Some(who) = &todo.last_completed_by {
        line.push_str(&format!("  last completed by {}", who));
    }

    line
}

pub fn list_todos(mine_only: bool) -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let todos = if mine_only {
        client.list_my_todos()?
    } else {
        client.list_todos()?
    };

    if todos.is_empty() {
        println!("No todos yet");
        return Ok(());
    }

    let now = todo_model::now();

    for todo in &todos {
        println!("{}", format_todo_line(todo, now));
    }

    Ok(())
}

/// Prompt user to create new todo
pub fn create_new_todo(options: NewTodoOptions) -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let text = match options.text {
        Some(text) => text,
        None => Text::new("Text")
            .with_help_message("What needs doing?")
            .prompt()?,
    };

    let text = todo_model::normalize_text(&text).map_err(|e| anyhow!(e))?;

    let due_date = options
        .due_in_hours
        .map(|hours| todo_model::now() + Duration::hours(hours));

    let todo = client.create_todo(&CreateTodoDTO {
        text,
        priority: options.priority,
        is_team_todo: Some(options.team),
        due_date,
    })?;

    println!("Created {}", format_todo_line(&todo, todo_model::now()));

    Ok(())
}

pub fn toggle_todo(id: &str) -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let todo = client.toggle_todo(parse_id(id)?).map_err(explain)?;

    println!("{}", format_todo_line(&todo, todo_model::now()));

    Ok(())
}

pub fn edit_todo(id: &str, patch: UpdateTodoDTO) -> anyhow::Result<()> {
    if patch == UpdateTodoDTO::default() {
        return Err(anyhow!("Nothing to change, pass --text, --priority or --completed"));
    }

    let (client, _) = ApiClient::from_saved_credentials()?;

    let todo = client
        .update_todo(parse_id(id)?, &patch)
        .map_err(explain)?;

    println!("{}", format_todo_line(&todo, todo_model::now()));

    Ok(())
}

pub fn delete_todo(id: &str) -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let response = client.delete_todo(parse_id(id)?).map_err(explain)?;

    println!("{}", response.message);

    Ok(())
}

pub fn show_stats() -> anyhow::Result<()> {
    let (client, _) = ApiClient::from_saved_credentials()?;

    let stats = client.stats()?;

    println!("Total:          {}", stats.total);
    println!("Completed:      {}", stats.completed);
    println!("Pending:        {}", stats.pending);
    println!("Personal:       {}", stats.personal_todos);
    println!("Team:           {}", stats.team_todos);
    println!("High priority:  {}", stats.high_priority);
    println!("Completion:     {:.1}%", stats.completion_rate);

    Ok(())
}

/// Live board of everything the saved user can see
pub fn watch() -> anyhow::Result<()> {
    let (client, credentials) = ApiClient::from_saved_credentials()?;

    // fail before touching the terminal if the token is stale
    let user = client.me().map_err(explain)?;
    if user.id != credentials.user.id {
        log::warn!("Saved credentials belong to a different user than the token");
    }

    render_todo_board(client, user)
}

/// Admin listing of registered users, read straight from the store
pub fn list_users() -> anyhow::Result<()> {
    let stores = build_stores().map_err(|e| anyhow!(e))?;

    let users = stores
        .identities
        .list_users()
        .map_err(|e| anyhow!("Could not read users: {}", e))?;

    if users.is_empty() {
        println!("No users found");
        return Ok(());
    }

    for user in users {
        println!(
            "{}  {:<24} {:<32} joined {}",
            user.id,
            user.name,
            user.email,
            user.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::user_model::SlimUser;

    fn ann() -> SlimUser {
        SlimUser {
            id: uuid::Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
        }
    }

    #[test]
    fn test_parse_id() {
        let id = uuid::Uuid::new_v4();

        assert_eq!(parse_id(&format!(" {} ", id)).unwrap(), id);
        assert!(parse_id("not-an-id").is_err());
    }

    #[test]
    fn test_format_personal_line() {
        let todo = Todo::new_for(&ann(), "Buy milk".into(), Priority::High, false, None);

        assert_eq!(
            format_todo_line(&todo, todo.created_at),
            format!("{} [ ] high   Buy milk", todo.id)
        );
    }

    #[test]
    fn test_format_team_line_with_due_status() {
        let now = todo_model::now();
        let mut todo = Todo::new_for(
            &ann(),
            "Deploy".into(),
            Priority::Normal,
            true,
            Some(now + Duration::days(3)),
        );
        todo.last_completed_by = Some("Bob".into());

        assert_eq!(
            format_todo_line(&todo, now),
            format!(
                "{} [ ] normal Deploy  (team, by Ann)  [upcoming]  last completed by Bob",
                todo.id
            )
        );
    }

    #[test]
    fn test_explain_adds_hints() {
        let unauthorized = explain(TodoError::ApiError {
            status: 401,
            message: "Token expired".into(),
        });
        assert!(unauthorized.to_string().ends_with("team-todo login`"));

        let missing = explain(TodoError::ApiError {
            status: 404,
            message: "Todo Not Found".into(),
        });
        assert!(missing.to_string().starts_with("No such todo"));

        let other = explain(TodoError::HttpError("refused".into()));
        assert_eq!(other.to_string(), "Request failed: refused");
    }

    #[test]
    fn test_empty_edit_is_rejected_locally() {
        let err = edit_todo("whatever", UpdateTodoDTO::default()).unwrap_err();

        assert!(err.to_string().starts_with("Nothing to change"));
    }
}
