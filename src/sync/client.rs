use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    api::dtos::{
        auth::{AuthResponseDTO, LoginDTO, MeResponseDTO, SignupRequestDTO},
        todo::{CreateTodoDTO, MessageDTO, UpdateTodoDTO},
    },
    errors::TodoError,
    models::{
        todo_model::{StatsSummary, Todo},
        user_model::SlimUser,
    },
    utils::{load_credentials, make_api_url, Credentials},
};

/// Blocking HTTP client for the todo API
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn anonymous() -> Self {
        Self {
            http: Client::new(),
            token: None,
        }
    }

    pub fn with_token(token: String) -> Self {
        Self {
            http: Client::new(),
            token: Some(token),
        }
    }

    /// Client for the user saved by the last login
    pub fn from_saved_credentials() -> Result<(Self, Credentials), TodoError> {
        let credentials = load_credentials().map_err(|e| {
            log::debug!("No usable credentials: {}", e);
            TodoError::NotLoggedIn
        })?;

        Ok((Self::with_token(credentials.token.clone()), credentials))
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, make_api_url(resource))
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        request
    }

    fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TodoError> {
        let response = request.send()?;

        Ok(handle_response(response)?.json::<T>()?)
    }

    pub fn register(&self, details: &SignupRequestDTO) -> Result<AuthResponseDTO, TodoError> {
        Self::send(self.request(Method::POST, "auth/register").json(details))
    }

    pub fn login(&self, details: &LoginDTO) -> Result<AuthResponseDTO, TodoError> {
        Self::send(self.request(Method::POST, "auth/login").json(details))
    }

    pub fn me(&self) -> Result<SlimUser, TodoError> {
        let me: MeResponseDTO = Self::send(self.request(Method::GET, "auth/me"))?;
        Ok(me.user)
    }

    pub fn logout(&self) -> Result<MessageDTO, TodoError> {
        Self::send(self.request(Method::POST, "auth/logout"))
    }

    pub fn list_todos(&self) -> Result<Vec<Todo>, TodoError> {
        Self::send(self.request(Method::GET, "todos"))
    }

    pub fn list_my_todos(&self) -> Result<Vec<Todo>, TodoError> {
        Self::send(self.request(Method::GET, "todos/my"))
    }

    pub fn create_todo(&self, draft: &CreateTodoDTO) -> Result<Todo, TodoError> {
        Self::send(self.request(Method::POST, "todos").json(draft))
    }

    pub fn update_todo(&self, id: uuid::Uuid, patch: &UpdateTodoDTO) -> Result<Todo, TodoError> {
        Self::send(
            self.request(Method::PATCH, &format!("todos/{}", id))
                .json(patch),
        )
    }

    pub fn toggle_todo(&self, id: uuid::Uuid) -> Result<Todo, TodoError> {
        Self::send(self.request(Method::PATCH, &format!("todos/{}/toggle", id)))
    }

    pub fn delete_todo(&self, id: uuid::Uuid) -> Result<MessageDTO, TodoError> {
        Self::send(self.request(Method::DELETE, &format!("todos/{}", id)))
    }

    pub fn stats(&self) -> Result<StatsSummary, TodoError> {
        Self::send(self.request(Method::GET, "todos/stats"))
    }

    /// Opens the event stream. The response body is read line by line for
    /// as long as the server keeps it open, so no read timeout applies.
    pub fn open_event_stream(&self) -> Result<Response, TodoError> {
        let streaming = Client::builder()
            .timeout(Option::<std::time::Duration>::None)
            .build()?;

        let mut request = streaming
            .get(make_api_url("events"))
            .header(ACCEPT, "text/event-stream");

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        handle_response(request.send()?)
    }
}

/// Turns non-2xx responses into `TodoError::ApiError` using the `{error}` body
fn handle_response(response: Response) -> Result<Response, TodoError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    Err(TodoError::ApiError {
        status: status.as_u16(),
        message,
    })
}
