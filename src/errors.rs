use std::fmt::Display;

/// Failures seen by the command line client
#[derive(Debug)]
pub enum TodoError {
    /// The server answered with an error body
    ApiError { status: u16, message: String },
    HttpError(String),
    DecodeError(String),
    NotLoggedIn,
}

impl TodoError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TodoError::ApiError { status: 401, .. } | TodoError::NotLoggedIn)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TodoError::ApiError { status: 404, .. })
    }
}

impl Display for TodoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiError { status, message } => {
                write!(f, "Server returned {}: {}", status, message)
            }
            Self::HttpError(e) => {
                write!(f, "Request failed: {}", e)
            }
            Self::DecodeError(e) => {
                write!(f, "Unexpected response: {}", e)
            }
            Self::NotLoggedIn => {
                write!(f, "Not logged in, run `team-todo login` first")
            }
        }
    }
}

impl From<reqwest::Error> for TodoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TodoError::DecodeError(e.to_string())
        } else {
            TodoError::HttpError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(e: serde_json::Error) -> Self {
        TodoError::DecodeError(e.to_string())
    }
}

impl std::error::Error for TodoError {}
