use actix_web::{
    body::BoxBody,
    http::{
        self,
        header::{self, HeaderValue},
    },
    HttpResponse, ResponseError,
};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DBError};
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;
use std::convert::From;
use uuid::Error as ParseError;

#[derive(Debug)]
pub enum AuthError {
    Claims(serde_json::Error),
    ///Token is invalid
    InvalidToken,
    NoAuthorizationHeader,
    InvalidAuthorizationHeader,
    TokenExpired,
    /// Email unknown or password mismatch, deliberately indistinguishable
    InvalidCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAuthorizationHeader => {
                write!(f, "Authorization header is not in valid format")
            }
            Self::NoAuthorizationHeader => write!(f, "No Authorization Header"),
            Self::Claims(e) => write!(f, "Error while Deserializing JWT: {}", e),
            Self::InvalidToken => write!(f, "Invalid JWT Token"),
            Self::TokenExpired => write!(f, "Token Expired"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
        }
    }
}

#[derive(Debug, Display)]
pub enum TodoApiError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Database Connection Error")]
    DatabaseConnectionError,

    #[display(fmt = "Storage Error")]
    StorageError,

    #[display(fmt = "{}", _0)]
    AuthError(AuthError),

    #[display(fmt = "{} Not Found", _0)]
    NotFound(String),
}

impl TodoApiError {
    pub fn to_response(&self) -> HttpResponse {
        self.error_response()
    }

    pub fn todo_not_found() -> Self {
        TodoApiError::NotFound("Todo".to_string())
    }
}

impl ResponseError for TodoApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            TodoApiError::AuthError(_) => http::StatusCode::UNAUTHORIZED,
            TodoApiError::BadRequest(_) => http::StatusCode::BAD_REQUEST,
            TodoApiError::NotFound(_) => http::StatusCode::NOT_FOUND,
            TodoApiError::InternalServerError
            | TodoApiError::DatabaseConnectionError
            | TodoApiError::StorageError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let mut res = HttpResponse::new(self.status_code());

        res.headers_mut().append(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        res.set_body(BoxBody::new(json!({"error": self.to_string()}).to_string()))
    }
}

impl From<AuthError> for TodoApiError {
    fn from(err: AuthError) -> Self {
        TodoApiError::AuthError(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.into_kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<ParseError> for TodoApiError {
    fn from(_: ParseError) -> Self {
        TodoApiError::BadRequest("Invalid Todo Id".to_string())
    }
}

impl From<r2d2::Error> for TodoApiError {
    fn from(err: r2d2::Error) -> Self {
        log::error!("Database pool error: {}", err);
        TodoApiError::DatabaseConnectionError
    }
}

impl From<argon2::Error> for TodoApiError {
    fn from(err: argon2::Error) -> Self {
        log::error!("Password hashing failed: {}", err);
        TodoApiError::InternalServerError
    }
}

impl From<DBError> for TodoApiError {
    fn from(error: DBError) -> Self {
        match error {
            DBError::DatabaseError(kind, info) => {
                if let DatabaseErrorKind::UniqueViolation = kind {
                    let message: String =
                        info.details().unwrap_or_else(|| info.message()).to_string();

                    return TodoApiError::BadRequest(message);
                }
                log::error!("Database error: {}", info.message());
                TodoApiError::StorageError
            }
            DBError::NotFound => TodoApiError::todo_not_found(),
            other => {
                log::error!("Database error: {}", other);
                TodoApiError::StorageError
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TodoApiError::todo_not_found().status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            TodoApiError::AuthError(AuthError::NoAuthorizationHeader).status_code(),
            http::StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TodoApiError::BadRequest("bad".into()).status_code(),
            http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TodoApiError::StorageError.status_code(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_message_shape() {
        assert_eq!(TodoApiError::todo_not_found().to_string(), "Todo Not Found");
        assert_eq!(
            TodoApiError::AuthError(AuthError::InvalidCredentials).to_string(),
            "Invalid email or password"
        );
    }
}
