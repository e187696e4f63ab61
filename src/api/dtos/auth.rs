use crate::models::user_model::SlimUser;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SignupRequestDTO {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Returned by both register and login
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuthResponseDTO {
    pub user: SlimUser,
    pub token: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MeResponseDTO {
    pub user: SlimUser,
}
