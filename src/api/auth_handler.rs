use actix_web::{route, web, HttpResponse};

use crate::{
    api::{
        auth_utils::{encode_token, hash_password, verify_hash},
        errors::AuthError,
        middlewares::auth::{Authenticated, Claims},
    },
    models::user_model::{SlimUser, User},
    store::IdentityStore,
};

use super::{
    dtos::{
        auth::{AuthResponseDTO, LoginDTO, MeResponseDTO, SignupRequestDTO},
        todo::MessageDTO,
    },
    errors::TodoApiError,
};

#[route("/login", method = "POST")]
/// Login a user
pub async fn login(
    request_data: web::Json<LoginDTO>,
    identities: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, actix_web::Error> {
    let response =
        web::block(move || check_credentials(identities, request_data.into_inner())).await??;

    Ok(HttpResponse::Ok().json(&response))
}

#[route("/register", method = "POST")]
pub async fn register(
    request_data: web::Json<SignupRequestDTO>,
    identities: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, actix_web::Error> {
    let response =
        web::block(move || insert_new_user(identities, request_data.into_inner())).await??;

    Ok(HttpResponse::Created().json(&response))
}

/// Current user, re-read from the store so deleted accounts stop working
pub async fn me(
    auth: Authenticated,
    identities: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, actix_web::Error> {
    let user_id = auth.id;

    let user = web::block(move || identities.find_by_id(user_id))
        .await??
        .ok_or_else(|| TodoApiError::NotFound("User".to_string()))?;

    Ok(HttpResponse::Ok().json(MeResponseDTO { user: user.into() }))
}

/// Tokens are stateless, so there is nothing to revoke; the client drops its copy
pub async fn logout(auth: Authenticated) -> HttpResponse {
    log::info!("User {} logged out", auth.id);

    HttpResponse::Ok().json(MessageDTO::new("Logged out successfully"))
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn issue_token(user: SlimUser) -> Result<AuthResponseDTO, TodoApiError> {
    let token = encode_token::<Claims>(&user).map_err(|e| {
        log::error!("Failed to sign token for {}: {}", user.id, e);
        TodoApiError::InternalServerError
    })?;

    Ok(AuthResponseDTO { user, token })
}

/// Email + password check. Unknown email and wrong password look the same.
fn check_credentials(
    identities: web::Data<dyn IdentityStore>,
    user_data: LoginDTO,
) -> Result<AuthResponseDTO, TodoApiError> {
    let found = identities.find_by_email(&normalize_email(&user_data.email))?;

    match found {
        Some(user) if verify_hash(&user.password, &user_data.password)? => {
            log::info!("User {} logged in", user.id);
            issue_token(user.into())
        }
        _ => Err(TodoApiError::AuthError(AuthError::InvalidCredentials)),
    }
}

fn validate_signup(user_data: &SignupRequestDTO) -> Result<(), TodoApiError> {
    if user_data.name.trim().is_empty() {
        return Err(TodoApiError::BadRequest("Name is required".into()));
    }

    let email = normalize_email(&user_data.email);
    if email.is_empty() || !email.contains('@') {
        return Err(TodoApiError::BadRequest("A valid email is required".into()));
    }

    if user_data.password.is_empty() {
        return Err(TodoApiError::BadRequest("Password is required".into()));
    }

    Ok(())
}

/// Store a new user and log them straight in
fn insert_new_user(
    identities: web::Data<dyn IdentityStore>,
    user_data: SignupRequestDTO,
) -> Result<AuthResponseDTO, TodoApiError> {
    validate_signup(&user_data)?;

    let hashed = hash_password(&user_data.password)?;

    let new_user = User::from_details(
        user_data.name.trim().to_string(),
        normalize_email(&user_data.email),
        hashed,
    );

    let stored = identities.create_user(new_user)?;

    log::info!("Registered user {}", stored.id);

    issue_token(stored.into())
}
