use futures::{
    future::{ok, ready, LocalBoxFuture, Ready},
    FutureExt,
};

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    FromRequest, HttpMessage,
};
use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        auth_utils::{decode_token, Claimable},
        errors::{AuthError, TodoApiError},
    },
    config::TOKEN_TTL_DAYS,
    models::user_model::SlimUser,
};

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub id: uuid::Uuid,
    pub email: String,
    pub name: String,
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl<'a> Claimable<'a> for Claims {}

impl From<&SlimUser> for Claims {
    fn from(user: &SlimUser) -> Self {
        Claims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: Utc::now() + chrono::Duration::days(*TOKEN_TTL_DAYS),
        }
    }
}

impl From<Claims> for SlimUser {
    fn from(c: Claims) -> Self {
        SlimUser {
            id: c.id,
            email: c.email,
            name: c.name,
        }
    }
}

/// The caller behind a request that passed `BasicAuth`
pub struct Authenticated(SlimUser);

impl Authenticated {
    pub fn user(&self) -> &SlimUser {
        &self.0
    }
}

/// Implementing `FromRequest` allows to extract the caller
/// from any incoming request where `BasicAuth` middleware is used
impl FromRequest for Authenticated {
    type Error = TodoApiError;
    // Using `Ready` Future as we don't do any
    // async operation in the `from_request` function
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let value = req.extensions().get::<SlimUser>().cloned();

        let result = match value {
            Some(v) => Ok(Authenticated(v)),
            None => Err(TodoApiError::AuthError(AuthError::InvalidToken)),
        };

        futures::future::ready(result)
    }
}

/// Lets handlers read `auth.id`, `auth.name` straight through `Authenticated`
impl std::ops::Deref for Authenticated {
    type Target = SlimUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rejects requests without a valid bearer token before they reach a handler
pub struct BasicAuth;

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Transform<S, ServiceRequest> for BasicAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;

    type Error = actix_web::Error;

    type InitError = ();

    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;

    type Error = actix_web::Error;

    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let decoded = match req.headers().get(AUTHORIZATION) {
            Some(auth_header) => decode_token::<Claims>(auth_header),
            None => Err(AuthError::NoAuthorizationHeader),
        };

        match decoded {
            Ok(claims) => {
                req.extensions_mut().insert::<SlimUser>(claims.into());

                Box::pin(
                    self.service
                        .call(req)
                        .map(|res| res.map(|res| res.map_into_left_body())),
                )
            }
            Err(err) => {
                log::debug!("Rejected {} {}: {}", req.method(), req.path(), err);

                let error = TodoApiError::AuthError(err);

                Box::pin(ready(Ok(
                    req.into_response(error.to_response().map_into_right_body())
                )))
            }
        }
    }
}
