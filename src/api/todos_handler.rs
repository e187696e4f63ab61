use actix_web::{web, HttpResponse};

use super::dtos::todo::{CreateTodoDTO, MessageDTO, UpdateTodoDTO};
use super::errors::TodoApiError;
use super::middlewares::auth::Authenticated;
use super::todo_engine::TodoEngine;

fn parse_todo_id(raw: &str) -> Result<uuid::Uuid, TodoApiError> {
    Ok(uuid::Uuid::parse_str(raw)?)
}

/// Create a new todo owned by the caller
pub async fn create_todo(
    request_data: web::Json<CreateTodoDTO>,
    engine: web::Data<TodoEngine>,
    auth: Authenticated,
) -> Result<HttpResponse, actix_web::Error> {
    let inserted =
        web::block(move || engine.create(request_data.into_inner(), auth.user())).await??;

    Ok(HttpResponse::Created().json(&inserted))
}

/// Every todo the caller can see: their own plus all team todos
pub async fn get_todos(
    auth: Authenticated,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let list = web::block(move || engine.list_visible(auth.user())).await??;

    Ok(HttpResponse::Ok().json(&list))
}

/// Only the caller's own todos
pub async fn get_my_todos(
    auth: Authenticated,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let list = web::block(move || engine.list_owned(auth.user())).await??;

    Ok(HttpResponse::Ok().json(&list))
}

pub async fn update_todo(
    auth: Authenticated,
    params: web::Path<String>,
    request_data: web::Json<UpdateTodoDTO>,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let todo_id = parse_todo_id(&params.into_inner())?;

    let updated = web::block(move || {
        engine.update(todo_id, request_data.into_inner(), auth.user())
    })
    .await??;

    Ok(HttpResponse::Ok().json(&updated))
}

pub async fn toggle_todo(
    auth: Authenticated,
    params: web::Path<String>,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let todo_id = parse_todo_id(&params.into_inner())?;

    let toggled = web::block(move || engine.toggle_complete(todo_id, auth.user())).await??;

    Ok(HttpResponse::Ok().json(&toggled))
}

/// Api to Delete a TODO, owner only
pub async fn delete_todo(
    auth: Authenticated,
    params: web::Path<String>,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let todo_id = parse_todo_id(&params.into_inner())?;

    web::block(move || engine.delete(todo_id, auth.user())).await??;

    Ok(HttpResponse::Ok().json(MessageDTO::new("Todo deleted successfully")))
}

pub async fn get_stats(
    auth: Authenticated,
    engine: web::Data<TodoEngine>,
) -> Result<HttpResponse, actix_web::Error> {
    let stats = web::block(move || engine.stats(auth.user())).await??;

    Ok(HttpResponse::Ok().json(&stats))
}
