pub mod api;
mod auth_handler;
pub(crate) mod auth_utils;
pub mod dtos;
pub(crate) mod errors;
mod events_handler;
pub(crate) mod middlewares;
pub mod todo_engine;
mod todos_handler;
