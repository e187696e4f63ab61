pub mod app;
pub mod todo_list_renderer;
