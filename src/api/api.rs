use actix_web::{self, middleware::Logger, web, App, HttpServer};

use crate::{
    config::{API_URL, BROADCAST_CAPACITY, SERVER_WORKERS},
    realtime::Broadcaster,
    store::{build_stores, Stores},
};

use super::{
    auth_handler,
    errors::TodoApiError, events_handler, middlewares::auth::BasicAuth, todo_engine::TodoEngine,
    todos_handler,
};

/// Shared state handed to every worker
#[derive(Clone)]
pub struct AppState {
    pub engine: web::Data<TodoEngine>,
    pub identities: web::Data<dyn crate::store::IdentityStore>,
    pub broadcaster: web::Data<Broadcaster>,
}

impl AppState {
    pub fn new(stores: Stores, broadcaster: Broadcaster) -> Self {
        Self {
            engine: web::Data::new(TodoEngine::new(stores.todos, broadcaster.clone())),
            identities: web::Data::from(stores.identities),
            broadcaster: web::Data::new(broadcaster),
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.engine.clone())
            .app_data(self.identities.clone())
            .app_data(self.broadcaster.clone())
            .app_data(json_config());

        routes(cfg);
    }
}

/// Bodies that fail to parse get the same `{error}` shape as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| {
        log::debug!("Rejected request body: {}", err);
        TodoApiError::BadRequest(err.to_string()).into()
    })
}

/// Every route lives under `/api`
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .service(auth_handler::register)
                    .service(auth_handler::login)
                    .service(
                        web::resource("/me")
                            .wrap(BasicAuth)
                            .route(web::get().to(auth_handler::me)),
                    )
                    .service(
                        web::resource("/logout")
                            .wrap(BasicAuth)
                            .route(web::post().to(auth_handler::logout)),
                    ),
            )
            .service(
                web::resource("/events")
                    .wrap(BasicAuth)
                    .route(web::get().to(events_handler::stream_events)),
            )
            .service(
                web::scope("/todos")
                    .wrap(BasicAuth)
                    .route("", web::get().to(todos_handler::get_todos))
                    .route("", web::post().to(todos_handler::create_todo))
                    .route("/my", web::get().to(todos_handler::get_my_todos))
                    .route("/stats", web::get().to(todos_handler::get_stats))
                    .route("/{id}", web::patch().to(todos_handler::update_todo))
                    .route("/{id}", web::delete().to(todos_handler::delete_todo))
                    .route("/{id}/toggle", web::patch().to(todos_handler::toggle_todo)),
            ),
    );
}

#[actix_web::main]
pub async fn start_server() -> std::io::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var(
            "RUST_LOG",
            "team_todo=debug,actix_web=info,actix_server=info",
        );
    }

    env_logger::init();

    let stores = build_stores()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let state = AppState::new(stores, Broadcaster::new(*BROADCAST_CAPACITY));

    log::info!("Starting server on {}", API_URL.as_str());

    HttpServer::new(move || {
        let state = state.clone();

        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| state.register(cfg))
    })
    .workers(*SERVER_WORKERS)
    .bind(API_URL.as_str())?
    .run()
    .await
}
