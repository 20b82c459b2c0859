pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::work_order_service::WorkOrderOperations;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::webhooks::sync_order,
        handlers::webhooks::remove_order,
        handlers::work_orders::save_work_order,
        handlers::work_orders::get_work_order,
        handlers::work_orders::reduce_draft,
    ),
    components(schemas(
        handlers::webhooks::OrderWebhook,
        handlers::webhooks::SyncOrderResponse,
        handlers::webhooks::OrderDeletedWebhook,
        handlers::webhooks::RemoveOrderResponse,
        handlers::work_orders::WorkOrderBody,
        handlers::work_orders::WorkOrderResponse,
        handlers::work_orders::ReduceDraftRequest,
    )),
    tags(
        (name = "webhooks", description = "Order and draft order synchronization"),
        (name = "work-orders", description = "Work order storage and draft editing"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Registers every route; shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .route("/orders", web::post().to(handlers::webhooks::sync_order))
            .route("/orders/delete", web::post().to(handlers::webhooks::remove_order)),
    )
    .service(
        web::scope("/work-orders")
            .route("/draft", web::post().to(handlers::work_orders::reduce_draft))
            .route("/{name}", web::get().to(handlers::work_orders::get_work_order))
            .route("/{name}", web::put().to(handlers::work_orders::save_work_order)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    operations: Arc<dyn WorkOrderOperations>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let operations = web::Data::from(operations);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(operations.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
