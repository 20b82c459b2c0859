use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::runtime::Handle;
use work_order_service::application::work_order_service::{WorkOrderOperations, WorkOrderService};
use work_order_service::config::AppConfig;
use work_order_service::infrastructure::shopify::ShopifyAdminClient;
use work_order_service::infrastructure::work_order_repo::DieselWorkOrderRepository;
use work_order_service::{build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let operations: Arc<dyn WorkOrderOperations> = Arc::new(WorkOrderService::new(
        DieselWorkOrderRepository::new(pool),
        ShopifyAdminClient::new(&config.shopify, Handle::current()),
    ));

    log::info!(
        "Starting server at http://{}:{} for store {}",
        config.host,
        config.port,
        config.shopify.store
    );

    build_server(operations, &config.host, config.port)?.await
}
