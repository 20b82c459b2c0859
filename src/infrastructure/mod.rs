pub mod memory;
pub mod models;
pub mod shopify;
pub mod work_order_repo;
