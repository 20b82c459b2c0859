pub mod webhooks;
pub mod work_orders;
