pub mod attributes;
pub mod errors;
pub mod ids;
pub mod normalize;
pub mod order;
pub mod order_context;
pub mod ports;
pub mod reducer;
pub mod work_order;
