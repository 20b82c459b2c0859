pub mod linker;
pub mod work_order_service;
