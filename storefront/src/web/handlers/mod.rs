// storefront/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod affiliate_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod health_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod product_handlers;
pub mod report_handlers;
pub mod settings_handlers;
pub mod wishlist_handlers;
