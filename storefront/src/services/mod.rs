// storefront/src/services/mod.rs

pub mod admin_service;
pub mod affiliate_service;
pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;
pub mod currency;
pub mod mailer;
pub mod order_service;
pub mod payment_gateway;
pub mod periods;
pub mod report_service;
pub mod session_service;
pub mod settings_service;
pub mod validation;
pub mod wishlist_service;
