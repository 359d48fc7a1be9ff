// storefront/src/models/mod.rs

//! Row types and the enums stored as Postgres enum types.

pub mod affiliate;
pub mod order;
pub mod order_item;
pub mod product;
pub mod setting;
pub mod user;

pub use affiliate::{Affiliate, AffiliateClick, AffiliatePayout, PayoutStatus};
pub use order::{Order, OrderStatus};
pub use order_item::OrderItemDetail;
pub use product::Product;
pub use setting::SettingRow;
pub use user::{User, UserRole};
