// storefront/src/lib.rs

//! Tamil Spice Bazaar storefront and admin API.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;
