// storefront/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpRequest, HttpResponse, ResponseError};
use tracing::debug;

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, affiliate_handlers, auth_handlers, cart_handlers, health_handlers, order_handlers, payment_handlers,
  product_handlers, report_handlers, settings_handlers, wishlist_handlers,
};

/// Malformed JSON bodies and query strings answer in the API's error shape.
fn reject_payload(message: String) -> actix_web::Error {
  debug!(%message, "Rejected malformed request input.");
  let app_err = AppError::Validation(message);
  let response: HttpResponse = app_err.error_response();
  InternalError::from_response(app_err, response).into()
}

fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| reject_payload(format!("Invalid request body: {}", err)))
}

fn query_config() -> web::QueryConfig {
  web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| reject_payload(format!("Invalid query: {}", err)))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config())
      .app_data(query_config())
      .service(
        web::scope("/health")
          .route("", web::get().to(health_handlers::health_handler))
          .route("/ready", web::get().to(health_handlers::readiness_handler)),
      )
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .route("/search", web::get().to(product_handlers::search_products_handler))
          .route("/slug/{slug}", web::get().to(product_handlers::get_product_by_slug_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler)),
      )
      .service(web::scope("/cart").route("/quote", web::post().to(cart_handlers::quote_handler)))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/guest", web::post().to(order_handlers::guest_order_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}", web::patch().to(order_handlers::update_order_status_handler)),
      )
      .service(
        web::scope("/payments")
          .route("/create-order", web::post().to(payment_handlers::create_order_handler))
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler)),
      )
      .service(
        web::scope("/affiliates")
          .route("", web::get().to(affiliate_handlers::get_affiliate_handler))
          .route("/register", web::post().to(affiliate_handlers::register_affiliate_handler))
          .route("/click", web::post().to(affiliate_handlers::record_click_handler)),
      )
      .service(
        web::scope("/wishlist")
          .route("", web::get().to(wishlist_handlers::get_wishlist_handler))
          .route("", web::post().to(wishlist_handlers::add_to_wishlist_handler))
          .route("", web::delete().to(wishlist_handlers::remove_from_wishlist_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/dashboard", web::get().to(admin_handlers::dashboard_handler))
          .route("/users", web::get().to(admin_handlers::list_users_handler))
          .route("/users/{user_id}", web::patch().to(admin_handlers::change_role_handler))
          .route("/orders", web::get().to(order_handlers::admin_list_orders_handler))
          .route("/affiliates", web::get().to(admin_handlers::list_affiliates_handler))
          .route("/affiliates/{affiliate_id}/payout", web::post().to(admin_handlers::payout_handler))
          .route("/affiliates/{affiliate_id}/payouts", web::get().to(admin_handlers::payout_history_handler))
          .route("/reports", web::get().to(report_handlers::reports_handler))
          .route("/reports/export", web::get().to(report_handlers::export_handler))
          .route("/reports/cache/clear", web::post().to(report_handlers::clear_cache_handler))
          .route("/settings", web::get().to(settings_handlers::get_settings_handler))
          .route("/settings", web::post().to(settings_handlers::save_settings_handler)),
      ),
  );
}
