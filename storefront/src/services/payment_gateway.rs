// storefront/src/services/payment_gateway.rs

//! Razorpay-compatible gateway seam plus the callback signature check.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{AppConfig, GatewayKind};
use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const CURRENCY: &str = "INR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  #[serde(default)]
  pub receipt: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// `amount` is in paise.
  async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, AppError>;

  /// Public key handed to the browser checkout widget.
  fn key_id(&self) -> &str;

  /// Shared secret used to sign payment callbacks.
  fn key_secret(&self) -> &str;

  fn name(&self) -> &'static str;
}

pub fn build_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, AppError> {
  match config.payment_gateway {
    GatewayKind::Razorpay => Ok(Arc::new(RazorpayGateway::new(
      &config.razorpay_api_base,
      &config.razorpay_key_id,
      &config.razorpay_key_secret,
    )?)),
    GatewayKind::Mock => Ok(Arc::new(MockGateway::new(
      &config.razorpay_key_id,
      &config.razorpay_key_secret,
    ))),
  }
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
  amount: i64,
  currency: &'a str,
  receipt: &'a str,
}

pub struct RazorpayGateway {
  client: reqwest::Client,
  api_base: String,
  key_id: String,
  key_secret: String,
}

impl RazorpayGateway {
  pub fn new(api_base: &str, key_id: &str, key_secret: &str) -> Result<Self, AppError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| AppError::Config(format!("HTTP client setup failed: {}", e)))?;
    Ok(Self {
      client,
      api_base: api_base.trim_end_matches('/').to_string(),
      key_id: key_id.to_string(),
      key_secret: key_secret.to_string(),
    })
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  #[instrument(name = "razorpay::create_order", skip(self), err(Display))]
  async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, AppError> {
    let response = self
      .client
      .post(format!("{}/orders", self.api_base))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&CreateOrderBody { amount, currency, receipt })
      .send()
      .await
      .map_err(|e| AppError::Gateway(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(%status, "Razorpay rejected order creation.");
      return Err(AppError::Gateway(format!("Razorpay responded {}: {}", status, body)));
    }

    let order: GatewayOrder = response
      .json()
      .await
      .map_err(|e| AppError::Gateway(format!("Unreadable Razorpay response: {}", e)))?;
    info!(gateway_order_id = %order.id, "Razorpay order created.");
    Ok(order)
  }

  fn key_id(&self) -> &str {
    &self.key_id
  }

  fn key_secret(&self) -> &str {
    &self.key_secret
  }

  fn name(&self) -> &'static str {
    "razorpay"
  }
}

/// Offline gateway for development and tests. Orders always succeed.
pub struct MockGateway {
  key_id: String,
  key_secret: String,
}

impl MockGateway {
  pub fn new(key_id: &str, key_secret: &str) -> Self {
    Self {
      key_id: key_id.to_string(),
      key_secret: key_secret.to_string(),
    }
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, AppError> {
    if amount <= 0 {
      return Err(AppError::Gateway("Amount must be greater than zero".to_string()));
    }
    let id = format!("order_mock_{}", Uuid::new_v4().simple());
    info!(gateway_order_id = %id, amount, "Mock gateway order created.");
    Ok(GatewayOrder {
      id,
      amount,
      currency: currency.to_string(),
      receipt: Some(receipt.to_string()),
    })
  }

  fn key_id(&self) -> &str {
    &self.key_id
  }

  fn key_secret(&self) -> &str {
    &self.key_secret
  }

  fn name(&self) -> &'static str {
    "mock"
  }
}

fn payment_mac(secret: &str, gateway_order_id: &str, payment_id: &str) -> Option<HmacSha256> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
  mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
  Some(mac)
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, as the gateway signs callbacks.
pub fn sign_payment(secret: &str, gateway_order_id: &str, payment_id: &str) -> Option<String> {
  payment_mac(secret, gateway_order_id, payment_id).map(|mac| hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison against the provided hex signature.
pub fn verify_payment_signature(secret: &str, gateway_order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
  let Ok(provided) = hex::decode(signature_hex.trim()) else {
    return false;
  };
  payment_mac(secret, gateway_order_id, payment_id).is_some_and(|mac| mac.verify_slice(&provided).is_ok())
}

/// Receipt reference sent with each gateway order.
pub fn receipt_for(now_millis: i64) -> String {
  format!("order_{}", now_millis)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_matches_reference_vector() {
    // echo -n "order_Abc|pay_Xyz" | openssl dgst -sha256 -hmac "secret"
    let sig = sign_payment("secret", "order_Abc", "pay_Xyz").unwrap();
    assert_eq!(sig, "dad1925f9381405ccc86c4a83c05c1779e4d19a30df50e05622cccc3c9a19f8f");
    assert!(verify_payment_signature("secret", "order_Abc", "pay_Xyz", &sig));
    assert!(verify_payment_signature("secret", "order_Abc", "pay_Xyz", &sig.to_uppercase()));
  }

  #[test]
  fn signature_rejects_swapped_or_foreign_values() {
    let sig = sign_payment("secret", "order_Abc", "pay_Xyz").unwrap();
    assert!(!verify_payment_signature("secret", "order_Abc", "pay_Other", &sig));
    assert!(!verify_payment_signature("other", "order_Abc", "pay_Xyz", &sig));
    assert!(!verify_payment_signature("secret", "pay_Xyz", "order_Abc", &sig));
    assert!(!verify_payment_signature("secret", "order_Abc", "pay_Xyz", "not-hex"));
    assert!(!verify_payment_signature("secret", "order_Abc", "pay_Xyz", ""));
  }

  #[tokio::test]
  async fn mock_gateway_issues_orders() {
    let gateway = MockGateway::new("rzp_test_mock", "mock_secret");
    let order = gateway.create_order(29900, CURRENCY, "order_1").await.unwrap();
    assert!(order.id.starts_with("order_mock_"));
    assert_eq!(order.amount, 29900);
    assert_eq!(order.currency, "INR");
    assert!(gateway.create_order(0, CURRENCY, "order_2").await.is_err());
  }

  #[test]
  fn gateway_follows_config() {
    let gateway = build_gateway(&AppConfig::for_tests()).unwrap();
    assert_eq!(gateway.name(), "mock");
    assert_eq!(gateway.key_id(), "rzp_test_mock");
    assert_eq!(receipt_for(1700000000000), "order_1700000000000");
  }
}
