// storefront/src/services/settings_service.rs

//! Store settings kept as key/value rows and presented grouped, with a
//! default for every key that has never been saved.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::errors::Result as AppResult;
use crate::models::SettingRow;
use crate::services::validation::FieldErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
  pub site_name: String,
  pub site_description: String,
  pub contact_email: String,
  pub support_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommerceSettings {
  pub currency: String,
  pub tax_rate: f64,
  pub default_commission_rate: f64,
  pub minimum_order_amount: i64,
  pub free_shipping_threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSettings {
  pub standard_shipping_cost: i64,
  pub express_shipping_cost: i64,
  pub international_shipping_cost: i64,
  pub processing_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettings {
  pub razorpay_enabled: bool,
  pub cod_enabled: bool,
  pub minimum_cod_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
  pub general: GeneralSettings,
  pub commerce: CommerceSettings,
  pub shipping: ShippingSettings,
  pub payments: PaymentSettings,
}

fn number_or<T: FromStr>(stored: &HashMap<String, String>, key: &str, default: T) -> T {
  stored.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn text_or(stored: &HashMap<String, String>, key: &str, default: &str) -> String {
  stored
    .get(key)
    .filter(|v| !v.is_empty())
    .cloned()
    .unwrap_or_else(|| default.to_string())
}

impl StoreSettings {
  pub fn from_stored(stored: &HashMap<String, String>) -> Self {
    Self {
      general: GeneralSettings {
        site_name: text_or(stored, "siteName", "Tamil Spice Bazaar"),
        site_description: text_or(stored, "siteDescription", "Authentic Tamil Nadu spices and ingredients"),
        contact_email: text_or(stored, "contactEmail", "contact@tamilspicebazaar.com"),
        support_email: text_or(stored, "supportEmail", "support@tamilspicebazaar.com"),
      },
      commerce: CommerceSettings {
        currency: text_or(stored, "currency", "INR"),
        tax_rate: number_or(stored, "taxRate", 18.0),
        default_commission_rate: number_or(stored, "defaultCommissionRate", 10.0),
        minimum_order_amount: number_or(stored, "minimumOrderAmount", 50_000),
        free_shipping_threshold: number_or(stored, "freeShippingThreshold", 100_000),
      },
      shipping: ShippingSettings {
        standard_shipping_cost: number_or(stored, "standardShippingCost", 5_000),
        express_shipping_cost: number_or(stored, "expressShippingCost", 15_000),
        international_shipping_cost: number_or(stored, "internationalShippingCost", 50_000),
        processing_days: number_or(stored, "processingDays", 2),
      },
      payments: PaymentSettings {
        razorpay_enabled: stored.get("razorpayEnabled").is_some_and(|v| v == "true"),
        cod_enabled: stored.get("codEnabled").map_or(true, |v| v != "false"),
        minimum_cod_amount: number_or(stored, "minimumCodAmount", 20_000),
      },
    }
  }

  /// All sixteen rows as they are stored.
  pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
    vec![
      ("siteName", self.general.site_name.clone()),
      ("siteDescription", self.general.site_description.clone()),
      ("contactEmail", self.general.contact_email.clone()),
      ("supportEmail", self.general.support_email.clone()),
      ("currency", self.commerce.currency.clone()),
      ("taxRate", self.commerce.tax_rate.to_string()),
      ("defaultCommissionRate", self.commerce.default_commission_rate.to_string()),
      ("minimumOrderAmount", self.commerce.minimum_order_amount.to_string()),
      ("freeShippingThreshold", self.commerce.free_shipping_threshold.to_string()),
      ("standardShippingCost", self.shipping.standard_shipping_cost.to_string()),
      ("expressShippingCost", self.shipping.express_shipping_cost.to_string()),
      ("internationalShippingCost", self.shipping.international_shipping_cost.to_string()),
      ("processingDays", self.shipping.processing_days.to_string()),
      ("razorpayEnabled", self.payments.razorpay_enabled.to_string()),
      ("codEnabled", self.payments.cod_enabled.to_string()),
      ("minimumCodAmount", self.payments.minimum_cod_amount.to_string()),
    ]
  }

  pub fn validate(&self) -> AppResult<()> {
    let mut errors = FieldErrors::default();
    for (field, rate) in [
      ("commerce.taxRate", self.commerce.tax_rate),
      ("commerce.defaultCommissionRate", self.commerce.default_commission_rate),
    ] {
      if !(0.0..=100.0).contains(&rate) {
        errors.add(field, "Must be between 0 and 100");
      }
    }
    for (field, amount) in [
      ("commerce.minimumOrderAmount", self.commerce.minimum_order_amount),
      ("commerce.freeShippingThreshold", self.commerce.free_shipping_threshold),
      ("shipping.standardShippingCost", self.shipping.standard_shipping_cost),
      ("shipping.expressShippingCost", self.shipping.express_shipping_cost),
      ("shipping.internationalShippingCost", self.shipping.international_shipping_cost),
      ("shipping.processingDays", self.shipping.processing_days),
      ("payments.minimumCodAmount", self.payments.minimum_cod_amount),
    ] {
      if amount < 0 {
        errors.add(field, "Must not be negative");
      }
    }
    if self.general.site_name.trim().is_empty() {
      errors.add("general.siteName", "Required");
    }
    if self.commerce.currency.trim().is_empty() {
      errors.add("commerce.currency", "Required");
    }
    errors.into_result()
  }

  /// Whole-percent rate given to newly registered affiliates.
  pub fn affiliate_commission_rate(&self) -> i32 {
    self.commerce.default_commission_rate.round().clamp(0.0, 100.0) as i32
  }
}

#[instrument(name = "settings_service::load", skip(pool))]
pub async fn load(pool: &PgPool) -> AppResult<StoreSettings> {
  let rows = sqlx::query_as::<_, SettingRow>("SELECT key, value FROM settings")
    .fetch_all(pool)
    .await?;
  let stored: HashMap<String, String> = rows.into_iter().map(|r| (r.key, r.value)).collect();
  Ok(StoreSettings::from_stored(&stored))
}

#[instrument(name = "settings_service::save", skip(pool, settings))]
pub async fn save(pool: &PgPool, settings: &StoreSettings) -> AppResult<()> {
  settings.validate()?;

  let mut tx = pool.begin().await?;
  for (key, value) in settings.to_pairs() {
    sqlx::query(
      "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, now()) \
       ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(value)
    .execute(&mut *tx)
    .await?;
  }
  tx.commit().await?;
  info!("Store settings saved.");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;

  fn stored(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn defaults_fill_missing_keys() {
    let settings = StoreSettings::from_stored(&HashMap::new());
    assert_eq!(settings.general.site_name, "Tamil Spice Bazaar");
    assert_eq!(settings.commerce.tax_rate, 18.0);
    assert_eq!(settings.commerce.minimum_order_amount, 50_000);
    assert_eq!(settings.shipping.processing_days, 2);
    assert!(!settings.payments.razorpay_enabled);
    assert!(settings.payments.cod_enabled);
    assert_eq!(settings.affiliate_commission_rate(), 10);
  }

  #[test]
  fn stored_values_win_and_garbage_falls_back() {
    let settings = StoreSettings::from_stored(&stored(&[
      ("taxRate", "12.5"),
      ("processingDays", "three"),
      ("razorpayEnabled", "true"),
      ("codEnabled", "false"),
      ("defaultCommissionRate", "7.6"),
    ]));
    assert_eq!(settings.commerce.tax_rate, 12.5);
    assert_eq!(settings.shipping.processing_days, 2);
    assert!(settings.payments.razorpay_enabled);
    assert!(!settings.payments.cod_enabled);
    assert_eq!(settings.affiliate_commission_rate(), 8);
  }

  #[test]
  fn pairs_cover_every_key_and_round_trip() {
    let original = StoreSettings::from_stored(&stored(&[("siteName", "Spice Hub"), ("minimumCodAmount", "30000")]));
    let pairs = original.to_pairs();
    assert_eq!(pairs.len(), 16);
    let back: HashMap<String, String> = pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    assert_eq!(StoreSettings::from_stored(&back), original);
  }

  #[test]
  fn out_of_range_values_are_rejected() {
    let mut settings = StoreSettings::from_stored(&HashMap::new());
    settings.commerce.tax_rate = 120.0;
    settings.shipping.express_shipping_cost = -1;
    match settings.validate() {
      Err(AppError::InvalidInput(fields)) => {
        assert!(fields.get("commerce.taxRate").is_some());
        assert!(fields.get("shipping.expressShippingCost").is_some());
      }
      other => panic!("expected field errors, got {:?}", other),
    }
  }
}
