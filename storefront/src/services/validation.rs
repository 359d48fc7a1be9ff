// storefront/src/services/validation.rs

//! Request payload validation. Checks collect every failing field rather
//! than stopping at the first one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  fn min_len(&mut self, field: &str, value: &str, min: usize) {
    if value.trim().chars().count() < min {
      self.add(field, format!("Must be at least {} characters", min));
    }
  }

  /// `Ok(())` when nothing was recorded.
  pub fn into_result(self) -> Result<(), AppError> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(AppError::InvalidInput(self))
    }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
    write!(f, "invalid fields: {}", fields.join(", "))
  }
}

pub fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !email.chars().any(char::is_whitespace)
}

pub fn is_valid_slug(slug: &str) -> bool {
  !slug.is_empty() && slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub fn is_http_url(value: &str) -> bool {
  let rest = value
    .strip_prefix("https://")
    .or_else(|| value.strip_prefix("http://"));
  matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub name: String,
  pub line1: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
  pub phone: String,
}

impl ShippingAddress {
  pub fn collect_errors(&self, errors: &mut FieldErrors) {
    errors.min_len("shippingAddress.name", &self.name, 2);
    errors.min_len("shippingAddress.line1", &self.line1, 3);
    errors.min_len("shippingAddress.city", &self.city, 2);
    errors.min_len("shippingAddress.state", &self.state, 2);
    errors.min_len("shippingAddress.postalCode", &self.postal_code, 4);
    errors.min_len("shippingAddress.country", &self.country, 2);
    errors.min_len("shippingAddress.phone", &self.phone, 8);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
  pub product_id: Uuid,
  pub quantity: i32,
}

pub fn collect_line_item_errors(items: &[LineItemInput], errors: &mut FieldErrors) {
  if items.is_empty() {
    errors.add("items", "At least one item is required");
  }
  for (idx, item) in items.iter().enumerate() {
    if item.quantity < 1 {
      errors.add(&format!("items.{}.quantity", idx), "Quantity must be a positive integer");
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
  pub name: String,
  pub email: String,
  pub password: String,
}

impl RegisterInput {
  pub fn validate(&self) -> Result<(), AppError> {
    let mut errors = FieldErrors::default();
    errors.min_len("name", &self.name, 2);
    if !is_valid_email(self.email.trim()) {
      errors.add("email", "Invalid email");
    }
    if self.password.chars().count() < 6 {
      errors.add("password", "Must be at least 6 characters");
    }
    errors.into_result()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn address() -> ShippingAddress {
    ShippingAddress {
      name: "Meena".into(),
      line1: "12 Car Street".into(),
      line2: None,
      city: "Madurai".into(),
      state: "Tamil Nadu".into(),
      postal_code: "625001".into(),
      country: "India".into(),
      phone: "9876543210".into(),
    }
  }

  #[test]
  fn complete_address_passes() {
    let mut errors = FieldErrors::default();
    address().collect_errors(&mut errors);
    assert!(errors.is_empty());
  }

  #[test]
  fn short_address_fields_are_reported() {
    let mut bad = address();
    bad.postal_code = "625".into();
    bad.phone = "12345".into();
    let mut errors = FieldErrors::default();
    bad.collect_errors(&mut errors);
    assert!(errors.get("shippingAddress.postalCode").is_some());
    assert!(errors.get("shippingAddress.phone").is_some());
    assert!(errors.get("shippingAddress.city").is_none());
  }

  #[test]
  fn line_items_need_positive_quantities() {
    let mut errors = FieldErrors::default();
    collect_line_item_errors(&[], &mut errors);
    assert!(errors.get("items").is_some());

    let mut errors = FieldErrors::default();
    let items = [LineItemInput { product_id: Uuid::new_v4(), quantity: 0 }];
    collect_line_item_errors(&items, &mut errors);
    assert!(errors.get("items.0.quantity").is_some());
  }

  #[test]
  fn email_and_slug_rules() {
    assert!(is_valid_email("cook@tamilspicebazaar.com"));
    assert!(!is_valid_email("cook@localhost"));
    assert!(!is_valid_email("no-at-sign.com"));
    assert!(is_valid_slug("Black-Pepper-100g"));
    assert!(!is_valid_slug("black pepper"));
    assert!(is_http_url("https://cdn.example.com/pepper.jpg"));
    assert!(!is_http_url("ftp://cdn.example.com/pepper.jpg"));
  }

  #[test]
  fn register_input_reports_each_field() {
    let input = RegisterInput {
      name: "A".into(),
      email: "bad".into(),
      password: "123".into(),
    };
    match input.validate() {
      Err(AppError::InvalidInput(fields)) => {
        assert!(fields.get("name").is_some());
        assert!(fields.get("email").is_some());
        assert!(fields.get("password").is_some());
      }
      other => panic!("expected field errors, got {:?}", other),
    }
  }
}
