// storefront/src/services/mailer.rs

//! Outbound mail. The only implementation records messages through tracing;
//! a real transport plugs in behind the same trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::services::currency::format_inr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body: String,
}

#[derive(Debug, Clone)]
pub struct SentMail {
  pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, mail: OutgoingMail) -> AppResult<SentMail>;
}

/// Messages kept by [`LogMailer`]; older ones are dropped first.
pub const OUTBOX_CAPACITY: usize = 64;

/// Logs each message and keeps the most recent ones in memory for inspection.
pub struct LogMailer {
  outbox: Mutex<VecDeque<OutgoingMail>>,
  capacity: usize,
}

impl Default for LogMailer {
  fn default() -> Self {
    Self::with_capacity(OUTBOX_CAPACITY)
  }
}

impl LogMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      outbox: Mutex::new(VecDeque::with_capacity(capacity)),
      capacity,
    }
  }

  /// Oldest first.
  pub fn sent(&self) -> Vec<OutgoingMail> {
    self.outbox.lock().iter().cloned().collect()
  }
}

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, mail: OutgoingMail) -> AppResult<SentMail> {
    if mail.to.trim().is_empty() {
      return Err(AppError::Internal("Mail has no recipient".to_string()));
    }
    let message_id = format!("log_mail_{}", Uuid::new_v4().simple());
    info!(to = %mail.to, from = %mail.from, subject = %mail.subject, %message_id, "Mail recorded.");
    if self.capacity > 0 {
      let mut outbox = self.outbox.lock();
      if outbox.len() >= self.capacity {
        outbox.pop_front();
      }
      outbox.push_back(mail);
    }
    Ok(SentMail { message_id })
  }
}

pub fn order_confirmation(from: &str, to: &str, customer_name: Option<&str>, order_id: Uuid, total_paise: i64) -> OutgoingMail {
  let greeting = customer_name.filter(|n| !n.trim().is_empty()).unwrap_or("there");
  OutgoingMail {
    to: to.to_string(),
    from: from.to_string(),
    subject: format!("Order {} confirmed", order_id),
    body: format!(
      "Hi {},\n\nYour payment of {} was received and order {} is confirmed. We will let you know when it ships.\n\nTamil Spice Bazaar",
      greeting,
      format_inr(total_paise),
      order_id
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn log_mailer_keeps_sent_messages() {
    let mailer = LogMailer::new();
    let id = Uuid::new_v4();
    let mail = order_confirmation("orders@tamilspicebazaar.com", "cook@example.com", Some("Meena"), id, 49800);
    assert!(mail.body.contains("₹498.00"));
    assert!(mail.body.starts_with("Hi Meena"));

    let sent = mailer.send(mail.clone()).await.unwrap();
    assert!(sent.message_id.starts_with("log_mail_"));
    assert_eq!(mailer.sent(), vec![mail]);
  }

  #[tokio::test]
  async fn outbox_keeps_only_recent_mail() {
    let mailer = LogMailer::with_capacity(2);
    for n in 1..=5 {
      let mail = order_confirmation("orders@tamilspicebazaar.com", &format!("cook{}@example.com", n), None, Uuid::new_v4(), 100);
      mailer.send(mail).await.unwrap();
    }
    let recipients: Vec<String> = mailer.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(recipients, vec!["cook4@example.com", "cook5@example.com"]);
    assert_eq!(LogMailer::new().capacity, OUTBOX_CAPACITY);
  }

  #[tokio::test]
  async fn mail_without_recipient_fails() {
    let mailer = LogMailer::new();
    let mail = order_confirmation("orders@tamilspicebazaar.com", " ", None, Uuid::new_v4(), 100);
    assert!(mailer.send(mail).await.is_err());
    assert!(mailer.sent().is_empty());
  }
}
