// storefront/src/services/currency.rs

//! Money helpers. Amounts are integer paise everywhere except at the edges.

pub fn rupees_to_paise(rupees: f64) -> i64 {
  (rupees * 100.0).round() as i64
}

pub fn paise_to_rupees(paise: i64) -> f64 {
  paise as f64 / 100.0
}

/// `29900` -> `"299.00"`.
pub fn format_rupees(paise: i64) -> String {
  let sign = if paise < 0 { "-" } else { "" };
  let abs = paise.unsigned_abs();
  format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Indian digit grouping: `12345650` -> `"₹1,23,456.50"`.
pub fn format_inr(paise: i64) -> String {
  let sign = if paise < 0 { "-" } else { "" };
  let abs = paise.unsigned_abs();
  let digits = (abs / 100).to_string();

  let grouped = if digits.len() <= 3 {
    digits
  } else {
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
      let start = end.saturating_sub(2);
      groups.push(&head[start..end]);
      end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
  };

  format!("{}₹{}.{:02}", sign, grouped, abs % 100)
}
