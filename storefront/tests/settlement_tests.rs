// tests/settlement_tests.rs
//
// Payment confirmation and affiliate payouts against a real Postgres.
// Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
mod common;

use bazaar_flow::{ContextData, PipelineResult};
use sqlx::PgPool;
use uuid::Uuid;

use common::database_state;
use spice_bazaar::errors::AppError;
use spice_bazaar::models::OrderStatus;
use spice_bazaar::pipelines::contexts::{PaymentVerificationCtxData, PayoutCtxData};
use spice_bazaar::pipelines::payout_pipeline::ensure_all_flagged;
use spice_bazaar::services::affiliate_service;
use spice_bazaar::services::payment_gateway::sign_payment;
use spice_bazaar::state::AppState;

async fn insert_user(pool: &PgPool) -> Uuid {
  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO users (id, name, email, password_hash) VALUES ($1, 'Meena', $2, 'unused')")
    .bind(id)
    .bind(format!("meena-{}@example.com", id.simple()))
    .execute(pool)
    .await
    .expect("insert user");
  id
}

async fn insert_product(pool: &PgPool, name: &str, stock: i32) -> Uuid {
  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO products (id, slug, name, description, price, stock) VALUES ($1, $2, $3, 'Stone ground in Erode.', 19900, $4)")
    .bind(id)
    .bind(format!("test-{}", id.simple()))
    .bind(name)
    .bind(stock)
    .execute(pool)
    .await
    .expect("insert product");
  id
}

async fn insert_affiliate(pool: &PgPool, rate: i32) -> Uuid {
  let user_id = insert_user(pool).await;
  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO affiliates (id, user_id, promo_code, commission_rate) VALUES ($1, $2, $3, $4)")
    .bind(id)
    .bind(user_id)
    .bind(format!("T{}", &id.simple().to_string()[..12]).to_uppercase())
    .bind(rate)
    .execute(pool)
    .await
    .expect("insert affiliate");
  id
}

struct SeedOrder<'a> {
  user_id: Option<Uuid>,
  affiliate_id: Option<Uuid>,
  status: OrderStatus,
  total: i64,
  paid_out: bool,
  gateway_order_id: Option<String>,
  items: &'a [(Uuid, i32)],
}

async fn insert_order(pool: &PgPool, seed: SeedOrder<'_>) -> Uuid {
  let id = Uuid::new_v4();
  sqlx::query(
    "INSERT INTO orders (id, user_id, affiliate_id, status, total, shipping_address, razorpay_order_id, paid_out) \
     VALUES ($1, $2, $3, $4, $5, '{}'::jsonb, $6, $7)",
  )
  .bind(id)
  .bind(seed.user_id)
  .bind(seed.affiliate_id)
  .bind(seed.status)
  .bind(seed.total)
  .bind(seed.gateway_order_id)
  .bind(seed.paid_out)
  .execute(pool)
  .await
  .expect("insert order");
  for (product_id, quantity) in seed.items {
    sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, 19900)")
      .bind(Uuid::new_v4())
      .bind(id)
      .bind(product_id)
      .bind(quantity)
      .execute(pool)
      .await
      .expect("insert order item");
  }
  id
}

async fn paid_order(pool: &PgPool, affiliate_id: Uuid, status: OrderStatus, total: i64, paid_out: bool) -> Uuid {
  insert_order(
    pool,
    SeedOrder {
      user_id: None,
      affiliate_id: Some(affiliate_id),
      status,
      total,
      paid_out,
      gateway_order_id: None,
      items: &[],
    },
  )
  .await
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
  sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("stock")
}

async fn order_state(pool: &PgPool, order_id: Uuid) -> (OrderStatus, Option<String>, bool) {
  sqlx::query_as("SELECT status, payment_id, paid_out FROM orders WHERE id = $1")
    .bind(order_id)
    .fetch_one(pool)
    .await
    .expect("order state")
}

async fn verify(state: &AppState, user_id: Uuid, order_id: Uuid, gateway_order_id: &str) -> Result<PipelineResult, AppError> {
  let payment_id = format!("pay_{}", Uuid::new_v4().simple());
  let signature = sign_payment(&state.config.razorpay_key_secret, gateway_order_id, &payment_id).expect("signature");
  let ctx = ContextData::new(PaymentVerificationCtxData {
    app_state: state.clone(),
    authenticated_user_id: user_id,
    order_id,
    razorpay_order_id: gateway_order_id.to_string(),
    razorpay_payment_id: payment_id,
    razorpay_signature: signature,
    order: None,
    confirmation_sent: false,
  });
  state.flows.run(ctx).await
}

fn payout_ctx(state: &AppState, affiliate_id: Uuid) -> ContextData<PayoutCtxData> {
  ContextData::new(PayoutCtxData {
    app_state: state.clone(),
    affiliate_id,
    affiliate: None,
    unpaid_orders: Vec::new(),
    order_ids: Vec::new(),
    amount: 0,
    payout_id: None,
  })
}

async fn total_earnings(pool: &PgPool, affiliate_id: Uuid) -> i64 {
  sqlx::query_scalar("SELECT total_earnings FROM affiliates WHERE id = $1")
    .bind(affiliate_id)
    .fetch_one(pool)
    .await
    .expect("earnings")
}

async fn payout_count(pool: &PgPool, affiliate_id: Uuid) -> i64 {
  sqlx::query_scalar("SELECT COUNT(*) FROM affiliate_payouts WHERE affiliate_id = $1")
    .bind(affiliate_id)
    .fetch_one(pool)
    .await
    .expect("payout count")
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL and a local Postgres"]
async fn payment_confirms_once_and_replay_conflicts() {
  let Some(state) = database_state().await else { return };
  let pool = &state.db_pool;
  let user_id = insert_user(pool).await;
  let turmeric = insert_product(pool, "Turmeric", 5).await;
  let gateway_order_id = format!("order_test_{}", Uuid::new_v4().simple());
  let order_id = insert_order(
    pool,
    SeedOrder {
      user_id: Some(user_id),
      affiliate_id: None,
      status: OrderStatus::Pending,
      total: 39800,
      paid_out: false,
      gateway_order_id: Some(gateway_order_id.clone()),
      items: &[(turmeric, 2)],
    },
  )
  .await;

  let first = verify(&state, user_id, order_id, &gateway_order_id).await.expect("first verification");
  assert_eq!(first, PipelineResult::Completed);
  let (status, payment_id, _) = order_state(pool, order_id).await;
  assert_eq!(status, OrderStatus::Confirmed);
  assert!(payment_id.is_some());
  assert_eq!(stock_of(pool, turmeric).await, 3);

  match verify(&state, user_id, order_id, &gateway_order_id).await {
    Err(AppError::Conflict(msg)) => assert_eq!(msg, "Order already processed"),
    other => panic!("expected replay conflict, got {:?}", other),
  }
  assert_eq!(stock_of(pool, turmeric).await, 3);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL and a local Postgres"]
async fn stock_shortfall_rolls_back_the_whole_confirmation() {
  let Some(state) = database_state().await else { return };
  let pool = &state.db_pool;
  let user_id = insert_user(pool).await;
  let pepper = insert_product(pool, "Black Pepper", 5).await;
  let saffron = insert_product(pool, "Saffron", 1).await;
  let gateway_order_id = format!("order_test_{}", Uuid::new_v4().simple());
  let order_id = insert_order(
    pool,
    SeedOrder {
      user_id: Some(user_id),
      affiliate_id: None,
      status: OrderStatus::Pending,
      total: 59700,
      paid_out: false,
      gateway_order_id: Some(gateway_order_id.clone()),
      items: &[(pepper, 1), (saffron, 2)],
    },
  )
  .await;

  match verify(&state, user_id, order_id, &gateway_order_id).await {
    Err(AppError::Conflict(msg)) => assert_eq!(msg, "Insufficient stock for Saffron"),
    other => panic!("expected stock conflict, got {:?}", other),
  }
  let (status, payment_id, _) = order_state(pool, order_id).await;
  assert_eq!(status, OrderStatus::Pending);
  assert_eq!(payment_id, None);
  assert_eq!(stock_of(pool, pepper).await, 5);
  assert_eq!(stock_of(pool, saffron).await, 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL and a local Postgres"]
async fn payout_flags_exactly_the_collected_orders() {
  let Some(state) = database_state().await else { return };
  let pool = &state.db_pool;
  let affiliate_id = insert_affiliate(pool, 10).await;
  let confirmed = paid_order(pool, affiliate_id, OrderStatus::Confirmed, 29900, false).await;
  let delivered = paid_order(pool, affiliate_id, OrderStatus::Delivered, 10000, false).await;
  let pending = paid_order(pool, affiliate_id, OrderStatus::Pending, 50000, false).await;
  let cancelled = paid_order(pool, affiliate_id, OrderStatus::Cancelled, 7000, false).await;
  let settled = paid_order(pool, affiliate_id, OrderStatus::Shipped, 8000, true).await;

  let ctx = payout_ctx(&state, affiliate_id);
  assert_eq!(state.flows.run(ctx.clone()).await.expect("payout"), PipelineResult::Completed);
  {
    let guard = ctx.read();
    assert_eq!(guard.amount, 3990);
    let mut collected = guard.order_ids.clone();
    collected.sort();
    let mut expected = vec![confirmed, delivered];
    expected.sort();
    assert_eq!(collected, expected);
  }

  for (order_id, flagged) in [(confirmed, true), (delivered, true), (pending, false), (cancelled, false), (settled, true)] {
    assert_eq!(order_state(pool, order_id).await.2, flagged, "paid_out for {}", order_id);
  }
  assert_eq!(total_earnings(pool, affiliate_id).await, 3990);

  match state.flows.run(payout_ctx(&state, affiliate_id)).await {
    Err(AppError::Validation(msg)) => assert_eq!(msg, "No earnings to pay out"),
    other => panic!("expected nothing owed, got {:?}", other),
  }
  assert_eq!(payout_count(pool, affiliate_id).await, 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL and a local Postgres"]
async fn concurrent_payouts_pay_once() {
  let Some(state) = database_state().await else { return };
  let pool = &state.db_pool;
  let affiliate_id = insert_affiliate(pool, 10).await;
  paid_order(pool, affiliate_id, OrderStatus::Confirmed, 29900, false).await;
  paid_order(pool, affiliate_id, OrderStatus::Packed, 19900, false).await;

  let (left, right) = tokio::join!(
    state.flows.run(payout_ctx(&state, affiliate_id)),
    state.flows.run(payout_ctx(&state, affiliate_id)),
  );
  let outcomes = [left, right];
  let completed = outcomes.iter().filter(|r| matches!(r, Ok(PipelineResult::Completed))).count();
  assert_eq!(completed, 1);
  for outcome in &outcomes {
    match outcome {
      Ok(PipelineResult::Completed) => {}
      Err(AppError::Conflict(msg)) => assert_eq!(msg, "Payout already in progress"),
      Err(AppError::Validation(msg)) => assert_eq!(msg, "No earnings to pay out"),
      other => panic!("unexpected payout outcome {:?}", other),
    }
  }
  assert_eq!(payout_count(pool, affiliate_id).await, 1);
  assert_eq!(total_earnings(pool, affiliate_id).await, 4980);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL and a local Postgres"]
async fn order_cancelled_after_collection_blocks_the_payout() {
  let Some(state) = database_state().await else { return };
  let pool = &state.db_pool;
  let affiliate_id = insert_affiliate(pool, 10).await;
  let kept = paid_order(pool, affiliate_id, OrderStatus::Confirmed, 29900, false).await;
  let cancelled = paid_order(pool, affiliate_id, OrderStatus::Confirmed, 19900, false).await;

  let unpaid = affiliate_service::unpaid_orders(pool, affiliate_id).await.expect("collect");
  let plan = affiliate_service::plan_payout(&unpaid, 10).expect("plan");
  assert_eq!(plan.order_ids.len(), 2);

  sqlx::query("UPDATE orders SET status = 'CANCELLED' WHERE id = $1")
    .bind(cancelled)
    .execute(pool)
    .await
    .expect("cancel");

  let mut tx = pool.begin().await.expect("begin");
  let flagged = affiliate_service::flag_paid_out(&mut tx, &plan.order_ids).await.expect("flag");
  assert_eq!(flagged, 1);
  assert!(matches!(ensure_all_flagged(plan.order_ids.len(), flagged), Err(AppError::Conflict(_))));
  tx.rollback().await.expect("rollback");

  assert!(!order_state(pool, kept).await.2);
  assert!(!order_state(pool, cancelled).await.2);
}
