// storefront/src/pipelines/payout_pipeline.rs

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::PayoutStatus;
use crate::pipelines::contexts::PayoutCtxData;
use crate::services::affiliate_service;
use crate::state::AppState;

/// Every collected order must still be unflagged and paid when the payout
/// commits; anything less means another payout or a cancellation got there first.
pub fn ensure_all_flagged(expected: usize, flagged: u64) -> Result<(), AppError> {
  if flagged == expected as u64 {
    Ok(())
  } else {
    Err(AppError::Conflict("Payout already in progress".to_string()))
  }
}

pub fn register_payout_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<PayoutCtxData, AppError>::new(
    "affiliate_payout",
    &[
      StepDef::required("load_affiliate"),
      StepDef::required("collect_unpaid_orders"),
      StepDef::required("compute_commission"),
      StepDef::required("record_payout"),
    ],
  );

  p.on("load_affiliate", |ctx_data: ContextData<PayoutCtxData>| {
    Box::pin(async move {
      let (affiliate_id, db_pool) = {
        let guard = ctx_data.read();
        (guard.affiliate_id, guard.app_state.db_pool.clone())
      };
      let affiliate = affiliate_service::find_by_id(&db_pool, affiliate_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Affiliate not found".to_string()))?;
      ctx_data.write().affiliate = Some(affiliate);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("collect_unpaid_orders", |ctx_data: ContextData<PayoutCtxData>| {
    Box::pin(async move {
      let (affiliate_id, db_pool) = {
        let guard = ctx_data.read();
        (guard.affiliate_id, guard.app_state.db_pool.clone())
      };
      let unpaid = affiliate_service::unpaid_orders(&db_pool, affiliate_id).await?;
      ctx_data.write().unpaid_orders = unpaid;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("compute_commission", |ctx_data: ContextData<PayoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let rate = guard
        .affiliate
        .as_ref()
        .map(|a| a.commission_rate)
        .ok_or_else(|| AppError::Internal("Affiliate missing before commission".to_string()))?;
      let plan = match affiliate_service::plan_payout(&guard.unpaid_orders, rate) {
        Ok(plan) => plan,
        Err(err) => {
          warn!(affiliate_id = %guard.affiliate_id, orders = guard.unpaid_orders.len(), "Payout requested with nothing owed.");
          return Err(err);
        }
      };
      guard.order_ids = plan.order_ids;
      guard.amount = plan.amount;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("record_payout", |ctx_data: ContextData<PayoutCtxData>| {
    Box::pin(async move {
      let (affiliate_id, order_ids, amount, db_pool) = {
        let guard = ctx_data.read();
        (
          guard.affiliate_id,
          guard.order_ids.clone(),
          guard.amount,
          guard.app_state.db_pool.clone(),
        )
      };
      let payout_id = Uuid::new_v4();

      let mut tx = db_pool.begin().await?;
      // One payout per affiliate at a time.
      sqlx::query("SELECT id FROM affiliates WHERE id = $1 FOR UPDATE")
        .bind(affiliate_id)
        .execute(&mut *tx)
        .await?;
      sqlx::query(
        "INSERT INTO affiliate_payouts (id, affiliate_id, amount, status, paid_at) VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(payout_id)
      .bind(affiliate_id)
      .bind(amount)
      .bind(PayoutStatus::Completed)
      .bind(Utc::now())
      .execute(&mut *tx)
      .await?;
      let flagged = affiliate_service::flag_paid_out(&mut tx, &order_ids).await?;
      if let Err(conflict) = ensure_all_flagged(order_ids.len(), flagged) {
        warn!(%affiliate_id, expected = order_ids.len(), flagged, "Orders changed under the payout; rolling back.");
        tx.rollback().await?;
        return Err(conflict);
      }
      sqlx::query("UPDATE affiliates SET total_earnings = total_earnings + $1 WHERE id = $2")
        .bind(amount)
        .bind(affiliate_id)
        .execute(&mut *tx)
        .await?;
      tx.commit().await?;

      info!(%affiliate_id, %payout_id, amount, orders = order_ids.len(), "Affiliate payout recorded.");
      ctx_data.write().payout_id = Some(payout_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Affiliate payout pipeline registered.");
}
