// storefront/src/pipelines/order_status_pipeline.rs

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::order::ORDER_COLUMNS;
use crate::models::{Order, OrderStatus};
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::services::order_service;
use crate::state::AppState;

/// Admin-side check. PENDING to CONFIRMED belongs to payment verification.
pub fn admin_may_move(current: OrderStatus, requested: OrderStatus) -> bool {
  if current == OrderStatus::Pending && requested == OrderStatus::Confirmed {
    return false;
  }
  current.can_transition_to(requested)
}

pub fn register_order_status_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(
    "order_status",
    &[
      StepDef::required("load_order"),
      StepDef::required("check_transition"),
      StepDef::required("apply_status"),
    ],
  );

  p.on("load_order", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let (order_id, db_pool) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.app_state.db_pool.clone())
      };
      let order = order_service::find_order(&db_pool, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      ctx_data.write().current = Some(order.status);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("check_transition", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let current = guard
        .current
        .ok_or_else(|| AppError::Internal("Order status unknown before transition check".to_string()))?;
      if current.is_terminal() {
        warn!(order_id = %guard.order_id, status = %current, "Status change on a closed order.");
        return Err(AppError::Conflict(format!("Order is already {}", current)));
      }
      if !admin_may_move(current, guard.requested) {
        warn!(order_id = %guard.order_id, from = %current, to = %guard.requested, "Rejected order status change.");
        return Err(AppError::Conflict(format!(
          "Cannot change order status from {} to {}",
          current, guard.requested
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Guarded on the status read above so a concurrent change surfaces as 409.
  p.on("apply_status", |ctx_data: ContextData<OrderStatusCtxData>| {
    Box::pin(async move {
      let (order_id, requested, current, db_pool) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.requested, guard.current, guard.app_state.db_pool.clone())
      };
      let sql = format!(
        "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3 RETURNING {}",
        ORDER_COLUMNS
      );
      let updated = sqlx::query_as::<_, Order>(&sql)
        .bind(requested)
        .bind(order_id)
        .bind(current)
        .fetch_optional(&db_pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Order status changed concurrently".to_string()))?;

      info!(%order_id, from = ?current, to = %requested, "Order status updated.");
      ctx_data.write().updated_order = Some(updated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Order status pipeline registered.");
}
