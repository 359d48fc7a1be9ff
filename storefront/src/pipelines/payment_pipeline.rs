// storefront/src/pipelines/payment_pipeline.rs

//! Settles a gateway callback: signature, ownership, then the PENDING to
//! CONFIRMED flip and stock reservation in a single transaction.

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::ORDER_COLUMNS;
use crate::models::{Order, OrderStatus};
use crate::pipelines::contexts::PaymentVerificationCtxData;
use crate::services::payment_gateway::verify_payment_signature;
use crate::services::{auth_service, mailer, order_service};
use crate::state::AppState;

/// Outcome of the guarded PENDING to CONFIRMED update. No row means a
/// replayed or already-cancelled callback.
pub fn settled_order(confirmed: Option<Order>) -> Result<Order, AppError> {
  confirmed.ok_or_else(|| AppError::Conflict("Order already processed".to_string()))
}

/// The guarded `stock >= quantity` decrement touches exactly one row or none.
pub fn ensure_reserved(rows_affected: u64, product_name: &str) -> Result<(), AppError> {
  if rows_affected == 0 {
    Err(AppError::Conflict(format!("Insufficient stock for {}", product_name)))
  } else {
    Ok(())
  }
}

pub fn register_payment_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<PaymentVerificationCtxData, AppError>::new(
    "payment_verification",
    &[
      StepDef::required("verify_signature"),
      StepDef::required("load_order"),
      StepDef::required("authorize_owner"),
      StepDef::required("confirm_and_reserve_stock"),
      StepDef::optional("send_confirmation_notice"),
    ],
  );

  p.on("verify_signature", |ctx_data: ContextData<PaymentVerificationCtxData>| {
    Box::pin(async move {
      let valid = {
        let guard = ctx_data.read();
        verify_payment_signature(
          guard.app_state.gateway.key_secret(),
          &guard.razorpay_order_id,
          &guard.razorpay_payment_id,
          &guard.razorpay_signature,
        )
      };
      if !valid {
        warn!("Payment callback signature did not verify.");
        return Err(AppError::PaymentVerification);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("load_order", |ctx_data: ContextData<PaymentVerificationCtxData>| {
    Box::pin(async move {
      let (order_id, db_pool) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.app_state.db_pool.clone())
      };
      let order = order_service::find_order(&db_pool, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("authorize_owner", |ctx_data: ContextData<PaymentVerificationCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Order missing before ownership check".to_string()))?;
      if order.user_id != Some(guard.authenticated_user_id) {
        warn!(order_id = %order.id, caller = %guard.authenticated_user_id, "Payment verification for someone else's order.");
        return Err(AppError::Forbidden("Forbidden".to_string()));
      }
      if order.razorpay_order_id.as_deref() != Some(guard.razorpay_order_id.as_str()) {
        warn!(order_id = %order.id, "Callback gateway order id does not match the stored one.");
        return Err(AppError::PaymentVerification);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("confirm_and_reserve_stock", |ctx_data: ContextData<PaymentVerificationCtxData>| {
    Box::pin(async move {
      let (order_id, payment_id, db_pool) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.razorpay_payment_id.clone(), guard.app_state.db_pool.clone())
      };

      let mut tx = db_pool.begin().await?;
      let sql = format!(
        "UPDATE orders SET status = $1, payment_id = $2, updated_at = NOW() \
         WHERE id = $3 AND status = $4 RETURNING {}",
        ORDER_COLUMNS
      );
      let confirmed = sqlx::query_as::<_, Order>(&sql)
        .bind(OrderStatus::Confirmed)
        .bind(&payment_id)
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;
      let confirmed = match settled_order(confirmed) {
        Ok(order) => order,
        Err(err) => {
          warn!(%order_id, "Payment callback for an order that is no longer PENDING.");
          return Err(err);
        }
      };

      let lines: Vec<(Uuid, i32, String)> = sqlx::query_as(
        "SELECT oi.product_id, oi.quantity, p.name FROM order_items oi \
         JOIN products p ON p.id = oi.product_id WHERE oi.order_id = $1",
      )
      .bind(order_id)
      .fetch_all(&mut *tx)
      .await?;

      for (product_id, quantity, name) in lines {
        let reserved = sqlx::query(
          "UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2 AND stock >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
        if let Err(err) = ensure_reserved(reserved.rows_affected(), &name) {
          warn!(%order_id, %product_id, quantity, "Stock ran out before payment settled; rolling back.");
          tx.rollback().await?;
          return Err(err);
        }
      }
      tx.commit().await?;

      info!(%order_id, %payment_id, total = confirmed.total, "Order confirmed and stock reserved.");
      ctx_data.write().order = Some(confirmed);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("send_confirmation_notice", |ctx_data: ContextData<PaymentVerificationCtxData>| {
    Box::pin(async move {
      let (order, db_pool, sender, outbound) = {
        let guard = ctx_data.read();
        (
          guard.order.clone(),
          guard.app_state.db_pool.clone(),
          guard.app_state.config.mail_sender.clone(),
          guard.app_state.mailer.clone(),
        )
      };
      let Some(order) = order else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };
      let Some(user_id) = order.user_id else {
        return Ok(PipelineControl::Continue);
      };
      let Some(customer) = auth_service::find_user_by_id(&db_pool, user_id).await? else {
        warn!(%user_id, "Customer vanished before confirmation mail.");
        return Ok(PipelineControl::Continue);
      };

      let mail = mailer::order_confirmation(&sender, &customer.email, customer.name.as_deref(), order.id, order.total);
      let sent = outbound.send(mail).await?;
      info!(order_id = %order.id, message_id = %sent.message_id, "Order confirmation sent.");
      ctx_data.write().confirmation_sent = true;
      Ok(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Payment verification pipeline registered.");
}
