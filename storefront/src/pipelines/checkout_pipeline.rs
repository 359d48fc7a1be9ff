// storefront/src/pipelines/checkout_pipeline.rs

//! Payment-order creation: validate the cart, price it from the catalog,
//! open a gateway order and persist the PENDING order it will settle.

use bazaar_flow::{ContextData, Flows, Pipeline, PipelineControl, StepDef};
use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::order_service::{self, NewOrder};
use crate::services::payment_gateway::{receipt_for, CURRENCY};
use crate::services::validation::{collect_line_item_errors, FieldErrors};
use crate::services::{affiliate_service, cart_service};
use crate::state::AppState;

/// The charged amount is the client's total once it agrees with catalog
/// pricing to within a paisa; the stored order carries the same figure.
pub fn register_checkout_pipeline(flows: &Flows<AppError>, _app_state: &AppState) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(
    "checkout",
    &[
      StepDef::required("validate_request"),
      StepDef::required("price_line_items"),
      StepDef::required("reconcile_total"),
      StepDef::optional("resolve_affiliate").skip_if(|ctx: &CheckoutCtxData| {
        ctx.promo_code.as_deref().map_or(true, |code| code.trim().is_empty())
      }),
      StepDef::required("create_gateway_order"),
      StepDef::required("persist_pending_order"),
    ],
  );

  p.on("validate_request", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut errors = FieldErrors::default();
      {
        let guard = ctx_data.read();
        collect_line_item_errors(&guard.items, &mut errors);
        guard.shipping_address.collect_errors(&mut errors);
      }
      errors.into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("price_line_items", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (items, db_pool) = {
        let guard = ctx_data.read();
        (guard.items.clone(), guard.app_state.db_pool.clone())
      };
      let quote = cart_service::quote(&db_pool, &items).await?;
      if let Some(short) = quote.items.iter().find(|line| !line.in_stock) {
        warn!(product_id = %short.product_id, requested = short.quantity, available = short.stock, "Checkout exceeds stock.");
        return Err(AppError::Validation(format!("Insufficient stock for {}", short.name)));
      }
      {
        let mut guard = ctx_data.write();
        guard.computed_total = quote.total;
        guard.priced_lines = quote.items;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("reconcile_total", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (computed, claimed) = {
        let guard = ctx_data.read();
        (guard.computed_total, guard.claimed_total)
      };
      if !cart_service::totals_match(computed, claimed) {
        warn!(computed, claimed, "Client total disagrees with catalog prices.");
        return Err(AppError::Validation("Total mismatch".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("resolve_affiliate", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (promo_code, buyer, db_pool) = {
        let guard = ctx_data.read();
        (
          guard.promo_code.clone().unwrap_or_default(),
          guard.authenticated_user_id,
          guard.app_state.db_pool.clone(),
        )
      };
      match affiliate_service::find_by_promo_code(&db_pool, &promo_code).await? {
        None => warn!(%promo_code, "Ignoring unknown promo code at checkout."),
        Some(affiliate) if affiliate.user_id == buyer => {
          warn!(affiliate_id = %affiliate.id, "Affiliate used their own promo code; no referral recorded.")
        }
        Some(affiliate) => {
          info!(affiliate_id = %affiliate.id, "Order referred by affiliate.");
          ctx_data.write().affiliate = Some(affiliate);
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_gateway_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (amount, gateway) = {
        let guard = ctx_data.read();
        (guard.claimed_total, guard.app_state.gateway.clone())
      };
      let receipt = receipt_for(Utc::now().timestamp_millis());
      let gateway_order = gateway.create_order(amount, CURRENCY, &receipt).await?;
      info!(gateway = gateway.name(), gateway_order_id = %gateway_order.id, amount, "Gateway order opened.");
      ctx_data.write().gateway_order = Some(gateway_order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("persist_pending_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (user_id, affiliate_id, total, address, lines, gateway_order_id, db_pool) = {
        let guard = ctx_data.read();
        (
          guard.authenticated_user_id,
          guard.affiliate.as_ref().map(|a| a.id),
          guard.claimed_total,
          guard.shipping_address.clone(),
          guard.priced_lines.clone(),
          guard.gateway_order.as_ref().map(|g| g.id.clone()),
          guard.app_state.db_pool.clone(),
        )
      };
      let gateway_order_id =
        gateway_order_id.ok_or_else(|| AppError::Internal("Gateway order missing before persistence".to_string()))?;

      let mut tx = db_pool.begin().await?;
      let order = order_service::insert_order(
        &mut tx,
        NewOrder {
          user_id: Some(user_id),
          affiliate_id,
          total,
          shipping_address: &address,
          razorpay_order_id: Some(&gateway_order_id),
          lines: &lines,
        },
      )
      .await?;
      tx.commit().await?;

      info!(order_id = %order.id, %user_id, total, "Pending order stored.");
      ctx_data.write().order_id = Some(order.id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Checkout pipeline registered.");
}
