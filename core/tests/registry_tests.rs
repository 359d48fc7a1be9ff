// tests/registry_tests.rs
mod common;

use bazaar_flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult, StepDef};
use common::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CheckoutFlow {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PayoutFlow {
  num: i32,
}

#[tokio::test]
async fn test_registry_runs_pipeline_for_context_type() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut checkout = Pipeline::<CheckoutFlow, TestError>::new("checkout", &[StepDef::required("price")]);
  checkout.on("price", |ctx: ContextData<CheckoutFlow>| {
    Box::pin(async move {
      ctx.write().val = "priced".to_string();
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  flows.register(checkout);

  let mut payout = Pipeline::<PayoutFlow, TestError>::new("payout", &[StepDef::required("compute")]);
  payout.on("compute", |ctx: ContextData<PayoutFlow>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });
  flows.register(payout);

  assert_eq!(flows.len(), 2);
  assert!(flows.contains::<CheckoutFlow>());

  let checkout_ctx = ContextData::new(CheckoutFlow::default());
  assert_eq!(flows.run(checkout_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(checkout_ctx.read().val, "priced");

  let payout_ctx = ContextData::new(PayoutFlow::default());
  assert_eq!(flows.run(payout_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(payout_ctx.read().num, 100);
}

#[tokio::test]
async fn test_registry_pipeline_not_found() {
  setup_tracing();
  let flows = Flows::<TestError>::new();
  assert!(flows.is_empty());

  #[derive(Debug, Default)]
  struct UnregisteredContext;

  let result = flows.run(ContextData::new(UnregisteredContext)).await;
  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_pipeline_itself_errors() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut checkout = Pipeline::<CheckoutFlow, TestError>::new("checkout", &[StepDef::required("fail")]);
  checkout.on("fail", |_ctx: ContextData<CheckoutFlow>| {
    Box::pin(async move { Err(TestError::Handler("Total mismatch".to_string())) })
  });
  flows.register(checkout);

  let result = flows.run(ContextData::new(CheckoutFlow::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("Total mismatch".to_string()));
}

#[tokio::test]
async fn test_register_replaces_existing_pipeline() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  for label in ["first", "second"] {
    let mut p = Pipeline::<CheckoutFlow, TestError>::new(label, &[StepDef::required("tag")]);
    p.on("tag", move |ctx: ContextData<CheckoutFlow>| {
      Box::pin(async move {
        ctx.write().val = label.to_string();
        Ok::<_, TestError>(PipelineControl::Continue)
      })
    });
    flows.register(p);
  }

  let ctx = ContextData::new(CheckoutFlow::default());
  flows.run(ctx.clone()).await.unwrap();
  assert_eq!(flows.len(), 1);
  assert_eq!(ctx.read().val, "second");
}
