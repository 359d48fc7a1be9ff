// tests/context_management_tests.rs
mod common;

use bazaar_flow::{ContextData, Pipeline, PipelineControl, StepDef};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_context_data_is_shared_and_modified() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "shared",
    &[StepDef::required("step1_modify"), StepDef::required("step2_read_modify")],
  );

  pipeline.on("step1_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter = 10;
      guard.message = "SetByStep1".to_string();
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });

  pipeline.on("step2_read_modify", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.counter, 10);
      guard.counter += 5;
      guard.message.push_str("_ThenStep2");
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let final_ctx = ctx.into_inner().expect("pipeline released all handles");
  assert_eq!(final_ctx.counter, 15);
  assert_eq!(final_ctx.message, "SetByStep1_ThenStep2");
}

#[tokio::test]
#[serial]
async fn test_context_data_clone_shares_data() {
  let original_ctx = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned_ctx = original_ctx.clone();

  original_ctx.write().counter = 5;
  assert_eq!(cloned_ctx.read().counter, 5);

  cloned_ctx.write().counter = 10;
  assert_eq!(original_ctx.read().counter, 10);
}

#[tokio::test]
#[serial]
async fn test_into_inner_fails_while_shared() {
  let ctx = ContextData::new(TestContext::default());
  let other = ctx.clone();

  let ctx = ctx.into_inner().unwrap_err();
  drop(other);
  assert!(ctx.into_inner().is_ok());
}

#[tokio::test]
#[serial]
async fn test_context_data_locks_with_await() {
  let ctx = ContextData::new(TestContext::default());

  let handler_logic = async {
    let initial_count = {
      let guard = ctx.read();
      guard.counter
    };

    tokio::time::sleep(std::time::Duration::from_millis(1)).await;

    ctx.write().counter = initial_count + 1;
  };

  handler_logic.await;
  assert_eq!(ctx.read().counter, 1);
  assert!(ctx.try_write().is_some());
}
