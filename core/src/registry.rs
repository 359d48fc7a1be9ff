// src/registry.rs

//! `Flows<E>`: one registered pipeline per context type.

use crate::context::ContextData;
use crate::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedRunner<E>: Send + Sync
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, E>;
}

#[async_trait]
impl<T, E> ErasedRunner<E> for Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, E> {
    let ctx_data = ctx.downcast::<ContextData<T>>().map_err(|_| {
      E::from(FlowError::ContextMismatch {
        expected_type: std::any::type_name::<T>().to_string(),
      })
    })?;
    self.run(*ctx_data).await
  }
}

/// Registry of pipelines keyed by their context type.
pub struct Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<E>>>>,
}

impl<E> Default for Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<E> Flows<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
    }
  }

  /// Registering a second pipeline for the same context type replaces the first.
  pub fn register<T>(&self, pipeline: Pipeline<T, E>)
  where
    T: 'static + Send + Sync,
  {
    event!(Level::DEBUG, pipeline = %pipeline.name(), context = %std::any::type_name::<T>(), "Registering pipeline.");
    let previous = self.pipelines.write().insert(TypeId::of::<T>(), Arc::new(pipeline));
    if previous.is_some() {
      event!(Level::WARN, context = %std::any::type_name::<T>(), "Replaced an existing pipeline.");
    }
  }

  pub fn contains<T: 'static>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.pipelines.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub async fn run<T>(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, E>
  where
    T: 'static + Send + Sync,
  {
    let runner = {
      let guard = self.pipelines.read();
      guard.get(&TypeId::of::<T>()).cloned()
    };
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<T>();
      event!(Level::ERROR, context = %type_name, "No pipeline registered.");
      return Err(E::from(FlowError::NotRegistered {
        type_name: type_name.to_string(),
      }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}
