// src/pipeline/hooks.rs

//! Handler registration for the three phases of a step.

use crate::context::{ContextData, Handler};
use crate::control::PipelineControl;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;

fn wrap<T, E, F, HErr>(handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static) -> Handler<T, E>
where
  T: 'static + Send + Sync,
  E: 'static,
  F: Future<Output = Result<PipelineControl, HErr>> + Send + 'static,
  HErr: Into<E> + Send + Sync + 'static,
{
  Box::new(move |ctx| {
    let fut = handler_fn(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}

fn push<T: 'static + Send + Sync, E>(phase: &mut HashMap<String, Vec<Handler<T, E>>>, step_name: &str, handler: Handler<T, E>) {
  phase.entry(step_name.to_string()).or_default().push(handler);
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Handlers run in registration order within each phase.
  /// The handler's own error type only has to convert into `E`.
  pub fn before<F, HErr>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.before, step_name, wrap(handler_fn));
  }

  pub fn on<F, HErr>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.on, step_name, wrap(handler_fn));
  }

  pub fn after<F, HErr>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HErr>> + Send + 'static,
    HErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push(&mut self.after, step_name, wrap(handler_fn));
  }
}
