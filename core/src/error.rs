// src/error.rs
use thiserror::Error;

/// Framework-level failures. Application error types used with [`crate::Pipeline`]
/// must be constructible from this.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for required step '{step_name}' in pipeline '{pipeline}'")]
  HandlerMissing { pipeline: String, step_name: String },

  #[error("No pipeline registered for context type {type_name}")]
  NotRegistered { type_name: String },

  #[error("Context type mismatch (expected {expected_type})")]
  ContextMismatch { expected_type: String },
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
