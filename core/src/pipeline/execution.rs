// src/pipeline/execution.rs

use crate::context::{ContextData, Handler};
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

/// What a single phase (or a whole step) ended with.
enum PhaseOutcome<E> {
  Continue,
  Stop,
  Failed(E),
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, E> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip) = &step_def.skip_if {
        let skipped = {
          let guard = ctx_data.read();
          skip(&guard)
        };
        if skipped {
          event!(Level::DEBUG, step = step_name, "Step skipped.");
          continue;
        }
      }

      if !self.has_handlers(step_name) {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Required step has no handlers.");
        return Err(E::from(FlowError::HandlerMissing {
          pipeline: self.name.clone(),
          step_name: step_def.name.clone(),
        }));
      }

      let span = info_span!("pipeline_step", step = step_name, step_index = step_idx, optional = step_def.optional);
      match self.run_step(step_name, &ctx_data).instrument(span).await {
        PhaseOutcome::Continue => {}
        PhaseOutcome::Stop => {
          event!(Level::INFO, step = step_name, "Pipeline stopped by handler.");
          return Ok(PipelineResult::Stopped);
        }
        PhaseOutcome::Failed(e) if step_def.optional => {
          event!(Level::WARN, step = step_name, error = %e, "Optional step failed; continuing.");
        }
        PhaseOutcome::Failed(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_name: &str, ctx_data: &ContextData<T>) -> PhaseOutcome<E> {
    for (phase_name, phase) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      let Some(handlers) = phase.get(step_name) else {
        continue;
      };
      match run_phase(phase_name, handlers, ctx_data).await {
        PhaseOutcome::Continue => {}
        other => return other,
      }
    }
    PhaseOutcome::Continue
  }
}

async fn run_phase<T, E>(phase_name: &str, handlers: &[Handler<T, E>], ctx_data: &ContextData<T>) -> PhaseOutcome<E>
where
  T: 'static + Send + Sync,
  E: std::fmt::Display,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return PhaseOutcome::Stop,
      Err(e) => {
        event!(Level::DEBUG, phase = phase_name, handler_index = handler_idx, error = %e, "Handler failed.");
        return PhaseOutcome::Failed(e);
      }
    }
  }
  PhaseOutcome::Continue
}
