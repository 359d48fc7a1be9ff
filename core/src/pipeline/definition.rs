// src/pipeline/definition.rs

use crate::context::Handler;
use crate::error::FlowError;
use crate::step::StepDef;
use std::collections::HashMap;

/// An ordered set of named steps over a context type `T`, with handlers
/// that fail with `E`.
pub struct Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Panics on duplicate step names; that is a wiring mistake, not a runtime condition.
  pub fn new(name: impl Into<String>, steps: &[StepDef<T>]) -> Self {
    let name = name.into();
    let mut seen = Vec::with_capacity(steps.len());
    for step in steps {
      if seen.contains(&step.name.as_str()) {
        panic!("pipeline '{}': step '{}' defined twice", name, step.name);
      }
      seen.push(step.name.as_str());
    }

    Self {
      name,
      steps: steps.to_vec(),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("pipeline '{}': unknown step '{}'", self.name, step_name);
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()))
  }
}
