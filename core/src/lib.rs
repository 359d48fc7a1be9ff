// src/lib.rs

//! bazaar-flow: asynchronous step pipelines.
//!
//! A pipeline is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handler lists that operate on a shared [`ContextData<T>`].
//! Handlers may stop the run early. Required steps propagate handler errors;
//! optional steps log them and let the run continue.
//!
//! [`Flows<E>`] keeps one pipeline per context type so a service can register
//! its workflows once at start-up and run them per request:
//!
//! ```ignore
//! let mut p = Pipeline::<Signup, AppError>::new("signup", &[
//!   StepDef::required("validate"),
//!   StepDef::optional("welcome_mail"),
//! ]);
//! p.on("validate", |ctx| Box::pin(async move { /* ... */ Ok(PipelineControl::Continue) }));
//! flows.register(p);
//! flows.run(ContextData::new(Signup::default())).await?;
//! ```

pub mod context;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context::{ContextData, Handler};
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::Flows;
pub use crate::step::{SkipCondition, StepDef};
