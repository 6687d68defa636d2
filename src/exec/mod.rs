// src/exec/mod.rs

//! Run execution layer.
//!
//! - [`executor_loop`] owns the background loop that runs each scheduled
//!   unit through the [`PipelineRunner`](crate::pipeline::PipelineRunner)
//!   and reports the outcome back to the runtime.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests swap in a fake.

pub mod backend;
pub mod executor_loop;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
