//! FlowPulse library interface
//!
//! A scriptable API collection runner: attach a pre-request script and a
//! test script to each saved request, run a whole collection sequentially,
//! and let values produced by one script flow into later requests.
//!
//! # Module Organization
//!
//! - [`scripting`] - QuickJS sandbox exposing the `pm` / `console` surface
//! - [`runner`] - Sequential collection execution, summaries, reports
//! - [`interpolate`] - `{{variable}}` template substitution
//! - [`magic`] - Dynamic `{{$uuid}}`-style values
//! - [`models`] - Collection / saved request data model
//! - [`store`] - Request store contract ([`store::InMemoryStore`] included)
//! - [`executor`] - Request execution primitive (reqwest-backed default)
//! - [`errors`] - Error types ([`FlowpulseError`], [`Result`])
//!
//! # Example
//!
//! ```no_run
//! use flowpulse::{
//!     CollectionRunner, HttpExecutor, HttpExecutorOptions, InMemoryStore, RunnerConfig,
//! };
//!
//! # async fn run(store: InMemoryStore) -> flowpulse::Result<()> {
//! let executor = HttpExecutor::new(HttpExecutorOptions::default())?;
//! let runner = CollectionRunner::new(store, executor)?;
//!
//! let summary = runner
//!     .run_collection(RunnerConfig::new("my-collection"))
//!     .await?;
//! println!("{}", flowpulse::format_run_summary(&summary));
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod executor;
pub mod interpolate;
pub mod magic;
pub mod models;
pub mod runner;
pub mod scripting;
pub mod store;

pub use errors::{FlowpulseError, Result};
pub use executor::{ExecutedResponse, HttpExecutor, HttpExecutorOptions, PreparedRequest, RequestExecutor};
pub use interpolate::interpolate;
pub use models::{Collection, KeyValue, RequestBody, SavedRequest};
pub use runner::{
    format_run_summary, generate_report, CollectionRunner, ReportConfig, ReportFormat,
    RequestExecutionResult, RunEvent, RunSummary, RunnerConfig,
};
pub use scripting::{
    GrpcStatus, ResponseContext, ScriptContext, ScriptExecutionResult, ScriptSandbox, TestResult,
};
pub use store::{InMemoryStore, RequestStore};
