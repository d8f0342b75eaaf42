//! Scripting support for FlowPulse
//!
//! Executes user-authored pre-request and test scripts in an embedded
//! QuickJS sandbox. A script sees exactly two names, `pm` and `console`,
//! and nothing of the host program:
//!
//! - `pm.environment.get/set/unset/has`: the variable environment
//! - `pm.response.json()/.code/.status/.headers` plus `metadata()`,
//!   `trailers()`, and `grpcStatus` for protocol variants that carry them
//! - `pm.test(name, fn)`: record a named test outcome
//! - `pm.expect(value)`: chai-style fluent assertions
//! - `console.log/warn/error`: captured into the result's logs
//!
//! Execution is a pure function of (script text, context): the sandbox has
//! no network, timer, or filesystem access, and each invocation runs in a
//! fresh context. This is capability-based best-effort isolation, not a
//! hardened security boundary.

mod api;
mod bridge;
pub mod context;
pub mod sandbox;

pub use context::{
    GrpcStatus, ResponseContext, ScriptContext, ScriptExecutionResult, TestResult,
};
pub use sandbox::ScriptSandbox;
