//! Script sandbox powered by QuickJS via rquickjs
//!
//! Executes one script body against a context and captures variables, test
//! results, and logs. `execute` never throws outward: every failure mode
//! lands in the result's `error` field instead.

use rquickjs::{Context, Ctx, Runtime, Value};
use tracing::debug;

use crate::errors::{FlowpulseError, Result};
use crate::scripting::api::PM_PRELUDE;
use crate::scripting::bridge;
use crate::scripting::context::{ScriptContext, ScriptExecutionResult};

/// Memory limit per runtime (64MB) to prevent runaway scripts
const MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Max stack size per runtime
const MAX_STACK_SIZE: usize = 1024 * 1024;

/// Isolated script execution unit
///
/// A fresh QuickJS context is created per invocation, so no state leaks
/// between script runs; the runtime (and its resource limits) is reused.
pub struct ScriptSandbox {
    runtime: Runtime,
}

impl ScriptSandbox {
    /// Create a new sandbox
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| FlowpulseError::Script(format!("Failed to create JS runtime: {}", e)))?;

        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(MAX_STACK_SIZE);

        Ok(Self { runtime })
    }

    /// Execute a script against a context.
    ///
    /// Top-level failures (syntax errors, uncaught exceptions, capability
    /// violations) populate the result's `error`; whatever variables, test
    /// results, and logs were accumulated before the failure point are
    /// still returned. Assertion failures inside `pm.test` are recorded as
    /// failed test results and never reach `error`.
    pub fn execute(&self, source: &str, context: &ScriptContext) -> ScriptExecutionResult {
        match self.run(source, context) {
            Ok(result) => result,
            Err(err) => ScriptExecutionResult {
                updated_variables: context.variables().clone(),
                test_results: Vec::new(),
                logs: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }

    /// Validate script syntax without executing it
    pub fn check(&self, source: &str) -> Result<()> {
        let context = Context::full(&self.runtime)
            .map_err(|e| FlowpulseError::Script(format!("Failed to create JS context: {}", e)))?;

        context.with(|ctx| {
            // Wrapping as a function expression parses the body without
            // running it
            let wrapped = format!("(function(pm, console) {{\n{}\n}})", source);
            ctx.eval::<Value, _>(wrapped.as_bytes())
                .map_err(|err| {
                    FlowpulseError::Script(format!("JS syntax error: {}", caught_message(&ctx, err)))
                })?;
            Ok(())
        })
    }

    fn run(&self, source: &str, input: &ScriptContext) -> Result<ScriptExecutionResult> {
        let context = Context::full(&self.runtime)
            .map_err(|e| FlowpulseError::Script(format!("Failed to create JS context: {}", e)))?;

        context.with(|ctx| {
            bridge::inject_context(&ctx, input.variables(), input.response())?;

            ctx.eval::<Value, _>(PM_PRELUDE.as_bytes())
                .map_err(|e| {
                    FlowpulseError::Script(format!("Failed to initialize sandbox: {}", e))
                })?;

            // The script's only bound names are the two capability objects
            let wrapped = format!(
                "(function(pm, console) {{\n{}\n}})(globalThis.__pm, globalThis.__console);",
                source
            );

            let error = match ctx.eval::<Value, _>(wrapped.as_bytes()) {
                Ok(_) => None,
                Err(err) => Some(caught_message(&ctx, err)),
            };

            if let Some(ref message) = error {
                debug!(error = %message, "script failed outside pm.test");
            }

            let collected: String = ctx
                .eval("globalThis.__collect()".as_bytes())
                .map_err(|e| {
                    FlowpulseError::Script(format!("Failed to collect sandbox outcome: {}", e))
                })?;
            let outcome = bridge::parse_collected(&collected)?;

            Ok(ScriptExecutionResult {
                updated_variables: outcome.variables,
                test_results: outcome.tests,
                logs: outcome.logs,
                error,
            })
        })
    }
}

/// Render the pending exception as an error message
fn caught_message(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    match err {
        rquickjs::Error::Exception => {
            let caught = ctx.catch();
            if let Some(obj) = caught.as_object() {
                let name: Option<String> = obj.get("name").ok();
                let message: Option<String> = obj.get("message").ok();
                match (name, message) {
                    (Some(name), Some(message)) if name != "Error" => {
                        format!("{}: {}", name, message)
                    }
                    (_, Some(message)) => message,
                    (Some(name), None) => name,
                    _ => "Script threw an exception".to_string(),
                }
            } else if let Some(s) = caught.as_string() {
                s.to_string()
                    .unwrap_or_else(|_| "Script threw an exception".to_string())
            } else {
                "Script threw an exception".to_string()
            }
        }
        other => other.to_string(),
    }
}
