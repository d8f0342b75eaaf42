//! Sandbox context bridge
//!
//! Marshals the script context into the QuickJS global scope before a run
//! and parses the collected outcome back out afterwards.

use rquickjs::{Array, Ctx, IntoJs, Object, Value};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::errors::FlowpulseError;
use crate::scripting::context::{ResponseContext, TestResult};

/// Raw collected outcome, as serialized by the prelude's `__collect`
#[derive(Debug, Deserialize)]
pub(crate) struct CollectedOutcome {
    pub variables: HashMap<String, String>,
    pub tests: Vec<TestResult>,
    pub logs: Vec<String>,
}

/// Inject the variable snapshot and optional response context into the
/// JavaScript global scope as `__vars` / `__response`.
pub(crate) fn inject_context(
    ctx: &Ctx<'_>,
    variables: &HashMap<String, String>,
    response: Option<&ResponseContext>,
) -> Result<(), FlowpulseError> {
    let globals = ctx.globals();

    let vars_obj = hashmap_to_js_object(ctx, variables)?;
    globals
        .set("__vars", vars_obj)
        .map_err(|e| FlowpulseError::Script(format!("Failed to set variables global: {}", e)))?;

    if let Some(resp) = response {
        let response_obj = Object::new(ctx.clone())
            .map_err(|e| FlowpulseError::Script(format!("Failed to create response object: {}", e)))?;

        response_obj
            .set("status", resp.status as i32)
            .map_err(|e| FlowpulseError::Script(format!("Failed to set status: {}", e)))?;
        response_obj
            .set("statusText", resp.status_text.as_str())
            .map_err(|e| FlowpulseError::Script(format!("Failed to set statusText: {}", e)))?;

        let headers_obj = hashmap_to_js_object(ctx, &resp.headers)?;
        response_obj
            .set("headers", headers_obj)
            .map_err(|e| FlowpulseError::Script(format!("Failed to set headers: {}", e)))?;

        let body_val = json_to_js_value(ctx, &resp.body)?;
        response_obj
            .set("body", body_val)
            .map_err(|e| FlowpulseError::Script(format!("Failed to set body: {}", e)))?;

        if let Some(ref metadata) = resp.metadata {
            let metadata_obj = hashmap_to_js_object(ctx, metadata)?;
            response_obj
                .set("metadata", metadata_obj)
                .map_err(|e| FlowpulseError::Script(format!("Failed to set metadata: {}", e)))?;
        }

        if let Some(ref trailers) = resp.trailers {
            let trailers_obj = hashmap_to_js_object(ctx, trailers)?;
            response_obj
                .set("trailers", trailers_obj)
                .map_err(|e| FlowpulseError::Script(format!("Failed to set trailers: {}", e)))?;
        }

        if let Some(ref grpc_status) = resp.grpc_status {
            let status_obj = Object::new(ctx.clone())
                .map_err(|e| FlowpulseError::Script(format!("Failed to create grpcStatus: {}", e)))?;
            status_obj
                .set("code", grpc_status.code)
                .map_err(|e| FlowpulseError::Script(format!("Failed to set code: {}", e)))?;
            status_obj
                .set("details", grpc_status.details.as_str())
                .map_err(|e| FlowpulseError::Script(format!("Failed to set details: {}", e)))?;
            response_obj
                .set("grpcStatus", status_obj)
                .map_err(|e| FlowpulseError::Script(format!("Failed to set grpcStatus: {}", e)))?;
        }

        globals
            .set("__response", response_obj)
            .map_err(|e| FlowpulseError::Script(format!("Failed to set response global: {}", e)))?;
    }

    Ok(())
}

/// Parse the JSON produced by the prelude's `__collect` hook
pub(crate) fn parse_collected(json: &str) -> Result<CollectedOutcome, FlowpulseError> {
    serde_json::from_str(json)
        .map_err(|e| FlowpulseError::Script(format!("Failed to parse sandbox outcome: {}", e)))
}

/// Convert a HashMap<String, String> to a JavaScript object
fn hashmap_to_js_object<'js>(
    ctx: &Ctx<'js>,
    map: &HashMap<String, String>,
) -> Result<Object<'js>, FlowpulseError> {
    let obj = Object::new(ctx.clone())
        .map_err(|e| FlowpulseError::Script(format!("Failed to create object: {}", e)))?;

    for (key, value) in map {
        obj.set(key.as_str(), value.as_str())
            .map_err(|e| FlowpulseError::Script(format!("Failed to set {}: {}", key, e)))?;
    }

    Ok(obj)
}

/// Convert a serde_json::Value to a QuickJS Value
fn json_to_js_value<'js>(ctx: &Ctx<'js>, json: &JsonValue) -> Result<Value<'js>, FlowpulseError> {
    match json {
        JsonValue::Null => Ok(Value::new_null(ctx.clone())),
        JsonValue::Bool(b) => Ok(Value::new_bool(ctx.clone(), *b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Ok(Value::new_int(ctx.clone(), small))
                } else {
                    Ok(Value::new_float(ctx.clone(), i as f64))
                }
            } else if let Some(f) = n.as_f64() {
                Ok(Value::new_float(ctx.clone(), f))
            } else {
                Ok(Value::new_float(ctx.clone(), 0.0))
            }
        }
        JsonValue::String(s) => s
            .as_str()
            .into_js(ctx)
            .map_err(|e| FlowpulseError::Script(format!("Failed to convert string: {}", e))),
        JsonValue::Array(arr) => {
            let js_arr = Array::new(ctx.clone())
                .map_err(|e| FlowpulseError::Script(format!("Failed to create array: {}", e)))?;
            for (i, item) in arr.iter().enumerate() {
                let val = json_to_js_value(ctx, item)?;
                js_arr
                    .set(i, val)
                    .map_err(|e| FlowpulseError::Script(format!("Failed to set array item: {}", e)))?;
            }
            Ok(js_arr.into_value())
        }
        JsonValue::Object(obj) => {
            let js_obj = Object::new(ctx.clone())
                .map_err(|e| FlowpulseError::Script(format!("Failed to create object: {}", e)))?;
            for (key, value) in obj {
                let val = json_to_js_value(ctx, value)?;
                js_obj
                    .set(key.as_str(), val)
                    .map_err(|e| FlowpulseError::Script(format!("Failed to set object key: {}", e)))?;
            }
            Ok(js_obj.into_value())
        }
    }
}
