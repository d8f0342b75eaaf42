//! Dynamic values
//!
//! Runtime data generation for `$`-prefixed template tags:
//! - `{{$uuid}}` / `{{$guid}}` - Random UUID v4
//! - `{{$uuid7}}` - Time-ordered UUID v7
//! - `{{$timestamp}}` - Unix timestamp (seconds)
//! - `{{$timestampMs}}` - Unix timestamp (milliseconds)
//! - `{{$isoTimestamp}}` - Current ISO 8601 timestamp
//! - `{{$randomInt}}` - Random integer (0 to 1000)
//! - `{{$randomInt:MIN:MAX}}` - Random integer in range
//! - `{{$randomHex:LEN}}` - Random hex string
//! - `{{$randomString:LEN}}` - Random alphanumeric string
//!
//! The `$` prefix keeps these out of the user variable namespace: variable
//! names never contain `$`, so `interpolate` leaves these tags untouched
//! and this pass picks them up afterwards. Unknown tags are left verbatim.

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use uuid::Uuid;

// Cached regex to avoid recompilation in hot paths
static DYNAMIC_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\$([A-Za-z][A-Za-z0-9]*)((?::[^:}\s]+)*)\s*\}\}").unwrap()
});

/// Expand all dynamic `{{$name}}` tags in a string.
///
/// Each occurrence is generated independently, so two `{{$uuid}}` tags in
/// one template produce two different values.
pub fn expand_dynamic_values(input: &str) -> String {
    if !input.contains("{{") {
        return input.to_string();
    }

    DYNAMIC_VALUE_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let args: Vec<&str> = caps[2].split(':').filter(|s| !s.is_empty()).collect();
            match generate_dynamic_value(name, &args) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Generate a dynamic value based on tag name and optional args
fn generate_dynamic_value(name: &str, args: &[&str]) -> Option<String> {
    match name {
        // UUIDs
        "uuid" | "guid" => Some(Uuid::new_v4().to_string()),
        "uuid7" => Some(Uuid::now_v7().to_string()),

        // Timestamps
        "timestamp" => Some(Utc::now().timestamp().to_string()),
        "timestampMs" => Some(Utc::now().timestamp_millis().to_string()),
        "isoTimestamp" => Some(Utc::now().to_rfc3339()),

        // Random integers
        "randomInt" => {
            let mut rng = rand::rng();
            match args {
                [] => Some(rng.random_range(0..=1000).to_string()),
                [max] => {
                    let max: i64 = max.parse().ok()?;
                    Some(rng.random_range(0..=max).to_string())
                }
                [min, max, ..] => {
                    let min: i64 = min.parse().ok()?;
                    let max: i64 = max.parse().ok()?;
                    if min > max {
                        return None;
                    }
                    Some(rng.random_range(min..=max).to_string())
                }
            }
        }

        // Random hex string
        "randomHex" => {
            let len = args.first().and_then(|s| s.parse().ok()).unwrap_or(32);
            let mut rng = rand::rng();
            Some((0..len).map(|_| format!("{:x}", rng.random_range(0..16))).collect())
        }

        // Random alphanumeric string
        "randomString" => {
            let len = args.first().and_then(|s| s.parse().ok()).unwrap_or(16);
            const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
            let mut rng = rand::rng();
            Some(
                (0..len)
                    .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
                    .collect(),
            )
        }

        _ => None,
    }
}
