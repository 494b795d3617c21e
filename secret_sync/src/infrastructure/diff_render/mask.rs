// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Masking
//!
//! Keeps secret material out of rendered diffs. A value is masked when
//! its key looks sensitive (password, secret, token, api key, credential)
//! or when it is longer than 40 characters; the replacement reveals only
//! the original length (`***<len>***`). Short values under ordinary keys
//! render verbatim.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use secret_sync_domain::value_objects::Secret;

/// Values longer than this are masked regardless of key
pub const MASK_LENGTH_LIMIT: usize = 40;

fn sensitive_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(password|secret|token|api[-_]?key|credential)").expect("static pattern compiles")
    })
}

/// True when a key name alone warrants masking
pub fn is_sensitive_key(key: &str) -> bool {
    sensitive_key_pattern().is_match(key)
}

/// Renders one scalar for display, masking per key and length rules.
pub fn mask_scalar(key: &str, rendered: &str) -> String {
    if is_sensitive_key(key) || rendered.len() > MASK_LENGTH_LIMIT {
        format!("***{}***", rendered.len())
    } else {
        rendered.to_string()
    }
}

/// Recursively masks a JSON value. Nested mappings mask by their own
/// keys; sequence elements inherit the enclosing key.
pub fn masked_value(key: &str, value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(child_key, child)| (child_key.clone(), masked_value(child_key, child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| masked_value(key, item)).collect()),
        scalar => {
            let rendered = scalar_text(scalar);
            let masked = mask_scalar(key, &rendered);
            if masked == rendered {
                scalar.clone()
            } else {
                Value::String(masked)
            }
        }
    }
}

/// Masks every leaf of a secret.
pub fn masked_secret(secret: &Secret) -> Value {
    Value::Object(
        secret
            .as_map()
            .iter()
            .map(|(key, value)| (key.clone(), masked_value(key, value)))
            .collect(),
    )
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
