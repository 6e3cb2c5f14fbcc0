// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod qwen_parser;
pub mod scanner;

pub use qwen_parser::detect_tool_call_start_qwen;
pub use scanner::{JsonSpan, scan_json};

use serde_json::{Map, Value};

use super::error::{CallError, json_kind};

/// Keys holding the function name and its arguments, in lookup order.
const NAME_KEYS: &[&str] = &["name"];
const ARGUMENTS_KEYS: &[&str] = &["arguments", "parameters"];

/// Parse `json` and require a JSON object.
pub(crate) fn parse_object(json: &str) -> Result<Map<String, Value>, CallError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(CallError::ArgumentsNotObject(json_kind(&other))),
    }
}

/// Arguments may arrive as an object or as a string holding an encoded object.
pub(crate) fn decode_arguments(value: &Value) -> Result<Map<String, Value>, CallError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::String(encoded) => parse_object(encoded),
        other => Err(CallError::ArgumentsNotObject(json_kind(other))),
    }
}

/// Decode `{"name": ..., "arguments": {...}}`. Missing arguments mean no arguments.
pub(crate) fn decode_call_object(value: &Value) -> Result<(String, Map<String, Value>), CallError> {
    let object = value
        .as_object()
        .ok_or(CallError::ArgumentsNotObject(json_kind(value)))?;

    let name = NAME_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(CallError::MissingName)?;

    let arguments = match ARGUMENTS_KEYS.iter().find_map(|key| object.get(*key)) {
        Some(arguments) => decode_arguments(arguments)?,
        None => Map::new(),
    };

    Ok((name.to_string(), arguments))
}

/// A call body that is either one call object or a list of them; the first one is used.
pub(crate) fn decode_call_list(value: &Value) -> Result<(String, Map<String, Value>), CallError> {
    match value {
        Value::Array(calls) => calls
            .first()
            .ok_or(CallError::EmptyCallList)
            .and_then(decode_call_object),
        other => decode_call_object(other),
    }
}
