// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

/// Reasons a candidate tool call is rejected.
///
/// These never escape the parser: a rejected candidate is logged at debug level and its
/// markup stays in the message as plain text.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("tool call body is not valid JSON: {0}")]
    MalformedArguments(#[from] serde_json::Error),

    #[error("tool call has no function name")]
    MissingName,

    #[error("tool call arguments must be a JSON object, got {0}")]
    ArgumentsNotObject(&'static str),

    #[error("tool call list is empty")]
    EmptyCallList,
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
