// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

use crate::tool_calling::json::qwen_parser::RESPONSE_TAGS;
use crate::tool_calling::span::{CallIds, CallKind, CallSite, Span, pair_calls};

const FUNCTION_START: &str = "<function=";
const FUNCTION_END: &str = "</function>";
const PARAMETER_START: &str = "<parameter=";
const PARAMETER_END: &str = "</parameter>";
const WRAPPER_START: &str = "<tool_call>";
const WRAPPER_END: &str = "</tool_call>";

/// Check for a Llama-3 style function block.
/// Format: `<function=name><parameter=key>value</parameter></function>`
pub fn detect_tool_call_start_llama3_xml(text: &str) -> bool {
    text.contains(FUNCTION_START)
}

/// A `<tool_call>` directly in front of the function (whitespace allowed) belongs to it.
fn markup_start(text: &str, function_pos: usize, floor: usize) -> usize {
    let before = text[floor..function_pos].trim_end();
    if before.ends_with(WRAPPER_START) {
        floor + before.len() - WRAPPER_START.len()
    } else {
        function_pos
    }
}

pub(crate) fn collect_spans_llama3_xml(text: &str, ids: CallIds<'_>) -> Vec<Span> {
    let mut calls = Vec::new();
    let mut hidden_tail = None;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(FUNCTION_START) {
        let function_pos = cursor + rel;
        let start = markup_start(text, function_pos, cursor);
        let name_start = function_pos + FUNCTION_START.len();

        let Some(name_len) = text[name_start..].find('>') else {
            if text[name_start..].contains(['<', '\n']) {
                cursor = name_start;
                continue;
            }
            hidden_tail = Some(start);
            break;
        };
        let name = text[name_start..name_start + name_len].trim();
        if name.is_empty() || name.contains(['<', '\n']) {
            cursor = name_start;
            continue;
        }
        let body_start = name_start + name_len + 1;
        let next_function = text[body_start..].find(FUNCTION_START);
        let body = &text[body_start..next_function.map_or(text.len(), |next| body_start + next)];

        let (body_end, mut end) = if let Some(close) = body.find(FUNCTION_END) {
            (body_start + close, body_start + close + FUNCTION_END.len())
        } else if let Some(close) = body.find(WRAPPER_END) {
            (body_start + close, body_start + close + WRAPPER_END.len())
        } else if next_function.is_none() && could_be_body(body) {
            hidden_tail = Some(start);
            break;
        } else {
            tracing::debug!(start, name, "unclosed function block, kept as text");
            cursor = body_start;
            continue;
        };

        let after = &text[end..];
        let trailing = after.trim_start();
        if trailing.starts_with(WRAPPER_END) {
            end += after.len() - trailing.len() + WRAPPER_END.len();
        } else if !trailing.is_empty() && WRAPPER_END.starts_with(trailing) {
            end = text.len();
        }

        let arguments = parse_parameters(&text[body_start..body_end]);
        if arguments.is_empty() {
            tracing::debug!(start, name, "function block without parameters, kept as text");
        } else {
            calls.push(CallSite {
                start,
                end,
                kind: CallKind::Tool {
                    name: name.to_string(),
                    arguments,
                },
            });
        }
        cursor = end;
    }

    let text_for_pairing = &text[..hidden_tail.unwrap_or(text.len())];
    let results = RESPONSE_TAGS.find_closed(text_for_pairing);
    let mut spans = pair_calls(text_for_pairing, calls, results, &[RESPONSE_TAGS], ids);
    if let Some(start) = hidden_tail {
        spans.push(Span::consumed(start, text.len()));
    }

    tracing::trace!(spans = spans.len(), "llama3 xml spans");
    spans
}

/// An unclosed function body that is still markup, not prose.
fn could_be_body(body: &str) -> bool {
    let body = body.trim_start();
    body.is_empty() || body.starts_with('<')
}

/// `<parameter=key>value</parameter>` pairs of one function body.
/// A missing `</parameter>` ends the value at the next parameter or the end of the body.
fn parse_parameters(body: &str) -> Map<String, Value> {
    let mut parameters = Map::new();
    let mut cursor = 0;

    while let Some(rel) = body[cursor..].find(PARAMETER_START) {
        let key_start = cursor + rel + PARAMETER_START.len();
        let Some(key_len) = body[key_start..].find('>') else {
            break;
        };
        let key = body[key_start..key_start + key_len].trim();
        let value_start = key_start + key_len + 1;
        let rest = &body[value_start..];

        let (value_len, consumed) = match rest.find(PARAMETER_END) {
            Some(close) => (close, close + PARAMETER_END.len()),
            None => {
                let next = rest.find(PARAMETER_START).unwrap_or(rest.len());
                (next, next)
            }
        };

        if !key.is_empty() {
            parameters.insert(key.to_string(), safe_parse_value(&rest[..value_len]));
        }
        cursor = value_start + consumed;
    }

    parameters
}

/// Lenient parameter value decoding: JSON first, then numbers and keywords, else a string.
fn safe_parse_value(raw: &str) -> Value {
    let unescaped = html_unescape(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(&unescaped) {
        return value;
    }

    if let Ok(num) = unescaped.parse::<i64>() {
        return Value::Number(num.into());
    }

    if let Ok(num) = unescaped.parse::<f64>()
        && let Some(num_val) = serde_json::Number::from_f64(num)
    {
        return Value::Number(num_val);
    }

    match unescaped.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "none" => return Value::Null,
        _ => {}
    }

    Value::String(unescaped)
}

fn html_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
