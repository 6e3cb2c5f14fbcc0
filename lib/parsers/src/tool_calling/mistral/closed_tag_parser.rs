// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

use super::{TOOL_CALLS, is_bracket_form, name_len};
use crate::segments::cleanup::strip_partial_suffix;
use crate::tool_calling::error::CallError;
use crate::tool_calling::json::{decode_call_list, parse_object, scan_json};
use crate::tool_calling::span::{CallIds, CallKind, CallSite, ResultSite, Span, TagPair, pair_calls};

const CALLS_END: &str = "[/TOOL_CALLS]";

const RESULT_TAGS: TagPair = TagPair::new("[TOOL_RESULTS]", "[/TOOL_RESULTS]");

/// `[TOOL_CALLS]` glued in front of a `SYSTEM.EXEC` command belongs to the command.
fn is_exec_glue(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.starts_with("<||") || rest.starts_with("SYSTEM.")
}

fn is_closed_tag_body(rest: &str) -> bool {
    !is_bracket_form(rest) && !is_exec_glue(rest)
}

/// Check for a `[TOOL_CALLS]` that is neither the bracket form nor command glue.
pub fn detect_tool_call_start_mistral_closed_tag(text: &str) -> bool {
    text.match_indices(TOOL_CALLS)
        .any(|(pos, tag)| is_closed_tag_body(&text[pos + tag.len()..]))
}

/// Decode a call body: `name,{args}` first, then a JSON object or list of objects.
fn parse_body(body: &str) -> Result<(String, Map<String, Value>), CallError> {
    let body = body.trim();

    if let Some((name, arguments)) = body.split_once(',') {
        let name = name.trim();
        let arguments = arguments.trim();
        if !name.is_empty()
            && name_len(name) == name.len()
            && arguments.starts_with('{')
            && let Ok(arguments) = parse_object(arguments)
        {
            return Ok((name.to_string(), arguments));
        }
    }

    let value: Value = serde_json::from_str(body)?;
    decode_call_list(&value)
}

/// An unclosed body that is still arriving: nothing yet, an open JSON value, or a name
/// that may be followed by `,{args}`.
fn could_be_body(body: &str) -> bool {
    let body = body.trim_start();
    if body.starts_with('{') {
        return scan_json(body, 0).is_none();
    }
    if let Some(list) = body.strip_prefix('[') {
        let list = list.trim_start();
        return list.is_empty() || list.starts_with('{');
    }

    let len = name_len(body);
    match body[len..].strip_prefix(',') {
        Some(arguments) => {
            let arguments = arguments.trim_start();
            arguments.is_empty() || (arguments.starts_with('{') && scan_json(arguments, 0).is_none())
        }
        None => len == body.len(),
    }
}

/// A result body that is a JSON object with a string `content` field shows that field.
fn result_content(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(object)) => match object.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => body,
        },
        _ => body,
    }
}

pub(crate) fn collect_spans_mistral_closed_tag(text: &str, ids: CallIds<'_>) -> Vec<Span> {
    let mut calls = Vec::new();
    let mut hidden_tail = None;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(TOOL_CALLS) {
        let start = cursor + rel;
        let body_start = start + TOOL_CALLS.len();
        let rest = &text[body_start..];

        if !is_closed_tag_body(rest) {
            cursor = body_start;
            continue;
        }

        let next_open = rest.find(TOOL_CALLS);
        let close = rest
            .find(CALLS_END)
            .filter(|close| next_open.is_none_or(|next| *close < next));

        let Some(close) = close else {
            if next_open.is_some() {
                tracing::debug!(start, "tool calls reopened before their close, kept as text");
                cursor = body_start;
                continue;
            }
            // No closing tag: accept a body that is already complete, hide one that can still
            // become a call, keep prose.
            let body = strip_partial_suffix(rest.trim_end(), CALLS_END);
            match parse_body(body) {
                Ok((name, arguments)) => calls.push(CallSite {
                    start,
                    end: text.len(),
                    kind: CallKind::Tool { name, arguments },
                }),
                Err(_) if could_be_body(body) => hidden_tail = Some(start),
                Err(err) => tracing::debug!(start, %err, "unclosed tool calls, kept as text"),
            }
            break;
        };

        let end = body_start + close + CALLS_END.len();
        match parse_body(&rest[..close]) {
            Ok((name, arguments)) => {
                calls.push(CallSite {
                    start,
                    end,
                    kind: CallKind::Tool { name, arguments },
                });
                cursor = end;
            }
            Err(err) => {
                tracing::debug!(start, %err, "malformed tool call, kept as text");
                cursor = body_start;
            }
        }
    }

    let text_for_pairing = &text[..hidden_tail.unwrap_or(text.len())];
    let results: Vec<ResultSite> = RESULT_TAGS
        .find_closed(text_for_pairing)
        .into_iter()
        .map(|result| ResultSite {
            content: result_content(result.content),
            ..result
        })
        .collect();

    let mut spans = pair_calls(text_for_pairing, calls, results, &[RESULT_TAGS], ids);
    if let Some(start) = hidden_tail {
        spans.push(Span::consumed(start, text.len()));
    }

    tracing::trace!(spans = spans.len(), "mistral closed-tag spans");
    spans
}
