// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{ARGS, TOOL_CALLS, is_bracket_form, name_len};
use crate::tool_calling::json::{parse_object, scan_json};
use crate::tool_calling::json::qwen_parser::RESPONSE_TAGS;
use crate::tool_calling::span::{CallIds, CallKind, CallSite, Span, TagPair, pair_calls};

const RESULT_TAGS: [TagPair; 2] = [
    RESPONSE_TAGS,
    TagPair::new("[TOOL_RESULTS]", "[/TOOL_RESULTS]"),
];

/// Check for `[TOOL_CALLS]name[ARGS]`.
/// Format: `[TOOL_CALLS]get_weather[ARGS]{"city": "Rome"}`
pub fn detect_tool_call_start_mistral_bracket(text: &str) -> bool {
    text.match_indices(TOOL_CALLS)
        .any(|(pos, tag)| is_bracket_form(&text[pos + tag.len()..]))
}

pub(crate) fn collect_spans_mistral_bracket(text: &str, ids: CallIds<'_>) -> Vec<Span> {
    let mut calls = Vec::new();
    let mut hidden_tail = None;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(TOOL_CALLS) {
        let start = cursor + rel;
        let name_start = start + TOOL_CALLS.len();
        let rest = &text[name_start..];
        let name_end = name_start + name_len(rest);
        let after_name = &text[name_end..];

        if name_end == name_start {
            cursor = name_start;
            continue;
        }
        if !after_name.starts_with(ARGS) {
            if ARGS.starts_with(after_name) {
                // Still typing the name or `[ARGS]`.
                hidden_tail = Some(start);
                break;
            }
            cursor = name_start;
            continue;
        }

        let args_start = name_end + ARGS.len();
        let args_rest = &text[args_start..];
        let json_start = args_start + (args_rest.len() - args_rest.trim_start().len());
        if json_start == text.len() {
            hidden_tail = Some(start);
            break;
        }
        if !text[json_start..].starts_with('{') {
            tracing::debug!(start, "[ARGS] not followed by a JSON object, kept as text");
            cursor = args_start;
            continue;
        }
        let Some(json) = scan_json(text, json_start) else {
            hidden_tail = Some(start);
            break;
        };

        match parse_object(json.json) {
            Ok(arguments) => calls.push(CallSite {
                start,
                end: json.end,
                kind: CallKind::Tool {
                    name: text[name_start..name_end].to_string(),
                    arguments,
                },
            }),
            Err(err) => tracing::debug!(start, %err, "dropping malformed tool call"),
        }
        cursor = json.end;
    }

    let text_for_pairing = &text[..hidden_tail.unwrap_or(text.len())];
    let mut results: Vec<_> = RESULT_TAGS
        .iter()
        .flat_map(|tags| tags.find_closed(text_for_pairing))
        .collect();
    results.sort_by_key(|result| result.start);

    let mut spans = pair_calls(text_for_pairing, calls, results, &RESULT_TAGS, ids);
    if let Some(start) = hidden_tail {
        spans.push(Span::consumed(start, text.len()));
    }

    tracing::trace!(spans = spans.len(), "mistral bracket spans");
    spans
}
