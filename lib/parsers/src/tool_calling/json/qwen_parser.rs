// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `<tool_call>{"name": ..., "arguments": {...}}</tool_call>` followed later by
//! `<tool_response>...</tool_response>`.

use serde_json::Value;

use super::decode_call_object;
use super::scanner::scan_json;
use crate::tool_calling::error::CallError;
use crate::tool_calling::span::{CallIds, CallKind, CallSite, Span, TagPair, pair_calls};

const CALL_START: &str = "<tool_call>";
const CALL_END: &str = "</tool_call>";
/// Body of a `<tool_call>` wrapping a Llama-3 function block.
const FUNCTION_START: &str = "<function=";

pub(crate) const RESPONSE_TAGS: TagPair = TagPair::new("<tool_response>", "</tool_response>");

/// The body after `<tool_call>` can not be told apart from a Llama-3 wrapper yet.
fn is_undecided(body: &str) -> bool {
    body.is_empty() || (FUNCTION_START.starts_with(body) && body.len() < FUNCTION_START.len())
}

/// True when some `<tool_call>` opens a JSON body, or the body has not arrived yet.
pub fn detect_tool_call_start_qwen(text: &str) -> bool {
    text.match_indices(CALL_START).any(|(pos, tag)| {
        let body = text[pos + tag.len()..].trim_start();
        is_undecided(body) || body.starts_with('{')
    })
}

pub(crate) fn collect_spans_qwen(text: &str, ids: CallIds<'_>) -> Vec<Span> {
    let mut calls = Vec::new();
    let mut hidden_tail = None;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(CALL_START) {
        let start = cursor + rel;
        let body_start = start + CALL_START.len();
        let body = &text[body_start..];
        let json_start = body_start + (body.len() - body.trim_start().len());

        if is_undecided(&text[json_start..]) {
            hidden_tail = Some(start);
            break;
        }
        if !text[json_start..].starts_with('{') {
            // Llama-3 style `<tool_call><function=...>` and stray tags.
            cursor = body_start;
            continue;
        }

        let Some(json) = scan_json(text, json_start) else {
            if text[json_start..].contains(CALL_END) {
                tracing::debug!(start, "unbalanced tool call body, kept as text");
                cursor = body_start;
                continue;
            }
            hidden_tail = Some(start);
            break;
        };

        let decoded = serde_json::from_str::<Value>(json.json)
            .map_err(CallError::from)
            .and_then(|value| decode_call_object(&value));
        let (name, arguments) = match decoded {
            Ok(call) => call,
            Err(err) => {
                tracing::debug!(start, %err, "dropping malformed tool call");
                cursor = json.end;
                continue;
            }
        };

        let after = &text[json.end..];
        let gap = after.len() - after.trim_start().len();
        let trailing = after.trim_start();
        let end = if trailing.starts_with(CALL_END) {
            json.end + gap + CALL_END.len()
        } else if !trailing.is_empty() && CALL_END.starts_with(trailing) {
            text.len()
        } else {
            json.end
        };

        calls.push(CallSite {
            start,
            end,
            kind: CallKind::Tool { name, arguments },
        });
        cursor = end;
    }

    let text_for_pairing = &text[..hidden_tail.unwrap_or(text.len())];
    let results = RESPONSE_TAGS.find_closed(text_for_pairing);
    let mut spans = pair_calls(text_for_pairing, calls, results, &[RESPONSE_TAGS], ids);
    if let Some(start) = hidden_tail {
        spans.push(Span::consumed(start, text.len()));
    }

    tracing::trace!(spans = spans.len(), "qwen spans");
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Segment;
    use rstest::rstest;
    use serde_json::json;

    fn calls(text: &str) -> Vec<Span> {
        let mut spans = collect_spans_qwen(text, CallIds::new("m"));
        spans.sort_by_key(|span| span.start);
        spans
    }

    #[rstest]
    #[case("<tool_call>{\"name\": \"ls\"}</tool_call>", true, "complete call")]
    #[case("thinking about it <tool_call>\n", true, "body not arrived")]
    #[case("<tool_call>{\"na", true, "body streaming")]
    #[case("<tool_call>\n<func", true, "wrapper body undecided")]
    #[case("<tool_call><function=ls>", false, "llama wrapper")]
    #[case("plain text", false, "no tag")]
    fn test_detect(#[case] text: &str, #[case] expected: bool, #[case] _description: &str) {
        assert_eq!(detect_tool_call_start_qwen(text), expected);
    }

    #[test]
    fn test_call_with_result() {
        let text = "<tool_call>{\"name\":\"ls\",\"arguments\":{}}</tool_call><tool_response>a.txt\nb.txt</tool_response>Done.";
        let spans = calls(text);
        let call = spans[0].segment.as_ref().and_then(Segment::as_tool_call).unwrap();
        assert_eq!(call.name, "ls");
        assert_eq!(call.output.as_deref(), Some("a.txt\nb.txt"));
        assert!(!call.is_pending);
        assert_eq!(&text[spans[1].end..], "Done.");
        assert!(spans[1].segment.is_none());
    }

    #[test]
    fn test_nested_arguments_and_newline_before_close() {
        let text = "<tool_call>\n{\"name\": \"write\", \"arguments\": {\"body\": \"}{\", \"opts\": {\"a\": 1}}}\n</tool_call>";
        let spans = calls(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, text.len());
        let call = spans[0].segment.as_ref().and_then(Segment::as_tool_call).unwrap();
        assert_eq!(
            serde_json::Value::Object(call.arguments.clone()),
            json!({"body": "}{", "opts": {"a": 1}})
        );
        assert!(call.is_pending);
    }

    #[test]
    fn test_streaming_body_is_hidden() {
        let text = "Let me look.<tool_call>{\"name\": \"ls\", \"argu";
        let spans = calls(text);
        assert_eq!(spans, vec![Span::consumed(12, text.len())]);
    }

    #[test]
    fn test_undecided_wrapper_is_hidden() {
        let text = "Sure.\n<tool_call>\n<fun";
        assert_eq!(calls(text), vec![Span::consumed(6, text.len())]);
    }

    #[test]
    fn test_partial_close_tag_is_absorbed() {
        let text = "<tool_call>{\"name\": \"ls\"}</tool_ca";
        let spans = calls(text);
        assert_eq!(spans[0].end, text.len());
    }

    #[test]
    fn test_malformed_call_is_dropped() {
        let text = "<tool_call>{\"arguments\": {}}</tool_call>";
        assert!(calls(text).is_empty());
    }

    #[test]
    fn test_live_output() {
        let text = "<tool_call>{\"name\": \"ls\"}</tool_call>\n<tool_response>a.txt\n";
        let spans = calls(text);
        let call = spans[0].segment.as_ref().and_then(Segment::as_tool_call).unwrap();
        assert!(call.is_streaming);
        assert_eq!(call.output.as_deref(), Some("a.txt"));
    }
}
