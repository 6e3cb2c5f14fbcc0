// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Command markup: `<||SYSTEM.EXEC>cmd<SYSTEM.EXEC||>` answered by
//! `<||SYSTEM.OUTPUT>text<SYSTEM.OUTPUT||>`.
//!
//! Models regularly drop the `<||` lead-in, and some glue a `[TOOL_CALLS]` in front of the
//! command; both variants are accepted.

use crate::tool_calling::span::{CallIds, CallKind, CallSite, Span, TagPair, pair_calls};

const EXEC_PREFIX: &str = "<||";
const EXEC_OPEN: &str = "SYSTEM.EXEC>";
const EXEC_CLOSE: &str = "<SYSTEM.EXEC||>";
const GLUE: &str = "[TOOL_CALLS]";

const OUTPUT_TAGS: TagPair =
    TagPair::with_optional_prefix("<||", "SYSTEM.OUTPUT>", "<SYSTEM.OUTPUT||>");

pub fn detect_tool_call_start_exec(text: &str) -> bool {
    text.contains(EXEC_OPEN)
}

/// Start of the command markup, widened over an optional `<||` and `[TOOL_CALLS]`.
fn markup_start(text: &str, open_pos: usize) -> usize {
    let mut start = open_pos;
    if text[..start].ends_with(EXEC_PREFIX) {
        start -= EXEC_PREFIX.len();
    }
    if text[..start].ends_with(GLUE) {
        start -= GLUE.len();
    }
    start
}

pub(crate) fn collect_spans_exec(text: &str, ids: CallIds<'_>) -> Vec<Span> {
    let mut calls = Vec::new();
    let mut hidden_tail = None;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(EXEC_OPEN) {
        let open_pos = cursor + rel;
        let start = markup_start(text, open_pos);
        let body_start = open_pos + EXEC_OPEN.len();

        let body = &text[body_start..];
        let next_open = body.find(EXEC_OPEN);
        let Some(close) = body.find(EXEC_CLOSE) else {
            if next_open.is_some() {
                tracing::debug!(start, "unclosed command, kept as text");
                cursor = body_start;
                continue;
            }
            hidden_tail = Some(start);
            break;
        };
        if next_open.is_some_and(|next| next < close) {
            tracing::debug!(start, "command reopened before its close, kept as text");
            cursor = body_start;
            continue;
        }
        let end = body_start + close + EXEC_CLOSE.len();
        let command = text[body_start..body_start + close].trim();

        if command.is_empty() {
            tracing::debug!(start, "empty command, kept as text");
        } else {
            calls.push(CallSite {
                start,
                end,
                kind: CallKind::Command {
                    command: command.to_string(),
                },
            });
        }
        cursor = end;
    }

    let text_for_pairing = &text[..hidden_tail.unwrap_or(text.len())];
    let results = OUTPUT_TAGS.find_closed(text_for_pairing);
    let mut spans = pair_calls(text_for_pairing, calls, results, &[OUTPUT_TAGS], ids);
    if let Some(start) = hidden_tail {
        spans.push(Span::consumed(start, text.len()));
    }

    tracing::trace!(spans = spans.len(), "command spans");
    spans
}
