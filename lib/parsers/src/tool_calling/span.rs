// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Positioned spans and the call/result pairing shared by every span-collecting dialect.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::message::{CommandSegment, Segment, ToolCallSegment};
use crate::segments::cleanup::{clean_text, strip_partial_suffix};

/// A detected construct inside the raw text. `end` is exclusive.
///
/// A span without a segment swallows its markup and emits nothing (paired results, calls
/// still being typed at the end of the stream).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
    pub segment: Option<Segment>,
}

impl Span {
    pub fn new(start: usize, end: usize, segment: Segment) -> Self {
        Self {
            start,
            end,
            segment: Some(segment),
        }
    }

    pub fn consumed(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            segment: None,
        }
    }
}

/// Builds deterministic call ids from the message id and a byte position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallIds<'a> {
    message_id: &'a str,
}

impl<'a> CallIds<'a> {
    pub fn new(message_id: &'a str) -> Self {
        Self { message_id }
    }

    pub fn at(&self, position: usize) -> String {
        format!("call-{}-{}", self.message_id, position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallKind {
    Tool {
        name: String,
        arguments: Map<String, Value>,
    },
    Command {
        command: String,
    },
}

/// A complete call found by a dialect scanner, before pairing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CallSite {
    pub start: usize,
    pub end: usize,
    pub kind: CallKind,
}

/// A closed result block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResultSite {
    pub start: usize,
    pub end: usize,
    pub content: String,
}

/// Opening and closing markers of a result block.
///
/// `prefix` is an optional lead-in some models drop (`<||` in `<||SYSTEM.OUTPUT>`); when
/// present in the text it is counted as part of the tag.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TagPair {
    pub prefix: &'static str,
    pub open: &'static str,
    pub close: &'static str,
}

impl TagPair {
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self {
            prefix: "",
            open,
            close,
        }
    }

    pub const fn with_optional_prefix(
        prefix: &'static str,
        open: &'static str,
        close: &'static str,
    ) -> Self {
        Self {
            prefix,
            open,
            close,
        }
    }

    /// Start of the tag including the optional prefix when it is there.
    fn tag_start(&self, text: &str, open_pos: usize) -> usize {
        if !self.prefix.is_empty() && text[..open_pos].ends_with(self.prefix) {
            open_pos - self.prefix.len()
        } else {
            open_pos
        }
    }

    /// Every closed block, in order. Contents are trimmed.
    pub fn find_closed(&self, text: &str) -> Vec<ResultSite> {
        let mut results = Vec::new();
        let mut cursor = 0;

        while let Some(rel) = text[cursor..].find(self.open) {
            let open_pos = cursor + rel;
            let body_start = open_pos + self.open.len();
            let Some(close_rel) = text[body_start..].find(self.close) else {
                break;
            };
            let body_end = body_start + close_rel;
            let end = body_end + self.close.len();
            results.push(ResultSite {
                start: self.tag_start(text, open_pos),
                end,
                content: text[body_start..body_end].trim().to_string(),
            });
            cursor = end;
        }

        results
    }

    /// The last opening tag at or after `from` that has no closing tag after it.
    /// Returns its start and its live content up to the end of `text`.
    pub fn find_unterminated(&self, text: &str, from: usize) -> Option<(usize, String)> {
        let open_pos = from + text[from..].rfind(self.open)?;
        let body_start = open_pos + self.open.len();
        if text[body_start..].contains(self.close) {
            return None;
        }
        let live = strip_partial_suffix(&text[body_start..], self.close).trim();
        Some((self.tag_start(text, open_pos), live.to_string()))
    }
}

/// Pair calls with results and build the spans of one dialect.
///
/// Results are paired FIFO in document order: a closed result belongs to the oldest earlier
/// call that has none yet. The chronologically last call without a result is then
/// re-evaluated on every parse:
/// - an unterminated result tag after it makes its output live (`is_streaming`),
/// - otherwise, if nothing but tag fragments follows it, it is `is_pending`,
/// - otherwise it is a historical call that never got a result.
///
/// Results with no call to pair with are kept as text.
pub(crate) fn pair_calls(
    text: &str,
    calls: Vec<CallSite>,
    results: Vec<ResultSite>,
    result_tags: &[TagPair],
    ids: CallIds<'_>,
) -> Vec<Span> {
    let mut spans = Vec::with_capacity(calls.len() + results.len());
    let mut outputs: Vec<Option<String>> = vec![None; calls.len()];
    let mut waiting: VecDeque<usize> = VecDeque::new();
    let mut next_call = 0;

    for result in results {
        while next_call < calls.len() && calls[next_call].end <= result.start {
            waiting.push_back(next_call);
            next_call += 1;
        }
        match waiting.pop_front() {
            Some(call_idx) => {
                outputs[call_idx] = Some(result.content);
                spans.push(Span::consumed(result.start, result.end));
            }
            None => {
                tracing::trace!(start = result.start, "result without a call, kept as text");
                spans.push(Span::new(
                    result.start,
                    result.end,
                    Segment::text(result.content),
                ));
            }
        }
    }

    let mut live_output = None;
    let mut pending = false;
    if let Some(last) = calls.last()
        && outputs[calls.len() - 1].is_none()
    {
        let unterminated = result_tags
            .iter()
            .filter_map(|tags| tags.find_unterminated(text, last.end))
            .max_by_key(|(start, _)| *start);

        match unterminated {
            Some((start, content)) => {
                spans.push(Span::consumed(start, text.len()));
                live_output = Some(content);
            }
            None => {
                let result_after = spans.iter().any(|span| span.start >= last.end);
                pending = !result_after && clean_text(&text[last.end..]).is_empty();
            }
        }
    }

    let last_idx = calls.len().saturating_sub(1);
    for (idx, (call, output)) in calls.into_iter().zip(outputs).enumerate() {
        let is_last = idx == last_idx;
        let segment = match call.kind {
            CallKind::Tool { name, arguments } => {
                let is_streaming = is_last && live_output.is_some();
                let output = if is_streaming {
                    live_output.take()
                } else {
                    output
                };
                Segment::ToolCall(ToolCallSegment {
                    id: ids.at(call.start),
                    name,
                    arguments,
                    output,
                    is_streaming,
                    is_pending: is_last && pending,
                })
            }
            CallKind::Command { command } => {
                let output = if is_last && live_output.is_some() {
                    live_output.take()
                } else {
                    output
                };
                Segment::Command(CommandSegment { command, output })
            }
        };
        spans.push(Span::new(call.start, call.end, segment));
    }

    spans
}
