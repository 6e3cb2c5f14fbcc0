// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Whole-document parser for Harmony transcripts:
//!
//! ```text
//! <|start|>assistant<|channel|>analysis<|message|>reasoning<|end|>
//! <|start|>assistant<|channel|>commentary to=functions.ls <|constrain|>json<|message|>{"path":"."}<|call|>
//! <|start|>functions.ls to=assistant<|channel|>commentary<|message|>a.txt<|end|>
//! <|start|>assistant<|channel|>final<|message|>Done.<|return|>
//! ```
//!
//! Calls are strictly sequential, so a single slot tracks the call waiting for its output.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::message::{Segment, ToolCallSegment};
use crate::tool_calling::json::parse_object;
use crate::tool_calling::span::CallIds;

const START: &str = "<|start|>";
const CHANNEL: &str = "<|channel|>";
const MESSAGE: &str = "<|message|>";
const CONSTRAIN: &str = "<|constrain|>";
const TERMINATORS: [&str; 3] = ["<|call|>", "<|end|>", "<|return|>"];

const ASSISTANT_OPENING: &str = "<|start|>assistant<|channel|>";
const FINAL_CHANNEL: &str = "final";
const FUNCTIONS_PREFIX: &str = "functions.";

static CONTROL_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
static PARTIAL_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn control_token_regex() -> &'static Regex {
    CONTROL_TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"<\|[a-z_]+\|>").expect("Failed to compile harmony control token pattern")
    })
}

/// A control token cut off by the end of the stream, e.g. `<|ch` or `<|end|`.
fn partial_token_regex() -> &'static Regex {
    PARTIAL_TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"<(\|([a-z_]+\|?)?)?$").expect("Failed to compile harmony partial token pattern")
    })
}

/// Check for an assistant block, a transcript that opens with `<|start|>`, or one whose
/// first `<|start|>assistant` was pre-filled by the chat template.
pub fn detect_tool_call_start_harmony(text: &str) -> bool {
    let opened = text.trim_start();
    text.contains(ASSISTANT_OPENING) || opened.starts_with(START) || opened.starts_with(CHANNEL)
}

/// Result of parsing one Harmony transcript.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HarmonyParse {
    pub segments: Vec<Segment>,
    /// Text of the `final` channel, or the control-token-free transcript if there is none.
    pub final_content: String,
    pub thinking_content: Option<String>,
    pub is_thinking_streaming: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Header {
    role: String,
    channel: Option<String>,
    recipient: Option<String>,
    constraint: Option<String>,
}

/// Parse a header such as `assistant<|channel|>commentary to=functions.ls <|constrain|>json`.
/// The recipient may also sit in the role part (`assistant to=functions.ls<|channel|>...`).
fn parse_header(raw: &str) -> Header {
    let normalized = raw.replace(CONSTRAIN, " ");
    let (role_part, channel_part) = match normalized.split_once(CHANNEL) {
        Some((role, channel)) => (role, Some(channel)),
        None => (normalized.as_str(), None),
    };

    let mut header = Header::default();
    let mut role_words = role_part.split_whitespace();
    header.role = role_words.next().unwrap_or_default().to_string();

    let mut channel_words = channel_part.into_iter().flat_map(str::split_whitespace);
    header.channel = channel_words.next().map(str::to_string);

    for word in role_words.chain(channel_words) {
        match word.strip_prefix("to=") {
            Some(recipient) => header.recipient = Some(recipient.to_string()),
            None => {
                if header.constraint.is_none() {
                    header.constraint = Some(word.to_string());
                }
            }
        }
    }
    header
}

/// One header + body unit of the transcript.
#[derive(Debug)]
struct HarmonyMessage<'a> {
    /// Byte offset of the message in the transcript, used for call ids.
    offset: usize,
    header: Header,
    body: &'a str,
    terminated: bool,
    /// Text after the terminator, up to the next `<|start|>`.
    trailing: &'a str,
    trailing_offset: usize,
}

/// Split one block (the text between two `<|start|>`, found at `block_start`) into its
/// message. `None` while the header is still streaming.
fn split_message(block: &str, offset: usize, block_start: usize) -> Option<HarmonyMessage<'_>> {
    let message_pos = block.find(MESSAGE)?;
    let header = parse_header(&block[..message_pos]);
    let body_start = message_pos + MESSAGE.len();
    let rest = &block[body_start..];

    let terminator = TERMINATORS
        .iter()
        .filter_map(|token| rest.find(token).map(|pos| (pos, token.len())))
        .min_by_key(|(pos, _)| *pos);

    Some(match terminator {
        Some((pos, len)) => HarmonyMessage {
            offset,
            header,
            body: &rest[..pos],
            terminated: true,
            trailing: &rest[pos + len..],
            trailing_offset: block_start + body_start + pos + len,
        },
        None => HarmonyMessage {
            offset,
            header,
            body: rest,
            terminated: false,
            trailing: "",
            trailing_offset: block_start + block.len(),
        },
    })
}

fn is_tool_output_role(role: &str) -> bool {
    role.starts_with("tool") || role.starts_with(FUNCTIONS_PREFIX)
}

/// Remove control tokens and a cut-off token at the end.
fn strip_control_tokens(text: &str) -> String {
    let blanked = control_token_regex().replace_all(text, "");
    partial_token_regex().replace(&blanked, "").trim().to_string()
}

/// Invocation body as arguments: a JSON object as-is, otherwise wrapped by constraint.
fn invocation_arguments(body: &str, constraint: Option<&str>) -> Map<String, Value> {
    let body = body.trim();
    if body.is_empty() {
        return Map::new();
    }
    if let Ok(arguments) = parse_object(body) {
        return arguments;
    }
    let key = match constraint {
        Some("code") => "code",
        _ => "input",
    };
    let mut arguments = Map::new();
    arguments.insert(key.to_string(), Value::String(body.to_string()));
    arguments
}

struct Builder<'a> {
    ids: CallIds<'a>,
    segments: Vec<Segment>,
    final_parts: Vec<String>,
    thinking_parts: Vec<String>,
    is_thinking_streaming: bool,
    /// Index in `segments` of the call waiting for its output.
    pending: Option<usize>,
}

impl<'a> Builder<'a> {
    fn new(ids: CallIds<'a>) -> Self {
        Self {
            ids,
            segments: Vec::new(),
            final_parts: Vec::new(),
            thinking_parts: Vec::new(),
            is_thinking_streaming: false,
            pending: None,
        }
    }

    fn push_text(&mut self, text: &str) {
        let text = strip_control_tokens(text);
        if !text.is_empty() {
            self.segments.push(Segment::text(text));
        }
    }

    fn push_message(&mut self, message: HarmonyMessage<'_>, is_last: bool) {
        let HarmonyMessage {
            offset,
            header,
            body,
            terminated,
            trailing,
            trailing_offset,
        } = message;

        if is_tool_output_role(&header.role) {
            self.attach_output(body, terminated);
        } else if header.role != "assistant" {
            tracing::trace!(role = %header.role, "harmony message from unexpected role, kept as text");
            self.push_text(body);
        } else if let Some(recipient) = header.recipient {
            if terminated {
                self.push_call(offset, &recipient, body, header.constraint.as_deref());
            }
        } else if header.channel.as_deref().is_none_or(|channel| channel == FINAL_CHANNEL) {
            let content = strip_control_tokens(body);
            if !content.is_empty() {
                self.final_parts.push(content.clone());
                self.segments.push(Segment::text(content));
            }
        } else {
            let content = strip_control_tokens(body);
            if !content.is_empty() {
                self.thinking_parts.push(content.clone());
                self.segments.push(Segment::thinking(content));
            }
            self.is_thinking_streaming = !terminated && is_last;
        }

        self.push_trailing(trailing_offset, trailing, is_last);
    }

    /// Text after a terminator is commentary, unless it opens another channel message.
    fn push_trailing(&mut self, offset: usize, trailing: &str, is_last: bool) {
        let opened = trailing.trim_start();
        if !opened.starts_with(CHANNEL) {
            self.push_text(trailing);
            return;
        }
        let offset = offset + (trailing.len() - opened.len());
        if let Some(mut message) = split_message(opened, offset, offset) {
            // A channel without a role header continues the assistant's turn.
            message.header.role = "assistant".to_string();
            self.push_message(message, is_last);
        }
    }

    fn push_call(&mut self, offset: usize, recipient: &str, body: &str, constraint: Option<&str>) {
        if let Some(previous) = self.pending.take()
            && let Some(Segment::ToolCall(call)) = self.segments.get_mut(previous)
        {
            call.is_pending = false;
        }

        let name = recipient
            .strip_prefix(FUNCTIONS_PREFIX)
            .unwrap_or(recipient)
            .to_string();
        self.segments.push(Segment::ToolCall(ToolCallSegment {
            id: self.ids.at(offset),
            name,
            arguments: invocation_arguments(body, constraint),
            output: None,
            is_streaming: false,
            is_pending: true,
        }));
        self.pending = Some(self.segments.len() - 1);
    }

    fn attach_output(&mut self, body: &str, terminated: bool) {
        let output = strip_control_tokens(body);
        let call = self.pending.and_then(|idx| match self.segments.get_mut(idx) {
            Some(Segment::ToolCall(call)) => Some(call),
            _ => None,
        });
        match call {
            Some(call) => {
                call.output = Some(output);
                call.is_pending = false;
                call.is_streaming = !terminated;
                if terminated {
                    self.pending = None;
                }
            }
            None => {
                tracing::debug!("harmony tool output without a call, kept as text");
                self.push_text(&output);
            }
        }
    }

    fn finish(mut self, text: &str) -> HarmonyParse {
        // Only the very last segment can still be waiting.
        if let Some(idx) = self.pending
            && idx + 1 != self.segments.len()
            && let Some(Segment::ToolCall(call)) = self.segments.get_mut(idx)
        {
            call.is_pending = false;
        }

        let final_content = if !self.final_parts.is_empty() {
            self.final_parts.join("\n\n")
        } else if text.contains(MESSAGE) {
            strip_control_tokens(text)
        } else {
            // Only headers so far.
            self.segments
                .iter()
                .filter_map(Segment::as_text)
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let thinking_content =
            (!self.thinking_parts.is_empty()).then(|| self.thinking_parts.join("\n\n"));

        HarmonyParse {
            segments: self.segments,
            final_content,
            thinking_content,
            is_thinking_streaming: self.is_thinking_streaming,
        }
    }
}

/// Parse a whole Harmony transcript into segments.
pub fn parse_harmony(text: &str, message_id: &str) -> HarmonyParse {
    let mut builder = Builder::new(CallIds::new(message_id));

    let mut blocks: Vec<(usize, &str)> = Vec::new();
    let mut cursor = 0;
    for (pos, _) in text.match_indices(START) {
        blocks.push((cursor, &text[cursor..pos]));
        cursor = pos + START.len();
    }
    blocks.push((cursor, &text[cursor..]));

    let last = blocks.len() - 1;
    for (idx, (offset, block)) in blocks.into_iter().enumerate() {
        let is_last = idx == last;
        if idx == 0 {
            // Text before the first `<|start|>`.
            let opened = block.trim_start();
            if opened.starts_with(CHANNEL) {
                builder.push_trailing(0, block, is_last);
            } else {
                builder.push_text(block);
            }
            continue;
        }

        let message_offset = offset - START.len();
        match split_message(block, message_offset, offset) {
            Some(message) => builder.push_message(message, is_last),
            None => tracing::trace!(offset = message_offset, "harmony header still streaming"),
        }
    }

    builder.finish(text)
}
