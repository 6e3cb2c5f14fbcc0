// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::message::{Message, ParsedMessage, Role, Segment};
use crate::reasoning::{Thinking, find_thinking_blocks, mask_thinking};
use crate::segments::assemble;
use crate::tool_calling::config::ParserConfig;
use crate::tool_calling::harmony::{detect_tool_call_start_harmony, parse_harmony};
use crate::tool_calling::parsers::collect_dialect_spans;
use crate::tool_calling::span::{CallIds, Span};

/// Parse a message with the default configuration.
pub fn parse_message(message: &Message) -> ParsedMessage {
    parse_message_with_config(message, &ParserConfig::default())
}

/// Decompose a message into ordered segments.
///
/// Pure and infallible: the same content always gives the same result, and markup that does
/// not parse stays in the output as text.
pub fn parse_message_with_config(message: &Message, config: &ParserConfig) -> ParsedMessage {
    let is_error = message.role == Role::System
        && config
            .error_markers
            .iter()
            .any(|marker| !marker.is_empty() && message.content.contains(marker.as_str()));

    if message.role != Role::Assistant {
        let segments = if message.content.trim().is_empty() {
            Vec::new()
        } else {
            vec![Segment::text(message.content.clone())]
        };
        return ParsedMessage {
            clean_content: message.content.clone(),
            segments,
            is_error,
            ..ParsedMessage::default()
        };
    }

    let text = message.content.as_str();

    if config.harmony && detect_tool_call_start_harmony(text) {
        let harmony = parse_harmony(text, &message.id);
        return finish(
            harmony.segments,
            harmony.final_content,
            harmony.thinking_content,
            harmony.is_thinking_streaming,
            is_error,
        );
    }

    let blocks = if config.thinking {
        find_thinking_blocks(text)
    } else {
        Vec::new()
    };
    let masked = mask_thinking(text, &blocks);

    let mut spans: Vec<Span> = blocks
        .iter()
        .map(|block| {
            if block.content.is_empty() {
                Span::consumed(block.start, block.end)
            } else {
                Span::new(block.start, block.end, Segment::thinking(block.content.clone()))
            }
        })
        .collect();
    spans.extend(collect_dialect_spans(&masked, config, CallIds::new(&message.id)));

    let segments = assemble(&masked, spans);
    let clean_content = segments
        .iter()
        .filter_map(Segment::as_text)
        .collect::<Vec<_>>()
        .join(&config.clean_content_separator);
    let thinking = Thinking::from_blocks(&blocks);

    finish(
        segments,
        clean_content,
        thinking.as_ref().and_then(Thinking::get_some_content),
        thinking.is_some_and(|thinking| thinking.is_streaming),
        is_error,
    )
}

fn finish(
    mut segments: Vec<Segment>,
    clean_content: String,
    thinking_content: Option<String>,
    is_thinking_streaming: bool,
    is_error: bool,
) -> ParsedMessage {
    // A pending call must be the last segment.
    let last = segments.len().saturating_sub(1);
    for (idx, segment) in segments.iter_mut().enumerate() {
        if let Segment::ToolCall(call) = segment
            && call.is_pending
            && idx != last
        {
            call.is_pending = false;
        }
    }

    let tool_calls = segments
        .iter()
        .filter_map(Segment::as_tool_call)
        .cloned()
        .collect();

    ParsedMessage {
        tool_calls,
        clean_content,
        thinking_content,
        is_thinking_streaming,
        segments,
        is_error,
    }
}
