// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::{Map, Value};

use super::config::{Dialect, ParserConfig};
use super::exec::detect_tool_call_start_exec;
use super::exec::parser::collect_spans_exec;
use super::harmony::{detect_tool_call_start_harmony, parse_harmony};
use super::json::detect_tool_call_start_qwen;
use super::json::qwen_parser::collect_spans_qwen;
use super::mistral::bracket_parser::collect_spans_mistral_bracket;
use super::mistral::closed_tag_parser::collect_spans_mistral_closed_tag;
use super::mistral::{
    detect_tool_call_start_mistral_bracket, detect_tool_call_start_mistral_closed_tag,
};
use super::span::{CallIds, Span};
use super::xml::{collect_spans_llama3_xml, detect_tool_call_start_llama3_xml};
use crate::message::Segment;
use crate::reasoning::{find_thinking_blocks, mask_thinking};

static DIALECT_MAP: OnceLock<HashMap<&'static str, Dialect>> = OnceLock::new();

// Always update this map when adding a new dialect
pub fn get_dialect_map() -> &'static HashMap<&'static str, Dialect> {
    DIALECT_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("exec", Dialect::Exec);
        map.insert("mistral_closed_tag", Dialect::MistralClosedTag);
        map.insert("mistral_bracket", Dialect::MistralBracket);
        map.insert("qwen", Dialect::Qwen);
        map.insert("llama3_xml", Dialect::Llama3Xml);
        map
    })
}

pub fn get_available_dialects() -> Vec<&'static str> {
    get_dialect_map().keys().copied().collect()
}

pub fn detect_tool_call_start(text: &str, dialect: Dialect) -> bool {
    match dialect {
        Dialect::Exec => detect_tool_call_start_exec(text),
        Dialect::MistralClosedTag => detect_tool_call_start_mistral_closed_tag(text),
        Dialect::MistralBracket => detect_tool_call_start_mistral_bracket(text),
        Dialect::Qwen => detect_tool_call_start_qwen(text),
        Dialect::Llama3Xml => detect_tool_call_start_llama3_xml(text),
    }
}

pub(crate) fn collect_spans(text: &str, dialect: Dialect, ids: CallIds<'_>) -> Vec<Span> {
    match dialect {
        Dialect::Exec => collect_spans_exec(text, ids),
        Dialect::MistralClosedTag => collect_spans_mistral_closed_tag(text, ids),
        Dialect::MistralBracket => collect_spans_mistral_bracket(text, ids),
        Dialect::Qwen => collect_spans_qwen(text, ids),
        Dialect::Llama3Xml => collect_spans_llama3_xml(text, ids),
    }
}

/// First enabled dialect, in priority order, whose markup is present.
pub fn detect_dialect(text: &str, config: &ParserConfig) -> Option<Dialect> {
    config
        .dialects
        .iter()
        .copied()
        .find(|dialect| detect_tool_call_start(text, *dialect))
}

/// Spans of every enabled dialect whose markup is present, in priority order.
pub(crate) fn collect_dialect_spans(
    text: &str,
    config: &ParserConfig,
    ids: CallIds<'_>,
) -> Vec<Span> {
    config
        .dialects
        .iter()
        .copied()
        .filter(|dialect| detect_tool_call_start(text, *dialect))
        .flat_map(|dialect| {
            tracing::trace!(%dialect, "dialect detected");
            collect_spans(text, dialect, ids)
        })
        .collect()
}

/// A single call and its response, for callers that do not need segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallAnswer {
    pub dialect: &'static str,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub response: Option<String>,
}

impl ToolCallAnswer {
    fn from_segment(dialect: &'static str, segment: &Segment) -> Option<Self> {
        match segment {
            Segment::ToolCall(call) => Some(Self {
                dialect,
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                response: call.output.clone(),
            }),
            Segment::Command(command) => {
                let mut arguments = Map::new();
                arguments.insert(
                    "command".to_string(),
                    Value::String(command.command.clone()),
                );
                Some(Self {
                    dialect,
                    name: "exec".to_string(),
                    arguments,
                    response: command.output.clone(),
                })
            }
            Segment::Text { .. } | Segment::Thinking { .. } => None,
        }
    }
}

/// Find the first call of the first matching dialect, short-circuiting the others.
///
/// Harmony transcripts are checked first when enabled. Calls inside reasoning blocks are
/// ignored.
pub fn detect_and_parse_tool_call(text: &str, config: &ParserConfig) -> Option<ToolCallAnswer> {
    if config.harmony && detect_tool_call_start_harmony(text) {
        return parse_harmony(text, "")
            .segments
            .iter()
            .find_map(|segment| ToolCallAnswer::from_segment("harmony", segment));
    }

    let masked;
    let text = if config.thinking {
        masked = mask_thinking(text, &find_thinking_blocks(text));
        masked.as_str()
    } else {
        text
    };

    let dialect = detect_dialect(text, config)?;
    let mut spans = collect_spans(text, dialect, CallIds::new(""));
    spans.sort_by_key(|span| span.start);
    spans
        .iter()
        .filter_map(|span| span.segment.as_ref())
        .find_map(|segment| ToolCallAnswer::from_segment(dialect.as_str(), segment))
}
