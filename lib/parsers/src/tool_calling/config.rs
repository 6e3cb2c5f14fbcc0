// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parsers::{get_available_dialects, get_dialect_map};

/// Embedded tool-call markup grammars handled by the span collectors.
///
/// Harmony is not listed: it restructures the whole message and is switched on separately
/// with [`ParserConfig::harmony`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `<||SYSTEM.EXEC>cmd<SYSTEM.EXEC||>` / `<||SYSTEM.OUTPUT>text<SYSTEM.OUTPUT||>`
    Exec,
    /// `[TOOL_CALLS]name,{args}[/TOOL_CALLS]` / `[TOOL_RESULTS]text[/TOOL_RESULTS]`
    MistralClosedTag,
    /// `[TOOL_CALLS]name[ARGS]{args}`
    MistralBracket,
    /// `<tool_call>{"name": ..., "arguments": {...}}</tool_call>`
    Qwen,
    /// `<function=name><parameter=k>v</parameter></function>`
    Llama3Xml,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Exec => "exec",
            Dialect::MistralClosedTag => "mistral_closed_tag",
            Dialect::MistralBracket => "mistral_bracket",
            Dialect::Qwen => "qwen",
            Dialect::Llama3Xml => "llama3_xml",
        }
    }

    /// Default priority order, most specific markup first.
    pub fn default_order() -> Vec<Dialect> {
        vec![
            Dialect::Exec,
            Dialect::MistralClosedTag,
            Dialect::MistralBracket,
            Dialect::Qwen,
            Dialect::Llama3Xml,
        ]
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> anyhow::Result<Self> {
        let normalized = name.trim().to_lowercase();
        get_dialect_map()
            .get(normalized.as_str())
            .copied()
            .ok_or_else(|| {
                let mut available = get_available_dialects();
                available.sort_unstable();
                anyhow::anyhow!(
                    "unknown dialect '{name}', available dialects: {}",
                    available.join(", ")
                )
            })
    }
}

/// Settings of the message parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Enabled span-collecting dialects, in priority order.
    pub dialects: Vec<Dialect>,
    /// Parse `<|start|>assistant<|channel|>` transcripts with the Harmony pipeline.
    pub harmony: bool,
    /// Extract `<think>` / `<thinking>` blocks.
    pub thinking: bool,
    /// Substrings that mark a system message as an error.
    pub error_markers: Vec<String>,
    /// Joins the text segments into `clean_content`.
    pub clean_content_separator: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialects: Dialect::default_order(),
            harmony: true,
            thinking: true,
            error_markers: vec![
                "Error:".to_string(),
                "[ERROR]".to_string(),
                "Failed to".to_string(),
            ],
            clean_content_separator: "\n\n".to_string(),
        }
    }
}

impl ParserConfig {
    /// Only the given dialects, in the given order; Harmony and thinking stay enabled.
    pub fn with_dialects(dialects: impl IntoIterator<Item = Dialect>) -> Self {
        Self {
            dialects: dialects.into_iter().collect(),
            ..Self::default()
        }
    }
}
