// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Message and parse-result types shared by every parser in this crate.
//!
//! A [`Message`] is the read-only input. A [`ParsedMessage`] is recomputed from scratch
//! whenever the message content grows; it carries no identity beyond the content it was
//! derived from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A chat message as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub is_system_prompt: bool,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            is_system_prompt: false,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, content)
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn system(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::System, content)
    }
}

/// A function-style tool invocation found in assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallSegment {
    /// Derived from the message id and the call position, stable across re-parses.
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    /// `None` until a result for this call shows up in the text.
    pub output: Option<String>,
    /// The result tag is open and its content is still growing.
    pub is_streaming: bool,
    /// Last call in the message, no result has started yet.
    pub is_pending: bool,
}

/// A raw command execution (`SYSTEM.EXEC` markup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSegment {
    pub command: String,
    /// `None` means the command has not completed yet.
    pub output: Option<String>,
}

/// One display unit of a parsed message, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Segment {
    Text { content: String },
    Thinking { content: String },
    Command(CommandSegment),
    ToolCall(ToolCallSegment),
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text {
            content: content.into(),
        }
    }

    pub fn thinking(content: impl Into<String>) -> Self {
        Segment::Thinking {
            content: content.into(),
        }
    }

    /// Tool calls and commands, i.e. segments that may carry an output.
    pub fn is_invocation(&self) -> bool {
        matches!(self, Segment::Command(_) | Segment::ToolCall(_))
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallSegment> {
        match self {
            Segment::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text { content } => Some(content),
            _ => None,
        }
    }
}

/// Structured view of one message, consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    pub tool_calls: Vec<ToolCallSegment>,
    pub clean_content: String,
    pub thinking_content: Option<String>,
    pub is_thinking_streaming: bool,
    pub segments: Vec<Segment>,
    pub is_error: bool,
}

impl ParsedMessage {
    /// The invocation still waiting for a result, if any.
    pub fn pending_call(&self) -> Option<&ToolCallSegment> {
        self.segments
            .last()
            .and_then(Segment::as_tool_call)
            .filter(|call| call.is_pending)
    }
}
