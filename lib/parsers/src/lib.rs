// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Decomposes the text of an assistant message into ordered segments: prose, reasoning,
//! tool calls and executed commands, with every call paired to its (possibly still
//! streaming) result.
//!
//! Supported markup:
//! - `[TOOL_CALLS]name[ARGS]{...}` and `[TOOL_CALLS]...[/TOOL_CALLS]` (Mistral)
//! - `<function=name><parameter=k>v</parameter></function>` (Llama-3)
//! - `<tool_call>{...}</tool_call>` with `<tool_response>` (Qwen)
//! - `<||SYSTEM.EXEC>cmd<SYSTEM.EXEC||>` with `<||SYSTEM.OUTPUT>` (commands)
//! - Harmony `<|start|>...<|channel|>...<|message|>...<|end|>` transcripts
//! - `<think>` / `<thinking>` reasoning blocks

pub mod cache;
pub mod message;
mod parse;
pub mod reasoning;
pub mod segments;
pub mod tool_calling;

pub use cache::ParseCache;
pub use message::{CommandSegment, Message, ParsedMessage, Role, Segment, ToolCallSegment};
pub use parse::{parse_message, parse_message_with_config};
pub use reasoning::{Thinking, extract_thinking};
pub use tool_calling::{
    CallError, Dialect, ParserConfig, ToolCallAnswer, detect_and_parse_tool_call,
    get_available_dialects, scan_json,
};
