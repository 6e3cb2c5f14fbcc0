// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

mod think_parser;

pub use think_parser::{extract_thinking, find_thinking_blocks, mask_thinking};

/// Opening and closing markers of a reasoning block.
pub const THINKING_TAGS: [(&str, &str); 2] =
    [("<thinking>", "</thinking>"), ("<think>", "</think>")];

/// One reasoning block located in the message text. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingBlock {
    pub start: usize,
    pub end: usize,
    /// Trimmed text between the markers.
    pub content: String,
    /// No closing marker yet; the block runs to the end of the text.
    pub is_streaming: bool,
}

/// Reasoning text of a whole message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Thinking {
    pub content: String,
    pub is_streaming: bool,
}

impl Thinking {
    pub fn get_some_content(&self) -> Option<String> {
        if self.content.is_empty() {
            None
        } else {
            Some(self.content.clone())
        }
    }
}
