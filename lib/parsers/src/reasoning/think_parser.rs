// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{THINKING_TAGS, Thinking, ThinkingBlock};
use crate::segments::cleanup::strip_partial_suffix;

/// Earliest occurrence at or after `from` of any of `tags`, with the matching tag pair index.
fn earliest<'a>(
    text: &str,
    from: usize,
    tags: impl Iterator<Item = (usize, &'a str)>,
) -> Option<(usize, usize, &'a str)> {
    tags.filter_map(|(idx, tag)| text[from..].find(tag).map(|pos| (from + pos, idx, tag)))
        .min_by_key(|(pos, _, _)| *pos)
}

/// Locate every reasoning block, in order.
///
/// A closing marker that shows up before any opening marker closes a block starting at the
/// beginning of the text (chat templates that pre-fill `<think>`). A trailing opening marker
/// without its closing marker yields a streaming block that runs to the end of the text.
pub fn find_thinking_blocks(text: &str) -> Vec<ThinkingBlock> {
    let opens = || THINKING_TAGS.iter().map(|(open, _)| *open).enumerate();
    let closes = || THINKING_TAGS.iter().map(|(_, close)| *close).enumerate();

    let mut blocks = Vec::new();
    let mut cursor = 0;

    let first_open = earliest(text, 0, opens()).map(|(pos, _, _)| pos);
    if let Some((close_pos, _, close)) = earliest(text, 0, closes())
        && first_open.is_none_or(|open_pos| close_pos < open_pos)
    {
        let end = close_pos + close.len();
        blocks.push(ThinkingBlock {
            start: 0,
            end,
            content: text[..close_pos].trim().to_string(),
            is_streaming: false,
        });
        cursor = end;
    }

    while let Some((start, idx, open)) = earliest(text, cursor, opens()) {
        let close = THINKING_TAGS[idx].1;
        let body_start = start + open.len();

        match text[body_start..].find(close) {
            Some(len) => {
                let end = body_start + len + close.len();
                blocks.push(ThinkingBlock {
                    start,
                    end,
                    content: text[body_start..body_start + len].trim().to_string(),
                    is_streaming: false,
                });
                cursor = end;
            }
            None => {
                let live = strip_partial_suffix(&text[body_start..], close);
                blocks.push(ThinkingBlock {
                    start,
                    end: text.len(),
                    content: live.trim().to_string(),
                    is_streaming: true,
                });
                break;
            }
        }
    }

    blocks
}

/// Reasoning content of the whole text, `None` when there is no reasoning block.
pub fn extract_thinking(text: &str) -> Option<Thinking> {
    Thinking::from_blocks(&find_thinking_blocks(text))
}

impl Thinking {
    /// Non-empty block contents joined by a blank line. Streaming when the last block is.
    pub fn from_blocks(blocks: &[ThinkingBlock]) -> Option<Self> {
        let last = blocks.last()?;
        let content = blocks
            .iter()
            .map(|block| block.content.as_str())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Some(Self {
            content,
            is_streaming: last.is_streaming,
        })
    }
}

/// Replace every block with spaces of the same byte length, so offsets found in the
/// masked text are valid in the unmasked text.
pub fn mask_thinking(text: &str, blocks: &[ThinkingBlock]) -> String {
    let mut masked = String::with_capacity(text.len());
    let mut cursor = 0;
    for block in blocks {
        masked.push_str(&text[cursor..block.start]);
        masked.extend(std::iter::repeat_n(' ', block.end - block.start));
        cursor = block.end;
    }
    masked.push_str(&text[cursor..]);
    masked
}
