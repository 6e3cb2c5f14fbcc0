// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Removal of tag fragments from text segments.
//!
//! While a message streams, its text can end in the middle of an opening tag (`<too`,
//! `[TOOL_CA`, `<||SYSTEM.EX`). Those fragments are stripped from the end of the last text
//! gap so they never flash in the UI. Closing tags that lost their opening partner are
//! removed wherever they appear.

use std::sync::OnceLock;

/// Opening sequences of every dialect. Each prefix of length >= 2 is a partial tag.
const OPENING_TAGS: &[&str] = &[
    "<||SYSTEM.OUTPUT>",
    "<||SYSTEM.EXEC>",
    "[TOOL_RESULTS]",
    "[TOOL_CALLS]",
    "<tool_response>",
    "<tool_call>",
    "<function=",
    "<parameter=",
    "<thinking>",
    "<think>",
    "<|start|>",
];

/// Same command tag with the `<||` prefix dropped; short prefixes of it are ordinary words.
const BARE_EXEC_TAG: &str = "SYSTEM.EXEC>";
const BARE_EXEC_MIN_PREFIX: usize = "SYSTEM.".len();

const MIN_PREFIX: usize = 2;

const ORPHAN_CLOSING_TAGS: &[&str] = &[
    "</thinking>",
    "</think>",
    "</tool_call>",
    "</tool_response>",
    "</function>",
    "[/TOOL_CALLS]",
    "[/TOOL_RESULTS]",
    "<SYSTEM.EXEC||>",
    "<SYSTEM.OUTPUT||>",
];

static PARTIAL_TAGS: OnceLock<Vec<&'static str>> = OnceLock::new();

/// All partial tags, longest first so the most specific one is tried first.
fn partial_tags() -> &'static [&'static str] {
    PARTIAL_TAGS.get_or_init(|| {
        let mut prefixes: Vec<&'static str> = OPENING_TAGS
            .iter()
            .flat_map(|tag| (MIN_PREFIX..=tag.len()).map(move |len| &tag[..len]))
            .chain((BARE_EXEC_MIN_PREFIX..=BARE_EXEC_TAG.len()).map(|len| &BARE_EXEC_TAG[..len]))
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();
        prefixes
    })
}

/// Strip one partial opening tag from the end of `text`, if present.
///
/// Only one fragment can sit at the very end of a growing stream, so scanning stops at the
/// first match.
pub fn strip_partial_tag(text: &str) -> &str {
    partial_tags()
        .iter()
        .find(|prefix| text.ends_with(*prefix))
        .map_or(text, |prefix| &text[..text.len() - prefix.len()])
}

/// Strip a partially typed `tag` (any proper, non-empty prefix) from the end of `text`.
/// Used on live outputs whose closing tag may be half-way through arriving.
pub fn strip_partial_suffix<'a>(text: &'a str, tag: &str) -> &'a str {
    (1..tag.len())
        .rev()
        .map(|len| &tag[..len])
        .find(|prefix| text.ends_with(prefix))
        .map_or(text, |prefix| &text[..text.len() - prefix.len()])
}

/// Remove closing tags that have no opening partner.
pub fn strip_orphan_tags(text: &str) -> String {
    ORPHAN_CLOSING_TAGS
        .iter()
        .fold(text.to_string(), |acc, tag| acc.replace(tag, ""))
}

/// Full cleanup of the text at the end of a message.
pub fn clean_text(text: &str) -> String {
    let without_orphans = strip_orphan_tags(text);
    strip_partial_tag(without_orphans.trim_end())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Let me check <||SYSTEM.EX", "Let me check ")]
    #[case("Let me check <||", "Let me check ")]
    #[case("Running SYSTEM.EXE", "Running ")]
    #[case("Thinking <thi", "Thinking ")]
    #[case("Calling [TOOL_CA", "Calling ")]
    #[case("Calling [TOOL_CALLS]", "Calling ")]
    #[case("wait <tool_res", "wait ")]
    #[case("wait <funct", "wait ")]
    #[case("done <|st", "done ")]
    #[case("a < b", "a < b")]
    #[case("SYSTEM is fine", "SYSTEM is fine")]
    #[case("ends with <", "ends with <")]
    fn test_strip_partial_tag(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_partial_tag(input), expected);
    }

    #[test]
    fn test_only_one_fragment_is_stripped() {
        assert_eq!(strip_partial_tag("x <th<th"), "x <th");
    }

    #[test]
    fn test_partial_tags_are_longest_first() {
        let tags = partial_tags();
        assert!(tags.windows(2).all(|w| w[0].len() >= w[1].len()));
        assert!(tags.contains(&"<||SYSTEM.OUTPUT>"));
        assert!(!tags.contains(&"<"));
        assert!(!tags.contains(&"SYS"));
    }

    #[rstest]
    #[case("a.txt\nb.txt</tool_re", "</tool_response>", "a.txt\nb.txt")]
    #[case("a.txt\nb.txt<", "</tool_response>", "a.txt\nb.txt")]
    #[case("complete", "</tool_response>", "complete")]
    fn test_strip_partial_suffix(#[case] input: &str, #[case] tag: &str, #[case] expected: &str) {
        assert_eq!(strip_partial_suffix(input, tag), expected);
    }

    #[test]
    fn test_clean_text_removes_orphans_and_trims() {
        assert_eq!(clean_text("  </think>\nHello there.</tool_call> "), "Hello there.");
        assert_eq!(clean_text("\n\n<tool_c"), "");
        assert_eq!(clean_text("Done.[/TOOL_CALLS]"), "Done.");
    }
}
