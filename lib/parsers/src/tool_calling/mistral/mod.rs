// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The two Mistral dialects. Both open with `[TOOL_CALLS]`; the bracket form follows it with
//! `name[ARGS]{json}`, the closed-tag form wraps its body in `[TOOL_CALLS]...[/TOOL_CALLS]`.

pub mod bracket_parser;
pub mod closed_tag_parser;

pub use bracket_parser::detect_tool_call_start_mistral_bracket;
pub use closed_tag_parser::detect_tool_call_start_mistral_closed_tag;

pub(crate) const TOOL_CALLS: &str = "[TOOL_CALLS]";
pub(crate) const ARGS: &str = "[ARGS]";

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '[' | ']' | '{' | '}' | '<' | '>' | '"' | '\'' | ',')
}

/// Byte length of the function name at the start of `rest`.
pub(crate) fn name_len(rest: &str) -> usize {
    rest.find(|c| !is_name_char(c)).unwrap_or(rest.len())
}

/// `rest` (the text right after `[TOOL_CALLS]`) is in `name[ARGS]` form.
pub(crate) fn is_bracket_form(rest: &str) -> bool {
    let len = name_len(rest);
    len > 0 && rest[len..].starts_with(ARGS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("get_weather[ARGS]{}", 11)]
    #[case("get_weather,{}", 11)]
    #[case("ns.tool-v2 more", 10)]
    #[case("[{\"name\"", 0)]
    #[case("", 0)]
    fn test_name_len(#[case] rest: &str, #[case] expected: usize) {
        assert_eq!(name_len(rest), expected);
    }

    #[test]
    fn test_is_bracket_form() {
        assert!(is_bracket_form("ls[ARGS]{}"));
        assert!(!is_bracket_form("ls,{}"));
        assert!(!is_bracket_form("[ARGS]{}"));
    }
}
