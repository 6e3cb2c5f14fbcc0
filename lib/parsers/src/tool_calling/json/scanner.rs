// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

/// A balanced JSON object located inside a larger string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSpan<'a> {
    /// Byte index one past the closing `}`.
    pub end: usize,
    /// The exact object text, braces included.
    pub json: &'a str,
}

/// Find the `}` matching the `{` at `start`.
///
/// Braces inside string literals do not count, and a backslash inside a string escapes the
/// next byte, so `{"a": "b{c}d", "e": "\"}"}` is returned whole.
///
/// Returns `None` when `text[start]` is not `{` or when the object is not closed before the
/// end of input. While a message is streaming, `None` means the object is still arriving.
pub fn scan_json(text: &str, start: usize) -> Option<JsonSpan<'_>> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Every delimiter is ASCII, so walking bytes never splits a multi-byte character
    // at a position we slice on.
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(JsonSpan {
                        end,
                        json: &text[start..end],
                    });
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"a": "b{c}d", "e": 1}"#;
        let span = scan_json(text, 0).unwrap();
        assert_eq!(span.json, text);
        assert_eq!(span.end, text.len());
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let text = r#"prefix {"q": "say \"}\" now"} suffix"#;
        let start = text.find('{').unwrap();
        let span = scan_json(text, start).unwrap();
        assert_eq!(span.json, r#"{"q": "say \"}\" now"}"#);
        assert_eq!(&text[span.end..], " suffix");
    }

    #[test]
    fn test_escaped_backslash_before_quote() {
        let text = r#"{"path": "C:\\"}"#;
        assert_eq!(scan_json(text, 0).unwrap().json, text);
    }

    #[test]
    fn test_nested_objects() {
        let text = r#"{"a": {"b": {"c": [1, {"d": 2}]}}}trailing"#;
        let span = scan_json(text, 0).unwrap();
        assert_eq!(&text[span.end..], "trailing");
    }

    #[test]
    fn test_multibyte_content() {
        let text = r#"{"city": "Brasília", "emoji": "🌧"} ok"#;
        let span = scan_json(text, 0).unwrap();
        assert_eq!(&text[span.end..], " ok");
    }

    #[rstest]
    #[case(r#"{"city": "Ro"#, 0, "unterminated string")]
    #[case(r#"{"a": {"b": 1}"#, 0, "missing outer brace")]
    #[case(r#"{"a": "}"#, 0, "brace only inside string")]
    #[case(r#"abc"#, 0, "not an object")]
    #[case(r#"{}"#, 1, "start not on a brace")]
    #[case(r#"{}"#, 7, "start out of range")]
    fn test_incomplete_or_invalid(
        #[case] text: &str,
        #[case] start: usize,
        #[case] _description: &str,
    ) {
        assert_eq!(scan_json(text, start), None);
    }
}
