// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Parses every prefix of complete transcripts, the way a UI sees a message while it streams.

use loom_parsers::{Message, ParsedMessage, Segment, parse_message};
use proptest::prelude::*;
use rstest::rstest;

/// Markup that must never show up in a text segment, whatever the prefix.
const LEAKS: &[&str] = &[
    "<tool",
    "</tool",
    "[TOOL",
    "[/TOOL",
    "SYSTEM.",
    "<function",
    "</function",
    "<parameter",
    "</parameter",
    "<|",
    "<think",
    "</think",
];

fn parse(content: &str) -> ParsedMessage {
    parse_message(&Message::assistant("m1", content))
}

fn prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .map(move |idx| &text[..idx])
}

/// Structural guarantees every parse result must satisfy.
fn check_invariants(content: &str, parsed: &ParsedMessage) -> Result<(), String> {
    for (idx, segment) in parsed.segments.iter().enumerate() {
        if let Segment::ToolCall(call) = segment {
            if call.is_pending && idx + 1 != parsed.segments.len() {
                return Err(format!("pending call {} is not last in {content:?}", call.id));
            }
            if call.is_pending && call.output.is_some() {
                return Err(format!("pending call {} has an output in {content:?}", call.id));
            }
            if call.is_pending && call.is_streaming {
                return Err(format!("call {} is pending and streaming in {content:?}", call.id));
            }
        }
    }

    let mut ids: Vec<_> = parsed.tool_calls.iter().map(|call| call.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != parsed.tool_calls.len() {
        return Err(format!("duplicate call ids in {content:?}"));
    }
    Ok(())
}

#[rstest]
#[case::qwen(concat!(
    "<think>Plan it.</think>Sure.",
    r#"<tool_call>{"name": "ls", "arguments": {"path": "."}}</tool_call>"#,
    "<tool_response>a\nb</tool_response>Done.",
))]
#[case::mistral_bracket(concat!(
    r#"Checking.[TOOL_CALLS]get_weather[ARGS]{"city": "Rome"}"#,
    "<tool_response>Sunny</tool_response>Nice.",
))]
#[case::mistral_closed_tag(concat!(
    r#"Ok.[TOOL_CALLS]get_weather,{"city": "Rome"}[/TOOL_CALLS]"#,
    r#"[TOOL_RESULTS]{"content": "Sunny"}[/TOOL_RESULTS]Nice."#,
))]
#[case::exec(
    "Listing.<||SYSTEM.EXEC>ls<SYSTEM.EXEC||><||SYSTEM.OUTPUT>a.txt<SYSTEM.OUTPUT||>Done."
)]
#[case::llama3_xml(concat!(
    "Sure.\n<tool_call>\n<function=get_weather>\n<parameter=city>\nRome\n</parameter>\n",
    "</function>\n</tool_call>\n<tool_response>\nSunny\n</tool_response>\nNice.",
))]
#[case::harmony(concat!(
    "<|start|>assistant<|channel|>analysis<|message|>Think.<|end|>",
    "<|start|>assistant<|channel|>final<|message|>Hi there<|return|>",
))]
fn test_markup_never_leaks_while_streaming(#[case] transcript: &str) {
    for prefix in prefixes(transcript) {
        let parsed = parse(prefix);
        for text in parsed.segments.iter().filter_map(Segment::as_text) {
            if let Some(leak) = LEAKS.iter().find(|leak| text.contains(*leak)) {
                panic!("{leak:?} leaked into {text:?} for prefix {prefix:?}");
            }
        }
        if let Err(message) = check_invariants(prefix, &parsed) {
            panic!("{message}");
        }
    }
}

#[rstest]
#[case::qwen(concat!(
    r#"Sure.<tool_call>{"name": "ls", "arguments": {}}</tool_call>"#,
    "<tool_response>a.txt</tool_response>Done.",
))]
#[case::exec("Listing.<||SYSTEM.EXEC>ls<SYSTEM.EXEC||><||SYSTEM.OUTPUT>a.txt<SYSTEM.OUTPUT||>Done.")]
fn test_call_lifecycle_is_monotonic(#[case] transcript: &str) {
    // hidden -> pending -> streaming -> done, never backwards
    let mut stage = 0;
    for prefix in prefixes(transcript) {
        let parsed = parse(prefix);
        let Some(invocation) = parsed.segments.iter().find(|segment| segment.is_invocation())
        else {
            assert_eq!(stage, 0, "call vanished at {prefix:?}");
            continue;
        };
        let current = match invocation {
            Segment::ToolCall(call) if call.is_pending => 1,
            Segment::ToolCall(call) if call.is_streaming => 2,
            Segment::ToolCall(call) if call.output.is_some() => 3,
            Segment::ToolCall(_) => 1,
            Segment::Command(command) if command.output.is_some() => 2,
            Segment::Command(_) => 1,
            _ => unreachable!(),
        };
        assert!(current >= stage, "call went backwards at {prefix:?}");
        stage = current;
    }
    assert!(stage >= 2);
}

#[derive(Debug, Clone)]
enum Piece {
    Words(String),
    Thinking(String),
    Qwen { name: String, output: String },
    Exec { command: String, output: String },
}

impl Piece {
    fn render(&self) -> String {
        match self {
            Piece::Words(words) => format!("{words} "),
            Piece::Thinking(content) => format!("<think>{content}</think>"),
            Piece::Qwen { name, output } => format!(
                r#"<tool_call>{{"name": "{name}", "arguments": {{"k": "{output}"}}}}</tool_call><tool_response>{output}</tool_response>"#
            ),
            Piece::Exec { command, output } => format!(
                "<||SYSTEM.EXEC>{command}<SYSTEM.EXEC||><||SYSTEM.OUTPUT>{output}<SYSTEM.OUTPUT||>"
            ),
        }
    }
}

fn piece_strategy() -> impl Strategy<Value = Piece> {
    prop_oneof![
        "[a-z]{1,8}( [a-z]{1,8}){0,3}".prop_map(Piece::Words),
        "[a-z]{1,8}".prop_map(Piece::Thinking),
        ("[a-z_]{1,10}", "[a-z0-9 ]{0,12}")
            .prop_map(|(name, output)| Piece::Qwen { name, output }),
        ("[a-z]{1,6}( -[a-z]){0,2}", "[a-z0-9.]{0,12}")
            .prop_map(|(command, output)| Piece::Exec { command, output }),
    ]
}

fn render(pieces: &[Piece]) -> String {
    pieces.iter().map(Piece::render).collect()
}

/// Tag soup: fragments of every dialect glued together with some non-ASCII text.
fn soup_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("<tool_call>".to_string()),
            Just("</tool_call>".to_string()),
            Just("<tool_response>".to_string()),
            Just("</tool_response>".to_string()),
            Just("[TOOL_CALLS]".to_string()),
            Just("[/TOOL_CALLS]".to_string()),
            Just("[ARGS]".to_string()),
            Just("[TOOL_RESULTS]".to_string()),
            Just("<||SYSTEM.EXEC>".to_string()),
            Just("<SYSTEM.EXEC||>".to_string()),
            Just("<||SYSTEM.OUTPUT>".to_string()),
            Just("<function=".to_string()),
            Just("<parameter=".to_string()),
            Just("</function>".to_string()),
            Just("<think>".to_string()),
            Just("</think>".to_string()),
            Just("<|start|>".to_string()),
            Just("<|channel|>".to_string()),
            Just("<|message|>".to_string()),
            Just("<|call|>".to_string()),
            Just("{\"name\": \"x\"".to_string()),
            Just("\"arguments\": {}}".to_string()),
            Just("héllo 日本".to_string()),
            "[a-z{}\",:<>\\[\\] ]{0,6}",
        ],
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_completed_segments_are_stable(pieces in prop::collection::vec(piece_strategy(), 1..8)) {
        let full = parse(&render(&pieces));
        for cut in 0..pieces.len() {
            let partial = parse(&render(&pieces[..cut]));
            let settled = partial.segments.len().saturating_sub(1);
            prop_assert!(full.segments.len() >= settled);
            prop_assert_eq!(&partial.segments[..settled], &full.segments[..settled]);
        }
    }

    #[test]
    fn prop_prose_around_calls_is_kept_in_order(
        pieces in prop::collection::vec(piece_strategy(), 1..8)
    ) {
        let parsed = parse(&render(&pieces));
        let mut rest = parsed.clean_content.as_str();
        let words = pieces.iter().filter_map(|piece| match piece {
            Piece::Words(words) => Some(words.split_whitespace()),
            _ => None,
        });
        for word in words.flatten() {
            let Some(pos) = rest.find(word) else {
                return Err(TestCaseError::fail(format!(
                    "{word:?} missing from {:?}",
                    parsed.clean_content
                )));
            };
            rest = &rest[pos + word.len()..];
        }
    }

    #[test]
    fn prop_plain_text_is_kept(text in "[a-z]{1,8}( [a-z]{1,8}){0,10}") {
        let parsed = parse(&text);
        prop_assert_eq!(parsed.clean_content, text.trim());
        prop_assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn prop_parse_is_deterministic(content in soup_strategy()) {
        prop_assert_eq!(parse(&content), parse(&content));
    }

    #[test]
    fn prop_any_prefix_is_well_formed(content in soup_strategy()) {
        for prefix in prefixes(&content) {
            let parsed = parse(prefix);
            if let Err(message) = check_invariants(prefix, &parsed) {
                return Err(TestCaseError::fail(message));
            }
        }
    }

    #[test]
    fn prop_arbitrary_input_does_not_panic(content in any::<String>()) {
        let parsed = parse(&content);
        prop_assert!(check_invariants(&content, &parsed).is_ok());
    }
}
