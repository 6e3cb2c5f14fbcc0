// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::cleanup::{clean_text, strip_orphan_tags};
use crate::message::Segment;
use crate::tool_calling::span::Span;

/// Only the last gap can end in a tag that is still being typed; earlier gaps keep their tail.
fn push_gap(segments: &mut Vec<Segment>, gap: &str, is_last: bool) {
    let cleaned = if is_last {
        clean_text(gap)
    } else {
        strip_orphan_tags(gap).trim().to_string()
    };
    if !cleaned.is_empty() {
        segments.push(Segment::text(cleaned));
    }
}

/// Merge spans into ordered segments, filling the gaps between them with cleaned text.
///
/// Spans are sorted by start with a stable sort, so for equal starts the span that came first
/// in `spans` wins. A span starting inside an already emitted one is dropped.
pub(crate) fn assemble(text: &str, mut spans: Vec<Span>) -> Vec<Segment> {
    spans.sort_by_key(|span| span.start);

    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        if span.start < cursor {
            tracing::trace!(
                start = span.start,
                end = span.end,
                cursor,
                "dropping overlapping span"
            );
            continue;
        }
        push_gap(&mut segments, &text[cursor..span.start], false);
        segments.extend(span.segment);
        cursor = span.end;
    }
    push_gap(&mut segments, &text[cursor..], true);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CommandSegment;

    fn command(name: &str) -> Segment {
        Segment::Command(CommandSegment {
            command: name.to_string(),
            output: None,
        })
    }

    #[test]
    fn test_gaps_become_text() {
        let text = "Before CALL between RESULT after <tool_ca";
        let spans = vec![
            Span::consumed(20, 26),
            Span::new(7, 11, command("x")),
        ];
        assert_eq!(
            assemble(text, spans),
            vec![
                Segment::text("Before"),
                command("x"),
                Segment::text("between"),
                Segment::text("after"),
            ]
        );
    }

    #[test]
    fn test_overlap_keeps_first_span() {
        let text = "0123456789";
        let spans = vec![
            Span::new(2, 6, command("first")),
            Span::new(2, 9, command("same start")),
            Span::new(4, 8, command("inside")),
        ];
        assert_eq!(
            assemble(text, spans),
            vec![Segment::text("01"), command("first"), Segment::text("6789")]
        );
    }

    #[test]
    fn test_partial_tag_is_only_stripped_at_the_end() {
        let text = "Use List[T CALL then <thi";
        let spans = vec![Span::new(11, 15, command("x"))];
        assert_eq!(
            assemble(text, spans),
            vec![Segment::text("Use List[T"), command("x"), Segment::text("then")]
        );
    }

    #[test]
    fn test_whitespace_gaps_are_dropped() {
        let spans = vec![Span::new(0, 1, command("a")), Span::new(3, 4, command("b"))];
        assert_eq!(assemble("a \nb  ", spans), vec![command("a"), command("b")]);
    }
}
