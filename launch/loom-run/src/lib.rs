// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context as _;
use loom_config::environment_names::parser::LOOM_PARSER_PREFIX;
use loom_parsers::{
    Message, ParseCache, ParserConfig, detect_and_parse_tool_call, get_available_dialects,
};
use serde::Serialize;

mod flags;
pub use flags::{Flags, RoleFlag};
pub mod logging;

pub fn run(flags: &Flags) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    if flags.list_dialects {
        let mut names = get_available_dialects();
        names.sort_unstable();
        for name in names {
            writeln!(stdout, "{name}")?;
        }
        return Ok(());
    }

    let config: ParserConfig = loom_config::load_settings(LOOM_PARSER_PREFIX, flags.config.as_deref())
        .context("Loading parser settings")?;
    let message = read_message(flags)?;
    tracing::debug!(
        message_id = %message.id,
        bytes = message.content.len(),
        dialects = ?config.dialects,
        "parsing message"
    );

    render(flags, &message, &config, &mut stdout)
}

fn read_message(flags: &Flags) -> anyhow::Result<Message> {
    let raw = match flags.input.as_deref() {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?,
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Reading stdin")?;
            raw
        }
    };

    if flags.json {
        serde_json::from_str(&raw).context("Input is not a JSON message object")
    } else {
        Ok(Message::new(flags.id.clone(), flags.role.into(), raw))
    }
}

/// Write the parse result of `message` to `out` as the flags ask for.
pub fn render<W: Write>(
    flags: &Flags,
    message: &Message,
    config: &ParserConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    if flags.first_call {
        let answer = detect_and_parse_tool_call(&message.content, config);
        return write_json(out, &answer, flags.pretty);
    }

    let mut cache = ParseCache::new(config.clone());
    let Some(chunk) = flags.replay_chunk else {
        let parsed = cache.get_or_parse(message);
        return write_json(out, parsed.as_ref(), flags.pretty);
    };

    let mut prefix = message.clone();
    prefix.content.clear();
    let mut chars = message.content.chars().peekable();
    while chars.peek().is_some() {
        prefix.content.extend(chars.by_ref().take(chunk.get()));
        let parsed = cache.get_or_parse(&prefix);
        write_json(out, parsed.as_ref(), false)?;
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    value: &T,
    pretty: bool,
) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::Value;

    fn flags(args: &[&str]) -> Flags {
        Flags::try_parse_from(std::iter::once("loom-run").chain(args.iter().copied())).unwrap()
    }

    fn render_lines(flags: &Flags, content: &str) -> Vec<Value> {
        let message = Message::new(flags.id.clone(), flags.role.into(), content);
        let mut out = Vec::new();
        render(flags, &message, &ParserConfig::default(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_render_parsed_message() {
        let lines = render_lines(&flags(&["--id", "m1"]), "<think>hm</think>Hello");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["cleanContent"], "Hello");
        assert_eq!(lines[0]["thinkingContent"], "hm");
        assert_eq!(lines[0]["segments"][0]["type"], "thinking");
    }

    #[test]
    fn test_replay_emits_one_line_per_step() {
        let content = r#"<tool_call>{"name": "ls", "arguments": {}}</tool_call>"#;
        let lines = render_lines(&flags(&["--replay-chunk", "10"]), content);
        assert_eq!(lines.len(), content.len().div_ceil(10));
        assert_eq!(lines[0]["segments"], serde_json::json!([]));
        let last = lines.last().unwrap();
        assert_eq!(last["toolCalls"][0]["name"], "ls");
        assert_eq!(last["toolCalls"][0]["isPending"], true);
    }

    #[test]
    fn test_first_call() {
        let lines = render_lines(
            &flags(&["--first-call"]),
            "[TOOL_CALLS]get_weather[ARGS]{\"city\": \"Rome\"}",
        );
        assert_eq!(lines[0]["dialect"], "mistral_bracket");
        assert_eq!(lines[0]["arguments"]["city"], "Rome");

        let none = render_lines(&flags(&["--first-call"]), "just text");
        assert_eq!(none, vec![Value::Null]);
    }

    #[test]
    fn test_read_json_message_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"id": "s1", "role": "system", "content": "Error: out of memory"}}"#
        )?;
        let path = file.path().to_str().unwrap();

        let message = read_message(&flags(&["--json", path]))?;
        assert_eq!(message.id, "s1");

        let mut out = Vec::new();
        render(&flags(&[]), &message, &ParserConfig::default(), &mut out)?;
        let parsed: Value = serde_json::from_slice(&out)?;
        assert_eq!(parsed["isError"], true);
        Ok(())
    }

    #[test]
    fn test_parser_settings_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "dialects = [\"qwen\"]\nharmony = false")?;

        let config: ParserConfig = temp_env::with_vars(
            vec![
                ("LOOM_PARSER_DIALECTS", None::<&str>),
                ("LOOM_PARSER_HARMONY", None),
                ("LOOM_PARSER_THINKING", Some("false")),
            ],
            || loom_config::load_settings(LOOM_PARSER_PREFIX, Some(file.path())),
        )?;
        assert_eq!(config.dialects, vec![loom_parsers::Dialect::Qwen]);
        assert!(!config.harmony);
        assert!(!config.thinking);
        assert_eq!(config.clean_content_separator, "\n\n");
        Ok(())
    }

    #[test]
    fn test_missing_input_file() {
        let err = read_message(&flags(&["/definitely/not/here.txt"])).unwrap_err();
        assert!(err.to_string().contains("Reading /definitely/not/here.txt"));
    }
}
