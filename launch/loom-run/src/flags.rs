// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use loom_config::environment_names::parser::LOOM_PARSER_CONFIG_PATH;
use loom_parsers::Role;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Parse a chat message into segments", long_about = None)]
pub struct Flags {
    /// File holding the message content. Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,

    /// Author of the message. Only assistant messages carry markup.
    #[arg(long, value_enum, default_value_t = RoleFlag::Assistant)]
    pub role: RoleFlag,

    /// Message id, used to derive tool call ids.
    #[arg(long, default_value = "msg")]
    pub id: String,

    /// Input is a JSON message object (`{"id", "role", "content"}`) instead of raw content.
    #[arg(long)]
    pub json: bool,

    /// TOML file with parser settings.
    #[arg(long, env = LOOM_PARSER_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Replay the content as a stream growing by this many characters, one JSON line per step.
    #[arg(long, value_name = "CHARS")]
    pub replay_chunk: Option<NonZeroUsize>,

    /// Print only the first tool call with its response.
    #[arg(long, conflicts_with = "replay_chunk")]
    pub first_call: bool,

    /// Print the names of the tool call dialects and exit.
    #[arg(long)]
    pub list_dialects: bool,

    /// Pretty-print JSON output. Ignored when replaying.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFlag {
    User,
    Assistant,
    System,
}

impl From<RoleFlag> for Role {
    fn from(role: RoleFlag) -> Self {
        match role {
            RoleFlag::User => Role::User,
            RoleFlag::Assistant => Role::Assistant,
            RoleFlag::System => Role::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let flags = Flags::try_parse_from(["loom-run"]).unwrap();
        assert_eq!(flags.input, None);
        assert_eq!(flags.role, RoleFlag::Assistant);
        assert_eq!(flags.id, "msg");
        assert!(flags.replay_chunk.is_none());
    }

    #[test]
    fn test_replay_chunk_must_be_positive() {
        assert!(Flags::try_parse_from(["loom-run", "--replay-chunk", "0"]).is_err());
        let flags = Flags::try_parse_from(["loom-run", "--replay-chunk", "4", "in.txt"]).unwrap();
        assert_eq!(flags.replay_chunk.map(NonZeroUsize::get), Some(4));
        assert_eq!(flags.input, Some(PathBuf::from("in.txt")));
    }

    #[test]
    fn test_first_call_conflicts_with_replay() {
        assert!(
            Flags::try_parse_from(["loom-run", "--first-call", "--replay-chunk", "2"]).is_err()
        );
    }

    #[test]
    fn test_config_path_from_env() {
        temp_env::with_var(LOOM_PARSER_CONFIG_PATH, Some("parser.toml"), || {
            let flags = Flags::try_parse_from(["loom-run"]).unwrap();
            assert_eq!(flags.config, Some(PathBuf::from("parser.toml")));

            let flags = Flags::try_parse_from(["loom-run", "--config", "other.toml"]).unwrap();
            assert_eq!(flags.config, Some(PathBuf::from("other.toml")));
        });
    }

    #[test]
    fn test_role_flag() {
        let flags = Flags::try_parse_from(["loom-run", "--role", "system"]).unwrap();
        assert_eq!(Role::from(flags.role), Role::System);
    }
}
