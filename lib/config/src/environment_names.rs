// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable names read by the loom crates, kept in one place.

/// Logging of the `loom-run` harness
pub mod logging {
    /// Filter directives, e.g. "debug" or "loom_parsers=trace"
    pub const LOOM_LOG: &str = "LOOM_LOG";

    /// Enable JSONL logging format
    pub const LOOM_LOGGING_JSONL: &str = "LOOM_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const LOOM_DISABLE_ANSI_LOGGING: &str = "LOOM_DISABLE_ANSI_LOGGING";
}

/// Message parser settings
pub mod parser {
    /// Prefix of the variables overriding `ParserConfig` fields,
    /// e.g. `LOOM_PARSER_HARMONY=false` or `LOOM_PARSER_DIALECTS=[qwen, exec]`
    pub const LOOM_PARSER_PREFIX: &str = "LOOM_PARSER_";

    /// Path to a TOML file with parser settings
    pub const LOOM_PARSER_CONFIG_PATH: &str = "LOOM_PARSER_CONFIG_PATH";
}
