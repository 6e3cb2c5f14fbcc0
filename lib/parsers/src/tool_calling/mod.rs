// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod error;
pub mod exec;
pub mod harmony;
pub mod json;
pub mod mistral;
pub mod parsers;
pub(crate) mod span;
pub mod xml;

// Re-export main types and functions for convenience
pub use config::{Dialect, ParserConfig};
pub use error::CallError;
pub use harmony::{HarmonyParse, detect_tool_call_start_harmony, parse_harmony};
pub use json::scan_json;
pub use parsers::{
    ToolCallAnswer, detect_and_parse_tool_call, detect_dialect, detect_tool_call_start,
    get_available_dialects,
};
