// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod harmony_parser;

pub use harmony_parser::{HarmonyParse, detect_tool_call_start_harmony, parse_harmony};
