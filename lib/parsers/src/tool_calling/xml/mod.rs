// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

mod parser;

pub use parser::detect_tool_call_start_llama3_xml;
pub(crate) use parser::collect_spans_llama3_xml;
