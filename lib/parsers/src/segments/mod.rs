// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

mod assembler;
pub mod cleanup;

pub(crate) use assembler::assemble;
pub use cleanup::{clean_text, strip_partial_tag};
