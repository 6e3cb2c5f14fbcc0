// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use loom_run::Flags;

fn main() -> anyhow::Result<()> {
    loom_run::logging::init();
    let flags = Flags::parse();
    loom_run::run(&flags)
}
