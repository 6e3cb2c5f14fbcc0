// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Configuration utilities shared by the loom crates.
//!
//! Settings are layered with `figment`: serialized defaults, then an optional TOML file,
//! then `LOOM_*` environment variables. Boolean switches read straight from the
//! environment go through [`env_is_truthy`].

pub mod environment_names;
mod settings;

pub use settings::{load_settings, settings_figment};

/// Check if a string is truthy: "1", "true", "on", "yes" (case-insensitive).
/// Anything else, including invalid values, is `false`.
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if an environment variable is truthy. Unset or invalid values are `false`.
pub fn env_is_truthy(env: &str) -> bool {
    std::env::var(env).is_ok_and(|val| is_truthy(&val))
}
