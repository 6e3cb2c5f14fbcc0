// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logging of the harness. Everything goes to stderr so stdout stays machine-readable.
//!
//! - `LOOM_LOG`: filter directives, default `info`
//! - `LOOM_LOGGING_JSONL`: one JSON object per event
//! - `LOOM_DISABLE_ANSI_LOGGING`: no terminal colors

use std::sync::Once;

use loom_config::env_is_truthy;
use loom_config::environment_names::logging as env_logging;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

static INIT: Once = Once::new();

fn filters() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(env_logging::LOOM_LOG)
        .from_env_lossy()
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let result = if env_is_truthy(env_logging::LOOM_LOGGING_JSONL) {
        let layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_filter(filters());
        tracing_subscriber::registry().with(layer).try_init()
    } else {
        let layer = fmt::layer()
            .compact()
            .with_ansi(!env_is_truthy(env_logging::LOOM_DISABLE_ANSI_LOGGING))
            .with_writer(std::io::stderr)
            .with_filter(filters());
        tracing_subscriber::registry().with(layer).try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }
}
