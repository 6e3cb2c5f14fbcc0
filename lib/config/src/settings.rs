// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Serialize, de::DeserializeOwned};

/// Build the layered settings provider for `T`.
///
/// Priority, last wins:
/// 1. `T::default()`
/// 2. the TOML file at `path`, if any
/// 3. environment variables starting with `env_prefix` (empty values are ignored)
pub fn settings_figment<T>(env_prefix: &str, path: Option<&Path>) -> Figment
where
    T: Serialize + Default,
{
    let mut figment = Figment::new().merge(Serialized::defaults(T::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    let prefix = env_prefix.to_string();
    figment.merge(Env::prefixed(env_prefix).filter_map(move |k| {
        let full_key = format!("{prefix}{}", k.as_str());
        // filters out empty environment variables
        match std::env::var(&full_key) {
            Ok(v) if !v.is_empty() => Some(k.into()),
            _ => None,
        }
    }))
}

/// Load settings of type `T` from defaults, an optional TOML file and the environment.
///
/// A `path` that does not exist is an error, unlike the optional files of a default search.
pub fn load_settings<T>(env_prefix: &str, path: Option<&Path>) -> anyhow::Result<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    if let Some(path) = path {
        anyhow::ensure!(
            path.is_file(),
            "Settings file not found: {}",
            path.display()
        );
    }

    settings_figment::<T>(env_prefix, path)
        .extract()
        .with_context(|| match path {
            Some(path) => format!("Invalid settings in {} or {env_prefix}*", path.display()),
            None => format!("Invalid settings in {env_prefix}* environment variables"),
        })
}
