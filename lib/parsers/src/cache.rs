// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Call-site memoization of parse results.
//!
//! Parsing is idempotent, so a cached result stays valid for as long as the message content
//! is unchanged. Entries are keyed by message id and checked against the content length and
//! an xxh3 hash of the content.

use std::collections::HashMap;
use std::sync::Arc;

use xxhash_rust::xxh3::xxh3_64;

use crate::message::{Message, ParsedMessage, Role};
use crate::parse::parse_message_with_config;
use crate::tool_calling::config::ParserConfig;

#[derive(Debug)]
struct CacheEntry {
    role: Role,
    len: usize,
    hash: u64,
    parsed: Arc<ParsedMessage>,
}

impl CacheEntry {
    fn matches(&self, message: &Message, hash: u64) -> bool {
        self.role == message.role && self.len == message.content.len() && self.hash == hash
    }
}

#[derive(Debug, Default)]
pub struct ParseCache {
    config: ParserConfig,
    entries: HashMap<String, CacheEntry>,
}

impl ParseCache {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Cached result for `message`, re-parsing when its content changed.
    pub fn get_or_parse(&mut self, message: &Message) -> Arc<ParsedMessage> {
        let hash = xxh3_64(message.content.as_bytes());

        if let Some(entry) = self.entries.get(&message.id)
            && entry.matches(message, hash)
        {
            tracing::trace!(message_id = %message.id, "parse cache hit");
            return Arc::clone(&entry.parsed);
        }

        let parsed = Arc::new(parse_message_with_config(message, &self.config));
        self.entries.insert(
            message.id.clone(),
            CacheEntry {
                role: message.role,
                len: message.content.len(),
                hash,
                parsed: Arc::clone(&parsed),
            },
        );
        parsed
    }

    /// Drop the entry of one message. Returns whether there was one.
    pub fn invalidate(&mut self, message_id: &str) -> bool {
        self.entries.remove(message_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
