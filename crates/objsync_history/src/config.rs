//! Configuration for client histories.

use objsync_protocol::ParserConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a [`ClientHistory`](crate::ClientHistory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Limits applied when decoding remote changesets.
    pub parser: ParserConfig,
    /// Maximum number of changesets returned by one upload batch.
    pub upload_batch_size: usize,
}

impl HistoryConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            parser: ParserConfig::default(),
            upload_batch_size: 100,
        }
    }

    /// Sets the parser limits.
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Sets the upload batch size.
    pub fn with_upload_batch_size(mut self, size: usize) -> Self {
        self.upload_batch_size = size;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
