//! `ssr_config.csv`: the two lighting relay channels.

use std::path::Path;

use crate::error::{Result, ShowError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsrChannelConfig {
    pub pin: u8,
    pub pre_delay_ms: u64,
    pub post_delay_ms: u64,
}

impl Default for SsrChannelConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            pre_delay_ms: 0,
            post_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsrConfig {
    /// SSR1: "caption lighting", asserted on entering `Caption`.
    pub ssr1: SsrChannelConfig,
    /// SSR2: "spotlight", asserted on entering `Spotlight`.
    pub ssr2: SsrChannelConfig,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            ssr1: SsrChannelConfig { pin: 6, pre_delay_ms: 200, post_delay_ms: 0 },
            ssr2: SsrChannelConfig { pin: 7, pre_delay_ms: 200, post_delay_ms: 0 },
        }
    }
}

impl SsrConfig {
    /// Load rows for `ssr1`, `ssr2` with `{name, pin, pre_delay_ms, post_delay_ms}`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ShowError::Configuration(format!("{}: {e}", path.display())))?;

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("ssr_config.csv: skipping malformed row: {e}");
                    continue;
                }
            };
            let name = record.get(0).unwrap_or("").trim().to_lowercase();
            let Some(pin) = record.get(1).and_then(|s| s.trim().parse::<u8>().ok()) else {
                tracing::warn!(name, "ssr_config.csv: unparsable pin, keeping default");
                continue;
            };
            let pre_delay_ms = record.get(2).and_then(|s| s.trim().parse().ok()).unwrap_or(0);
            let post_delay_ms = record.get(3).and_then(|s| s.trim().parse().ok()).unwrap_or(0);
            let channel = SsrChannelConfig { pin, pre_delay_ms, post_delay_ms };
            match name.as_str() {
                "ssr1" => cfg.ssr1 = channel,
                "ssr2" => cfg.ssr2 = channel,
                other => tracing::debug!(name = other, "ssr_config.csv: unrecognized channel name"),
            }
        }
        Ok(cfg)
    }
}
