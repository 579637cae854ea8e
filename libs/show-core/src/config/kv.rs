//! Shared `key=value` text parser for `tts_config.txt`, `voice_mod_config.txt`.
//! Never panics: unreadable files and malformed lines fall back to defaults
//! with a warning.

use std::path::Path;

use crate::error::Result;

pub fn parse_kv_file(path: &Path, label: &str) -> Result<Vec<(String, String)>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("{label}: could not read {}: {e}, using defaults", path.display());
            return Ok(Vec::new());
        }
    };

    let mut pairs = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
            None => tracing::warn!("{label}: line {}: missing '=', skipping", lineno + 1),
        }
    }
    Ok(pairs)
}
