//! Typed access to the installation's tunables. Each file format gets its
//! own loader; [`ConfigBundle::load`] reads a whole config directory and
//! never fails — a missing or malformed file falls back to compiled-in
//! defaults with a logged warning.

mod anim;
mod kv;
mod period;
mod prompt;
mod ssr;
mod tts;
mod voice_mod;
mod weapon;

pub use anim::{AnimConfig, PhaseConfig};
pub use period::PeriodConfig;
pub use prompt::PromptConfig;
pub use ssr::{SsrChannelConfig, SsrConfig};
pub use tts::{SynthMode, TtsConfig};
pub use voice_mod::VoiceModConfig;
pub use weapon::{ToolSpec, WeaponConfig};

use std::path::Path;

/// Every config file loaded from one directory.
#[derive(Debug, Clone)]
pub struct ConfigBundle {
    pub period: PeriodConfig,
    pub weapon: WeaponConfig,
    pub ssr: SsrConfig,
    pub anim: AnimConfig,
    pub tts: TtsConfig,
    pub voice_mod: VoiceModConfig,
    pub prompt: PromptConfig,
}

impl ConfigBundle {
    /// Load every recognized config file from `dir`. Individual loaders
    /// already degrade to defaults on error; this wrapper just logs which
    /// files were missing outright so the operator-visible debug telemetry
    /// can note a degraded config load.
    pub fn load(dir: &Path) -> Self {
        Self {
            period: load_or_default(&dir.join("period_config.csv"), PeriodConfig::load),
            weapon: load_or_default(&dir.join("weapon_config.csv"), WeaponConfig::load),
            ssr: load_or_default(&dir.join("ssr_config.csv"), SsrConfig::load),
            anim: load_or_default(&dir.join("anim_config.csv"), AnimConfig::load),
            tts: load_or_default(&dir.join("tts_config.txt"), TtsConfig::load),
            voice_mod: load_or_default(&dir.join("voice_mod_config.txt"), VoiceModConfig::load),
            prompt: load_or_default(&dir.join("prompt_config.txt"), PromptConfig::load),
        }
    }
}

fn load_or_default<T: Default>(path: &Path, loader: impl FnOnce(&Path) -> crate::error::Result<T>) -> T {
    match loader(path) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{}: {e}, falling back to compiled-in defaults", path.display());
            T::default()
        }
    }
}
