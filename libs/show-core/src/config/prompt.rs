//! `prompt_config.txt`: the LLM prompt template.

use std::path::Path;

use crate::error::Result;

const DEFAULT_TEMPLATE: &str = "Given this scene: {image_description}\n\
Choose 1 to 3 tools from: {weapon_list}\n\
Reply with exactly:\nCaption_TC: <traditional chinese>\nCaption_EN: <english>\nWeapons: [id1, id2]";

#[derive(Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

impl PromptConfig {
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(template) if !template.trim().is_empty() => Ok(Self { template }),
            Ok(_) => {
                tracing::warn!("prompt_config.txt is empty, using default template");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("prompt_config.txt: could not read {}: {e}, using default", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn render(&self, image_description: &str, weapon_list: &str) -> String {
        self.template
            .replace("{image_description}", image_description)
            .replace("{weapon_list}", weapon_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        let cfg = PromptConfig::default();
        let rendered = cfg.render("a dog", "01,02");
        assert!(rendered.contains("a dog"));
        assert!(rendered.contains("01,02"));
        assert!(!rendered.contains('{'));
    }
}
