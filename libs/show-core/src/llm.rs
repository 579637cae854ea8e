//! Parses the language model's labeled-section reply. The model is outside
//! this crate's scope; only the parser and the default-response fallback
//! live here.

/// `{caption_en, caption_tc, tool_ids}`.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub caption_en: String,
    pub caption_tc: String,
    pub tool_ids: Vec<String>,
}

impl LlmResponse {
    /// Used at `ScreenshotTrigger` under `no_llm_mode`, and on LLM timeout
    /// or unparsable output.
    pub fn default_response() -> Self {
        Self {
            caption_en: "Test.".to_string(),
            caption_tc: "測試".to_string(),
            tool_ids: vec!["01".to_string(), "02".to_string()],
        }
    }
}

/// Parse the raw model text. Liberal by design: extracts each field by
/// header, strips `Weapons:` leakage from caption text, validates script
/// dominance, caps `tool_ids` at three 2-digit IDs. Falls back to
/// [`LlmResponse::default_response`] wholesale if the required headers are
/// missing.
pub fn parse_response(raw: &str) -> LlmResponse {
    let tc = extract_field(raw, "Caption_TC:");
    let en = extract_field(raw, "Caption_EN:");
    let weapons_line = extract_field(raw, "Weapons:");

    let (Some(tc), Some(en)) = (tc, en) else {
        tracing::warn!("llm response: missing Caption_TC or Caption_EN header, using default");
        return LlmResponse::default_response();
    };

    let tc = strip_weapons_leakage(&tc);
    let en = strip_weapons_leakage(&en);

    if !is_predominantly_script(&tc, Script::TraditionalChinese) {
        tracing::warn!("llm response: Caption_TC is not predominantly Chinese script, using default");
        return LlmResponse::default_response();
    }
    if !is_predominantly_script(&en, Script::Latin) {
        tracing::warn!("llm response: Caption_EN is not predominantly Latin script, using default");
        return LlmResponse::default_response();
    }

    let tool_ids = weapons_line
        .map(|line| parse_tool_ids(&line))
        .unwrap_or_default();

    LlmResponse { caption_en: en, caption_tc: tc, tool_ids }
}

/// Extract everything after `header` up to (but not including) the next
/// recognized header or end of string.
fn extract_field(raw: &str, header: &str) -> Option<String> {
    let start = raw.find(header)? + header.len();
    let rest = &raw[start..];
    let headers = ["Caption_TC:", "Caption_EN:", "Weapons:"];
    let end = headers
        .iter()
        .filter_map(|h| rest.find(h))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

fn strip_weapons_leakage(field: &str) -> String {
    match field.find("Weapons:") {
        Some(idx) => field[..idx].trim().to_string(),
        None => field.trim().to_string(),
    }
}

enum Script {
    TraditionalChinese,
    Latin,
}

/// `>70%` of script-relevant characters (letters/CJK ideographs, ignoring
/// punctuation/whitespace/digits) must belong to the declared script.
fn is_predominantly_script(text: &str, script: Script) -> bool {
    let relevant: Vec<char> = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    if relevant.is_empty() {
        return false;
    }
    let matching = relevant
        .iter()
        .filter(|c| match script {
            Script::TraditionalChinese => is_cjk(**c),
            Script::Latin => c.is_ascii_alphabetic(),
        })
        .count();
    matching as f32 / relevant.len() as f32 > 0.7
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF)
}

/// Parse `[01, 02, 03]`-style bracketed, comma-separated tool ids, keeping
/// only well-formed 2-digit tokens and capping at three.
fn parse_tool_ids(line: &str) -> Vec<String> {
    line.trim_matches(|c| c == '[' || c == ']' || c == ' ')
        .split(',')
        .map(|s| s.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit()))
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let raw = "Caption_TC: 測試句子\nCaption_EN: Test sentence.\nWeapons: [01, 02]";
        let r = parse_response(raw);
        assert_eq!(r.caption_en, "Test sentence.");
        assert_eq!(r.caption_tc, "測試句子");
        assert_eq!(r.tool_ids, vec!["01", "02"]);
    }

    #[test]
    fn caps_tool_ids_at_three() {
        let raw = "Caption_TC: 測試\nCaption_EN: Test.\nWeapons: [01, 02, 03, 04]";
        let r = parse_response(raw);
        assert_eq!(r.tool_ids, vec!["01", "02", "03"]);
    }

    #[test]
    fn missing_header_falls_back_to_default() {
        let raw = "I'm not sure what to say here.";
        let r = parse_response(raw);
        assert_eq!(r, LlmResponse::default_response());
    }

    #[test]
    fn wrong_script_falls_back_to_default() {
        let raw = "Caption_TC: This is English text\nCaption_EN: Test.\nWeapons: [01]";
        let r = parse_response(raw);
        assert_eq!(r, LlmResponse::default_response());
    }

    #[test]
    fn strips_weapons_leakage_from_caption() {
        let raw = "Caption_TC: 測試Weapons: [01]\nCaption_EN: Test.\nWeapons: [01]";
        let r = parse_response(raw);
        assert_eq!(r.caption_tc, "測試");
    }
}
