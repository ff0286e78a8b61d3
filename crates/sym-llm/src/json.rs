//! Recovering JSON from model output.

/// Strip a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Slice from the first `{` to the last `}`, tolerating prose around the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn extracts_object_from_prose() {
        let text = "Sure! Here it is: {\"violates\": false} Hope that helps.";
        assert_eq!(extract_json_object(text), Some("{\"violates\": false}"));
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
