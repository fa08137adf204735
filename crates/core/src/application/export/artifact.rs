// Artifact rendering

/// Content type of export artifacts
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Render projected rows as a UTF-8 JSON array with 2-space indentation
///
/// Non-ASCII characters are written as-is, not `\u` escaped.
pub fn render_json(rows: &[serde_json::Value]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_uses_two_space_indent() {
        let bytes = render_json(&[json!({"id": 1})]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "[\n  {\n    \"id\": 1\n  }\n]");
    }

    #[test]
    fn test_render_preserves_non_ascii() {
        let bytes = render_json(&[json!({"name": "Müller & Søn 東京"})]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Müller & Søn 東京"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_json(&[]).unwrap(), b"[]".to_vec());
    }
}
