// Parser resolution: stored template first, inline spec second

use super::ExportError;
use crate::domain::TemplateId;
use crate::port::TemplateStore;
use tracing::warn;

/// Resolve the projection spec for an export
///
/// A template that no longer exists does not count as resolved, so the inline
/// spec is used as fallback. Neither resolving is `ExportError::NoParser`.
pub async fn resolve_parser(
    templates: &dyn TemplateStore,
    template_id: Option<TemplateId>,
    inline: Option<&serde_json::Value>,
) -> Result<serde_json::Value, ExportError> {
    if let Some(id) = template_id {
        if inline.is_some() {
            warn!(template_id = id, "Both template and inline parser set, using template");
        }
        if let Some(parser) = templates.parser_for(id).await? {
            return Ok(parser);
        }
        warn!(template_id = id, "Export template not found");
    }

    match inline {
        Some(parser) if !parser.is_null() => Ok(parser.clone()),
        _ => Err(ExportError::NoParser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::template_store::mocks::InMemoryTemplateStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_template_wins_over_inline() {
        let store = InMemoryTemplateStore::new();
        let id = store.insert("t", "res.partner", &json!(["name"])).await.unwrap();

        let parser = resolve_parser(&store, Some(id), Some(&json!(["email"])))
            .await
            .unwrap();
        assert_eq!(parser, json!(["name"]));
    }

    #[tokio::test]
    async fn test_missing_template_falls_back_to_inline() {
        let store = InMemoryTemplateStore::new();
        let parser = resolve_parser(&store, Some(99), Some(&json!(["email"])))
            .await
            .unwrap();
        assert_eq!(parser, json!(["email"]));
    }

    #[tokio::test]
    async fn test_nothing_resolves_is_no_parser() {
        let store = InMemoryTemplateStore::new();
        let err = resolve_parser(&store, Some(99), None).await.unwrap_err();
        assert!(matches!(err, ExportError::NoParser));

        let err = resolve_parser(&store, None, Some(&serde_json::Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoParser));
    }
}
