// Export Template Store Port
// Named parser specs that jobs can reference instead of carrying an inline parser

use crate::domain::TemplateId;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Parser spec of a stored template (`None` if the template is gone)
    async fn parser_for(&self, id: TemplateId) -> Result<Option<serde_json::Value>>;

    /// Store a new template
    async fn insert(
        &self,
        name: &str,
        model_name: &str,
        parser: &serde_json::Value,
    ) -> Result<TemplateId>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryTemplateStore {
        templates: Mutex<HashMap<TemplateId, serde_json::Value>>,
    }

    impl InMemoryTemplateStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TemplateStore for InMemoryTemplateStore {
        async fn parser_for(&self, id: TemplateId) -> Result<Option<serde_json::Value>> {
            Ok(self.templates.lock().unwrap().get(&id).cloned())
        }

        async fn insert(
            &self,
            _name: &str,
            _model_name: &str,
            parser: &serde_json::Value,
        ) -> Result<TemplateId> {
            let mut templates = self.templates.lock().unwrap();
            let id = templates.len() as TemplateId + 1;
            templates.insert(id, parser.clone());
            Ok(id)
        }
    }
}
