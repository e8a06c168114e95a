use crate::tool::{Tool, ToolDefinition};
use indexmap::IndexMap;
use std::sync::Arc;

struct Entry {
    definition: ToolDefinition,
    handle: Arc<dyn Tool>,
}

/// Tool definitions and their invocation handles, keyed by name.
///
/// Populated once at startup, then shared behind `Arc` for reads.
/// Iteration follows registration order so the model always sees
/// the same advertisement.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tool. Replacing keeps the original position and
    /// returns the handle that was displaced.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handle: Arc<dyn Tool>,
    ) -> Option<Arc<dyn Tool>> {
        let name = definition.name.clone();
        let previous = self
            .tools
            .insert(name.clone(), Entry { definition, handle })
            .map(|old| old.handle);
        if previous.is_some() {
            tracing::debug!(tool = %name, "Replaced registered tool");
        }
        previous
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.tools
            .get(name)
            .map(|e| e.handle.clone())
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// All registered definitions, in registration order (for sending to the LLM).
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|e| e.definition.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{EchoTool, ToolError, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Fixed(&'static str);

    #[async_trait]
    impl Tool for Fixed {
        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(self.0))
        }
    }

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{} tool", name),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(EchoTool::definition(), Arc::new(EchoTool)).is_none());

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("echo").is_ok());
        assert_eq!(registry.list()[0].name, "echo");
    }

    #[test]
    fn test_resolve_unknown_names_the_tool() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("search_trains").err().unwrap();
        assert!(err.to_string().contains("search_trains"));
    }

    #[tokio::test]
    async fn test_second_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(def("get_weather"), Arc::new(Fixed("first")));
        registry.register(def("search_hotels"), Arc::new(Fixed("hotels")));
        let displaced = registry.register(def("get_weather"), Arc::new(Fixed("second")));

        assert!(displaced.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.list().iter().filter(|d| d.name == "get_weather").count(),
            1
        );

        let handle = registry.resolve("get_weather").unwrap();
        let output = handle.execute(json!({})).await.unwrap();
        assert_eq!(output.content, "second");
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["get_weather", "search_flights", "search_hotels", "store_memory"] {
            registry.register(def(name), Arc::new(Fixed("ok")));
        }
        registry.register(def("search_flights"), Arc::new(Fixed("again")));

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["get_weather", "search_flights", "search_hotels", "store_memory"]
        );
    }
}
