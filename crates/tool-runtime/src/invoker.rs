use crate::registry::{RegistryError, ToolRegistry};
use crate::tool::{ToolCall, ToolResult};
use jsonschema::{Draft, JSONSchema};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves calls against the registry and runs them, turning every failure
/// past resolution into an error-flagged [`ToolResult`].
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    validators: HashMap<String, JSONSchema>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        let mut validators = HashMap::new();
        for def in registry.list() {
            match JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&def.input_schema)
            {
                Ok(schema) => {
                    validators.insert(def.name.clone(), schema);
                }
                Err(e) => {
                    warn!(tool = %def.name, error = %e, "Tool schema does not compile; skipping validation");
                }
            }
        }
        Self {
            registry,
            validators,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one call. Only resolution failures are returned as `Err`.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, RegistryError> {
        let handle = self.registry.resolve(&call.name)?;

        let violations = self.check_arguments(call);
        if !violations.is_empty() {
            warn!(
                tool = %call.name,
                violations = %violations.join("; "),
                "Arguments do not match tool schema; forwarding anyway"
            );
        }

        debug!(tool = %call.name, id = %call.id, "Invoking tool");
        let result = match handle.execute(call.input.clone()).await {
            Ok(output) if output.is_error => {
                ToolResult::error(call, format!("Error: {}", output.content))
            }
            Ok(output) => ToolResult::success(call, output.content),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool invocation failed");
                ToolResult::error(call, format!("Error executing tool: {}", e))
            }
        };
        Ok(result)
    }

    /// Advisory schema check; the remote side has the final say.
    fn check_arguments(&self, call: &ToolCall) -> Vec<String> {
        let Some(schema) = self.validators.get(&call.name) else {
            return Vec::new();
        };
        match schema.validate(&call.input) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|e| e.to_string()).collect(),
        }
    }
}
