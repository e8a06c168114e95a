pub mod gemini;

use std::sync::Arc;

use relay_core::config::LlmConfig;
use relay_tool_runtime::provider::{LlmError, ToolAwareLlmProvider};

/// Create the tool-calling provider named by config.
pub fn create_provider(
    llm_config: &LlmConfig,
) -> Result<Arc<dyn ToolAwareLlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "gemini" | "google" => {
            let api_key = llm_config
                .google_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GOOGLE_API_KEY not set".into()))?;
            Ok(Arc::new(gemini::GeminiToolProvider::new(
                api_key.clone(),
                llm_config.gemini_model.clone(),
                llm_config.gemini_base_url.clone(),
            )))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            google_api_key: key.map(String::from),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
        }
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let err = create_provider(&config("gemini", None)).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(ref m) if m.contains("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_gemini_and_google_aliases() {
        for name in ["gemini", "google"] {
            let provider = create_provider(&config(name, Some("k"))).unwrap();
            assert_eq!(provider.provider_name(), "gemini");
        }
    }

    #[test]
    fn test_unknown_provider() {
        let err = create_provider(&config("ollama", Some("k"))).err().unwrap();
        assert!(err.to_string().contains("ollama"));
    }
}
