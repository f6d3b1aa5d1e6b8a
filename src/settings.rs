use serde::{Deserialize, Serialize};

use crate::ai::ProviderConfig;
use crate::search::pager::DEFAULT_PAGE_SIZE;

/// Session preferences, edited through the preferences modal. Nothing here is
/// persisted; the API credential is seeded from the environment at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// "gemini" | "openai" | "grok" | "groq" | "openrouter" | "custom"
    pub ai_provider: String,
    pub api_key: Option<String>,
    /// Endpoint override for "custom" (OpenWebUI/LocalAI/vLLM/etc.).
    pub base_url: Option<String>,
    pub model: String,
    pub page_size: u32,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            ai_provider: "gemini".into(),
            api_key: None,
            base_url: None,
            model: "gemini-2.0-flash".into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl UiSettings {
    /// Defaults plus whatever credential the environment carries.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        for var in ["GEMINI_API_KEY", "AI_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    settings.api_key = Some(key);
                    break;
                }
            }
        }
        settings
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.ai_provider.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
        }
    }
}
