// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model provider implementations.
//!
//! The harness talks to OpenAI or any endpoint that speaks the same Chat
//! Completions dialect (Azure OpenAI, Ollama, vLLM, ...).
//!
//! ```rust,ignore
//! use mcpdemo::providers::create_provider_from_env;
//!
//! let provider = create_provider_from_env()?;
//! let response = provider.chat(&messages, Some(&tools), None).await?;
//! ```

pub mod openai;

pub use openai::OpenAIProvider;

use crate::error::ProviderError;
use crate::types::{BoxedProvider, ProviderConfig};

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "API_KEY"];

/// Which endpoint a base URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderType {
    /// api.openai.com
    OpenAI,
    /// Any OpenAI-compatible API at a custom base URL
    OpenAICompatible,
}

impl ProviderType {
    fn for_base_url(base_url: Option<&str>) -> Self {
        match base_url {
            Some(url) if !url.contains("api.openai.com") => Self::OpenAICompatible,
            _ => Self::OpenAI,
        }
    }

    /// Only api.openai.com insists on a key.
    fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

/// Create a provider from configuration.
///
/// # Errors
///
/// Returns [`ProviderError::NotConfigured`] when the API key is missing for
/// api.openai.com.
pub fn create_provider(config: ProviderConfig) -> Result<BoxedProvider, ProviderError> {
    let provider_type = ProviderType::for_base_url(config.base_url.as_deref());

    if provider_type.requires_api_key() && config.api_key.is_none() {
        return Err(ProviderError::NotConfigured(
            "Please configure your API key in the project.".to_string(),
        ));
    }

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| openai::OPENAI_BASE_URL.to_string());

    Ok(Box::new(OpenAIProvider::new(
        config.api_key.clone(),
        model,
        base_url,
        config,
    )?))
}

/// Read the API key from the environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

/// Create a provider from environment variables.
///
/// | Variable | Description |
/// |----------|-------------|
/// | `OPENAI_API_KEY` / `API_KEY` | API key |
/// | `OPENAI_BASE_URL` | Custom endpoint |
/// | `MCPDEMO_MODEL` | Model override (default `gpt-4o`) |
pub fn create_provider_from_env() -> Result<BoxedProvider, ProviderError> {
    let config = ProviderConfig {
        api_key: api_key_from_env(),
        base_url: std::env::var("OPENAI_BASE_URL").ok(),
        model: std::env::var("MCPDEMO_MODEL").ok(),
        ..Default::default()
    };
    create_provider(config)
}
