//! Model interaction: the client seam and the prompt-stage driver.
//!
//! Stages never see a concrete provider. They talk to [`ModelClient`], and
//! [`ModelClients`] maps each [`ModelRole`] to one client. Production code
//! backs the trait with an `edgequake_llm` provider ([`ProviderClient`]);
//! tests inject stubs through [`crate::config::AnalyzerConfigBuilder::models`].
//!
//! All prompt text lives in [`crate::prompts`].

use crate::config::{AnalyzerConfig, ModelRole};
use crate::error::AnalyzerError;
use crate::pipeline::postprocess::strip_reasoning_trace;
use crate::pipeline::Stage;
use crate::prompts::{ANALYZER_SYSTEM_PROMPT, SUMMARIZER_SYSTEM_PROMPT, VALIDATOR_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

// ── Messages ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

/// One turn of a stage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── ModelClient ──────────────────────────────────────────────────────────

/// A chat model that turns an ordered message list into one completion.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, AnalyzerError>;
}

/// Role → client binding shared by every run of a pipeline.
#[derive(Clone)]
pub struct ModelClients {
    analyzer: Arc<dyn ModelClient>,
    summary: Arc<dyn ModelClient>,
}

impl fmt::Debug for ModelClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClients")
            .field("analyzer", &"<dyn ModelClient>")
            .field("summary", &"<dyn ModelClient>")
            .finish()
    }
}

impl ModelClients {
    pub fn new(analyzer: Arc<dyn ModelClient>, summary: Arc<dyn ModelClient>) -> Self {
        Self { analyzer, summary }
    }

    /// Bind both roles to the same client.
    pub fn shared(client: Arc<dyn ModelClient>) -> Self {
        Self {
            analyzer: Arc::clone(&client),
            summary: client,
        }
    }

    pub fn client(&self, role: ModelRole) -> &Arc<dyn ModelClient> {
        match role {
            ModelRole::Analyzer => &self.analyzer,
            ModelRole::Summary => &self.summary,
        }
    }

    /// Build one provider-backed client per role from the configured backend.
    ///
    /// Provider construction reads API keys from the environment; a provider
    /// that cannot be built is reported as a missing dependency.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let analyzer = ProviderClient::from_config(config, ModelRole::Analyzer)?;
        let summary = ProviderClient::from_config(config, ModelRole::Summary)?;
        Ok(Self::new(Arc::new(analyzer), Arc::new(summary)))
    }
}

// ── ProviderClient ───────────────────────────────────────────────────────

/// [`ModelClient`] backed by an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    role: ModelRole,
    options: CompletionOptions,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, role: ModelRole, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            role,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }

    pub fn from_config(config: &AnalyzerConfig, role: ModelRole) -> Result<Self, AnalyzerError> {
        let binding = config.role_binding(role);
        let provider_name = config.provider_name();
        let provider = ProviderFactory::create_llm_provider(provider_name, &binding.model)
            .map_err(|e| AnalyzerError::DependencyMissing {
                dependency: provider_name.to_string(),
                hint: format!(
                    "Could not create the '{provider_name}' client for model '{}' ({role} role): {e}",
                    binding.model
                ),
            })?;
        debug!(
            "Bound {} role to {}/{} (temperature {})",
            role, provider_name, binding.model, binding.temperature
        );
        Ok(Self::new(provider, role, binding.temperature, config.max_tokens))
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, AnalyzerError> {
        let chat: Vec<ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                MessageRole::System => ChatMessage::system(m.content.as_str()),
                MessageRole::User => ChatMessage::user(m.content.as_str()),
            })
            .collect();

        let start = Instant::now();
        let response = self
            .provider
            .chat(&chat, Some(&self.options))
            .await
            .map_err(|e| {
                warn!("{} model call failed: {}", self.role, e);
                AnalyzerError::UpstreamModelError {
                    role: self.role,
                    message: e.to_string(),
                }
            })?;

        debug!(
            "{} model: {} input tokens, {} output tokens, {:?}",
            self.role,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

// ── PromptStage ──────────────────────────────────────────────────────────

/// One model call: fixed instruction for the stage plus a user payload.
pub struct PromptStage {
    stage: Stage,
    client: Arc<dyn ModelClient>,
}

impl PromptStage {
    pub fn new(stage: Stage, client: Arc<dyn ModelClient>) -> Self {
        Self { stage, client }
    }

    /// The instruction sent as the system turn. `None` for extraction.
    pub fn instruction(stage: Stage) -> Option<&'static str> {
        match stage {
            Stage::Extract => None,
            Stage::Analyze => Some(ANALYZER_SYSTEM_PROMPT),
            Stage::Summarize => Some(SUMMARIZER_SYSTEM_PROMPT),
            Stage::Validate => Some(VALIDATOR_SYSTEM_PROMPT),
        }
    }

    /// Send `[system: instruction, user: payload]` and return the answer
    /// with any reasoning trace removed. No retry; a failed call fails the stage.
    pub async fn run(&self, payload: &str) -> Result<String, AnalyzerError> {
        let instruction = Self::instruction(self.stage).ok_or_else(|| {
            AnalyzerError::Internal(format!("stage '{}' is not a prompt stage", self.stage))
        })?;
        let messages = [PromptMessage::system(instruction), PromptMessage::user(payload)];
        let raw = self.client.generate(&messages).await?;
        Ok(strip_reasoning_trace(&raw).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Echo {
        reply: String,
        seen: Mutex<Vec<PromptMessage>>,
    }

    #[async_trait]
    impl ModelClient for Echo {
        async fn generate(&self, messages: &[PromptMessage]) -> Result<String, AnalyzerError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(self.reply.clone())
        }
    }

    fn echo(reply: &str) -> Arc<Echo> {
        Arc::new(Echo {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn prompt_stage_sends_instruction_then_payload() {
        let client = echo("ok");
        let stage = PromptStage::new(Stage::Summarize, client.clone());
        let out = stage.run("PAYLOAD").await.unwrap();
        assert_eq!(out, "ok");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], PromptMessage::system(SUMMARIZER_SYSTEM_PROMPT));
        assert_eq!(seen[1], PromptMessage::user("PAYLOAD"));
    }

    #[tokio::test]
    async fn prompt_stage_strips_reasoning_trace() {
        let stage = PromptStage::new(Stage::Analyze, echo("<think>hmm</think>### Medications"));
        assert_eq!(stage.run("x").await.unwrap(), "### Medications");
    }

    #[tokio::test]
    async fn extract_is_not_a_prompt_stage() {
        let stage = PromptStage::new(Stage::Extract, echo("unused"));
        assert!(matches!(
            stage.run("x").await.unwrap_err(),
            AnalyzerError::Internal(_)
        ));
    }

    #[test]
    fn shared_clients_bind_both_roles() {
        let client: Arc<dyn ModelClient> = echo("x");
        let clients = ModelClients::shared(Arc::clone(&client));
        assert!(Arc::ptr_eq(clients.client(ModelRole::Analyzer), &client));
        assert!(Arc::ptr_eq(clients.client(ModelRole::Summary), &client));
    }
}
