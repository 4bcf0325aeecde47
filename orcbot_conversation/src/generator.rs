//! Two-stage knowledge-augmented generation.

use orcbot_config::{CompletionConfig, ConversationConfig};
use orcbot_core::{
    CompletionModel, CompletionRequest, ConversationHistory, ConversationThread,
    GenerationRequest, GenerationResult, KnowledgeService,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::prompt::SmartPrompt;

/// Sampling and output conventions for the second pass.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub sentinel: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.25,
            top_p: 1.0,
            sentinel: "USER_RESPONSE".to_string(),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn from_config(completion: &CompletionConfig, conversation: &ConversationConfig) -> Self {
        Self {
            temperature: completion.temperature,
            top_p: completion.top_p,
            sentinel: conversation.sentinel.clone(),
        }
    }
}

/// Isolate the user-facing reply from raw model output.
///
/// The reply is the text strictly between the first and second occurrence
/// of `sentinel`. With fewer than two occurrences the raw text is returned
/// unchanged.
#[must_use]
pub fn extract_reply<'a>(raw: &'a str, sentinel: &str) -> &'a str {
    if sentinel.is_empty() {
        return raw;
    }
    let mut pieces = raw.split(sentinel).skip(1);
    match (pieces.next(), pieces.next()) {
        (Some(reply), Some(_)) => reply,
        _ => raw,
    }
}

pub struct KnowledgeGenerator {
    knowledge: Arc<dyn KnowledgeService>,
    completion: Arc<dyn CompletionModel>,
    config: GeneratorConfig,
}

impl KnowledgeGenerator {
    pub fn new(
        knowledge: Arc<dyn KnowledgeService>,
        completion: Arc<dyn CompletionModel>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            knowledge,
            completion,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Retrieve an answer from the knowledge base, then reframe it.
    ///
    /// The thread's session token keeps the knowledge service's own
    /// conversation alive. A failed or empty retrieval aborts before the
    /// completion model is called.
    pub async fn generate(
        &self,
        thread: &ConversationThread,
        history: &ConversationHistory,
        user: &str,
        prompt: &str,
    ) -> Result<GenerationResult, GenerationError> {
        let answer = self
            .knowledge
            .retrieve_and_generate(prompt, thread.session_token())
            .await
            .map_err(GenerationError::Retrieval)?;

        if answer.text.trim().is_empty() {
            return Err(GenerationError::EmptyKnowledgeAnswer);
        }
        debug!("Knowledge base answer: {}", answer.text);

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            knowledge_answer: answer.text,
            history: history.joined(),
            user: user.to_string(),
        };

        let completion_request = CompletionRequest {
            prompt: SmartPrompt::new(&request, &self.config.sentinel).render(),
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        let raw = self
            .completion
            .complete(&completion_request)
            .await
            .map_err(GenerationError::Completion)?;

        let reply = extract_reply(&raw, &self.config.sentinel);
        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyReply);
        }

        let session_id = answer
            .session_id
            .unwrap_or_else(|| thread.session_id.clone());
        info!("Generated reply ({} chars) for thread {}", reply.len(), thread.key);

        Ok(GenerationResult {
            session_id,
            reply: reply.to_string(),
        })
    }
}
