use std::time::Duration;
use thiserror::Error;

/// Failures of the two-stage generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Knowledge retrieval failed: {0}")]
    Retrieval(anyhow::Error),

    #[error("Knowledge base returned an empty answer")]
    EmptyKnowledgeAnswer,

    #[error("Completion model failed: {0}")]
    Completion(anyhow::Error),

    #[error("Completion model returned an empty reply")]
    EmptyReply,
}

/// Why a turn ended without a reply.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Chat transport error: {0}")]
    Transport(anyhow::Error),

    #[error("Turn timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}
