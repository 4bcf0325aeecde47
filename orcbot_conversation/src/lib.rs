#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversational orchestration for the chat bot.
//!
//! One inbound message becomes one turn:
//! - the thread's messages are assembled into a bounded transcript
//! - opt-out markers suppress the turn
//! - issue links enrich the prompt, and a create command short-circuits it
//! - a knowledge-base answer is reframed by a second completion pass
//! - the reply is posted and the knowledge session token persisted

mod enricher;
mod error;
mod generator;
mod history;
mod orchestrator;
mod prompt;

pub use enricher::{CreateCommandOutcome, IssueEnricher, extract_issue_key};
pub use error::{GenerationError, TurnError};
pub use generator::{GeneratorConfig, KnowledgeGenerator, extract_reply};
pub use history::{AssembledTurn, HistoryAssembler, HistoryConfig};
pub use orchestrator::{IncomingMessage, Orchestrator, TurnOutcome};
pub use prompt::SmartPrompt;
