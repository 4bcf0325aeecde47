#![deny(
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

//! Slack adapter: Web API client, Events API webhook and turn dispatch.

mod bot;
mod client;
mod dispatcher;
mod error;
mod events;
mod server;

pub use bot::SlackBot;
pub use client::{BotIdentity, SlackClient};
pub use dispatcher::TurnDispatcher;
pub use error::{Error, Result};
pub use events::{EventPayload, MessageEvent, SlackEnvelope};
pub use server::{HEALTH_PATH, events_router};
