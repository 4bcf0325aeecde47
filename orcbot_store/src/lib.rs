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

//! Persistence of per-thread session state.
//!
//! `ThreadRepository` is what the orchestrator talks to. It wraps any
//! `ThreadStore` backend with read retries, call timeouts, degrade-to-empty
//! lookups and a per-key lock table that serializes resolve and persist for
//! one thread.

pub mod entity;
mod locks;
mod manager;
mod memory;
mod repository;

pub use locks::{ThreadGuard, ThreadLocks};
pub use manager::SeaOrmThreadStore;
pub use memory::MemoryThreadStore;
pub use repository::ThreadRepository;
