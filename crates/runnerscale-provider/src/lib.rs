//! runnerscale-provider: access to a CI provider's workflow queue.
//!
//! The decision engine never talks HTTP itself. It consumes a
//! [`WorkflowProvider`] and turns per-repository run and job listings into
//! one [`QueueSnapshot`](runnerscale_core::QueueSnapshot) per pass.
//!
//! # Layout
//!
//! ```text
//! WorkflowProvider (trait, injected)
//!   ├── github   GitHub REST paths and response bodies
//!   ├── fake     in-memory provider serving canned bodies
//!   └── snapshot fan-out across repositories, concurrent job fetches
//! ```

pub mod adapter;
pub mod error;
pub mod fake;
pub mod github;
pub mod snapshot;

pub use adapter::{BoxFuture, RunPage, RunStatusFilter, WorkflowProvider};
pub use error::{ProviderError, ProviderErrorKind, ProviderResult};
pub use fake::FakeProvider;
pub use snapshot::fetch_snapshot;
