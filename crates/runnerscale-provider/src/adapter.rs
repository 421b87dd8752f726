//! The provider adapter the engine is injected with.

use std::future::Future;
use std::pin::Pin;

use runnerscale_core::{RepositoryRef, WorkflowJob, WorkflowRun};

use crate::error::ProviderResult;

/// Boxed future alias for provider calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Run status filter for list calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatusFilter {
    Queued,
    InProgress,
    All,
}

impl RunStatusFilter {
    /// Value of the `status` query parameter, if any.
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            RunStatusFilter::Queued => Some("queued"),
            RunStatusFilter::InProgress => Some("in_progress"),
            RunStatusFilter::All => None,
        }
    }
}

/// One listing of workflow runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPage {
    /// Total matching runs as reported by the provider.
    pub total_count: u32,
    pub runs: Vec<WorkflowRun>,
}

/// Read access to a CI provider's workflow queue, scoped per repository.
///
/// Implementations own authentication, pagination, and request timeouts.
/// Organization fleets are handled by calling these once per member
/// repository (see [`crate::fetch_snapshot`]).
pub trait WorkflowProvider: Send + Sync {
    /// List workflow runs in `repo` with the given status.
    fn list_workflow_runs<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        status: RunStatusFilter,
    ) -> BoxFuture<'a, ProviderResult<RunPage>>;

    /// List the jobs belonging to run `run_id` in `repo`.
    fn list_workflow_jobs<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        run_id: u64,
    ) -> BoxFuture<'a, ProviderResult<Vec<WorkflowJob>>>;
}
