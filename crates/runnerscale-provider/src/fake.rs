//! In-memory provider serving canned GitHub response bodies.
//!
//! Routes are keyed by the same REST paths a real client would request, so
//! tests exercise the wire decoding as well as the engine.

use std::collections::HashMap;
use std::sync::Mutex;

use runnerscale_core::{RepositoryRef, WorkflowJob};

use crate::adapter::{BoxFuture, RunPage, RunStatusFilter, WorkflowProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::github;

#[derive(Debug, Clone)]
enum Route {
    Body(String),
    Status { code: u16, message: String },
}

/// A provider backed by a path → response table.
#[derive(Debug, Default)]
pub struct FakeProvider {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve run listings for `repo`: unfiltered, queued, and in-progress.
    pub fn with_workflow_runs(
        mut self,
        repo: &RepositoryRef,
        all: &str,
        queued: &str,
        in_progress: &str,
    ) -> Self {
        for (status, body) in [
            (RunStatusFilter::All, all),
            (RunStatusFilter::Queued, queued),
            (RunStatusFilter::InProgress, in_progress),
        ] {
            self.routes.insert(
                github::workflow_runs_path(repo, status),
                Route::Body(body.to_string()),
            );
        }
        self
    }

    /// Serve job listings for runs in `repo`, keyed by run id.
    pub fn with_workflow_jobs<'b>(
        mut self,
        repo: &RepositoryRef,
        jobs: impl IntoIterator<Item = (u64, &'b str)>,
    ) -> Self {
        for (run_id, body) in jobs {
            self.routes.insert(
                github::workflow_jobs_path(repo, run_id),
                Route::Body(body.to_string()),
            );
        }
        self
    }

    /// Answer `path` with a non-success status.
    pub fn with_status(mut self, path: String, code: u16, message: &str) -> Self {
        self.routes.insert(
            path,
            Route::Status {
                code,
                message: message.to_string(),
            },
        );
        self
    }

    /// Paths requested so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn get(&self, path: String) -> ProviderResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(path.clone());
        }
        match self.routes.get(&path) {
            Some(Route::Body(body)) => Ok(body.clone()),
            Some(Route::Status { code, message }) => {
                Err(ProviderError::from_status(*code, message.clone()))
            }
            None => Err(ProviderError::from_status(404, format!("no route for {path}"))),
        }
    }
}

impl WorkflowProvider for FakeProvider {
    fn list_workflow_runs<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        status: RunStatusFilter,
    ) -> BoxFuture<'a, ProviderResult<RunPage>> {
        Box::pin(async move {
            let body = self.get(github::workflow_runs_path(repo, status))?;
            github::parse_workflow_runs(&body)
        })
    }

    fn list_workflow_jobs<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        run_id: u64,
    ) -> BoxFuture<'a, ProviderResult<Vec<WorkflowJob>>> {
        Box::pin(async move {
            let body = self.get(github::workflow_jobs_path(repo, run_id))?;
            github::parse_workflow_jobs(run_id, &body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use runnerscale_core::RunStatus;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("test", "valid")
    }

    #[tokio::test]
    async fn serves_runs_by_status() {
        let provider = FakeProvider::new().with_workflow_runs(
            &repo(),
            r#"{"total_count": 2, "workflow_runs":[{"status":"queued"}, {"status":"completed"}]}"#,
            r#"{"total_count": 1, "workflow_runs":[{"status":"queued"}]}"#,
            r#"{"total_count": 0, "workflow_runs":[]}"#,
        );

        let all = provider
            .list_workflow_runs(&repo(), RunStatusFilter::All)
            .await
            .unwrap();
        assert_eq!(all.total_count, 2);

        let queued = provider
            .list_workflow_runs(&repo(), RunStatusFilter::Queued)
            .await
            .unwrap();
        assert_eq!(queued.runs[0].status, RunStatus::Queued);

        assert_eq!(
            provider.requests(),
            vec![
                "/repos/test/valid/actions/runs".to_string(),
                "/repos/test/valid/actions/runs?status=queued".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let provider = FakeProvider::new();
        let err = provider.list_workflow_jobs(&repo(), 1).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn status_routes_surface_errors() {
        let provider = FakeProvider::new().with_status(
            github::workflow_jobs_path(&repo(), 5),
            502,
            "bad gateway",
        );
        let err = provider.list_workflow_jobs(&repo(), 5).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(err.status_code, Some(502));
    }
}
