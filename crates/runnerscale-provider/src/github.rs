//! GitHub Actions REST paths and response bodies.
//!
//! Only the fields the engine reads are modeled. Missing ids decode as 0,
//! which marks a run without job linkage.

use serde::Deserialize;

use runnerscale_core::{RepositoryRef, RunStatus, WorkflowJob, WorkflowRun};

use crate::adapter::{RunPage, RunStatusFilter};
use crate::error::{ProviderError, ProviderResult};

/// `GET /repos/{owner}/{repo}/actions/runs[?status=...]`
pub fn workflow_runs_path(repo: &RepositoryRef, status: RunStatusFilter) -> String {
    match status.as_query() {
        Some(q) => format!("/repos/{}/{}/actions/runs?status={q}", repo.owner, repo.name),
        None => format!("/repos/{}/{}/actions/runs", repo.owner, repo.name),
    }
}

/// `GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs`
pub fn workflow_jobs_path(repo: &RepositoryRef, run_id: u64) -> String {
    format!(
        "/repos/{}/{}/actions/runs/{run_id}/jobs",
        repo.owner, repo.name
    )
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsBody {
    #[serde(default)]
    total_count: u32,
    #[serde(default)]
    workflow_runs: Vec<RunBody>,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    status: Option<RunStatus>,
}

#[derive(Debug, Deserialize)]
struct WorkflowJobsBody {
    #[serde(default)]
    jobs: Vec<JobBody>,
}

#[derive(Debug, Deserialize)]
struct JobBody {
    #[serde(default)]
    run_id: Option<u64>,
    #[serde(default)]
    status: Option<RunStatus>,
    #[serde(default)]
    labels: Vec<String>,
}

/// Decode a workflow-runs listing.
pub fn parse_workflow_runs(body: &str) -> ProviderResult<RunPage> {
    let body: WorkflowRunsBody =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed("workflow runs", e))?;
    Ok(RunPage {
        total_count: body.total_count,
        runs: body
            .workflow_runs
            .into_iter()
            .map(|r| WorkflowRun {
                id: r.id,
                status: r.status.unwrap_or(RunStatus::Other),
            })
            .collect(),
    })
}

/// Decode a workflow-jobs listing for `run_id`.
pub fn parse_workflow_jobs(run_id: u64, body: &str) -> ProviderResult<Vec<WorkflowJob>> {
    let body: WorkflowJobsBody =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed("workflow jobs", e))?;
    Ok(body
        .jobs
        .into_iter()
        .map(|j| WorkflowJob {
            run_id: j.run_id.unwrap_or(run_id),
            status: j.status.unwrap_or(RunStatus::Other),
            labels: j.labels,
        })
        .collect())
}
