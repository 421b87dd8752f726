//! Queue snapshot assembly.
//!
//! For every polled repository: list queued and in-progress runs, keep the
//! reported totals, then fetch job lists for every pending run that carries
//! an id. Repositories and job lists are fetched concurrently; results are
//! folded in input order so the snapshot is reproducible.

use std::collections::BTreeSet;

use futures_util::future::try_join_all;
use tracing::debug;

use runnerscale_core::{QueueSnapshot, RepositoryRef};

use crate::adapter::{RunPage, RunStatusFilter, WorkflowProvider};
use crate::error::ProviderResult;

/// Runs listed for one repository.
struct RepoRuns<'r> {
    repo: &'r RepositoryRef,
    queued: RunPage,
    in_progress: RunPage,
}

/// Fetch the queue state of `repos` as one snapshot.
///
/// Any provider failure aborts the whole snapshot.
pub async fn fetch_snapshot(
    provider: &dyn WorkflowProvider,
    repos: &[RepositoryRef],
) -> ProviderResult<QueueSnapshot> {
    let listings = try_join_all(repos.iter().map(|repo| list_pending_runs(provider, repo))).await?;

    let mut snapshot = QueueSnapshot::default();
    let mut linked: Vec<(&RepositoryRef, u64)> = Vec::new();
    let mut seen = BTreeSet::new();

    for listing in &listings {
        snapshot.queued_total = snapshot
            .queued_total
            .saturating_add(listing.queued.total_count);
        snapshot.in_progress_total = snapshot
            .in_progress_total
            .saturating_add(listing.in_progress.total_count);

        let pending = listing
            .queued
            .runs
            .iter()
            .chain(&listing.in_progress.runs)
            .filter(|run| run.status.is_pending());
        for run in pending {
            if run.id == 0 {
                snapshot.runs.push(run.clone());
            } else if seen.insert(run.id) {
                snapshot.runs.push(run.clone());
                linked.push((listing.repo, run.id));
            }
        }

        debug!(
            repo = %listing.repo,
            queued = listing.queued.total_count,
            in_progress = listing.in_progress.total_count,
            "listed workflow runs"
        );
    }

    let job_lists = try_join_all(
        linked
            .iter()
            .map(|(repo, run_id)| provider.list_workflow_jobs(repo, *run_id)),
    )
    .await?;

    for ((_, run_id), jobs) in linked.into_iter().zip(job_lists) {
        snapshot.jobs.insert(run_id, jobs);
    }

    debug!(
        repos = repos.len(),
        runs = snapshot.runs.len(),
        linked_runs = snapshot.jobs.len(),
        "queue snapshot assembled"
    );
    Ok(snapshot)
}

async fn list_pending_runs<'r>(
    provider: &dyn WorkflowProvider,
    repo: &'r RepositoryRef,
) -> ProviderResult<RepoRuns<'r>> {
    let queued = provider
        .list_workflow_runs(repo, RunStatusFilter::Queued)
        .await?;
    let in_progress = provider
        .list_workflow_runs(repo, RunStatusFilter::InProgress)
        .await?;
    Ok(RepoRuns {
        repo,
        queued,
        in_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::fake::FakeProvider;
    use crate::github;
    use runnerscale_core::RunStatus;

    const ALL: &str = r#"{"total_count": 4, "workflow_runs":[{"id": 1, "status":"queued"}, {"id": 2, "status":"in_progress"}, {"id": 3, "status":"in_progress"}, {"status":"completed"}]}"#;
    const QUEUED: &str = r#"{"total_count": 1, "workflow_runs":[{"id": 1, "status":"queued"}]}"#;
    const IN_PROGRESS: &str = r#"{"total_count": 2, "workflow_runs":[{"id": 2, "status":"in_progress"}, {"id": 3, "status":"in_progress"}, {"status":"completed"}]}"#;

    fn repo(name: &str) -> RepositoryRef {
        RepositoryRef::new("test", name)
    }

    fn linked_provider(repo: &RepositoryRef) -> FakeProvider {
        FakeProvider::new()
            .with_workflow_runs(repo, ALL, QUEUED, IN_PROGRESS)
            .with_workflow_jobs(
                repo,
                [
                    (1, r#"{"jobs": [{"status":"queued", "labels":["self-hosted"]}]}"#),
                    (2, r#"{"jobs": [{"status":"in_progress"}, {"status":"completed"}]}"#),
                    (3, r#"{"jobs": []}"#),
                ],
            )
    }

    #[tokio::test]
    async fn collects_totals_runs_and_jobs() {
        let valid = repo("valid");
        let provider = linked_provider(&valid);

        let snapshot = fetch_snapshot(&provider, &[valid]).await.unwrap();
        assert_eq!(snapshot.queued_total, 1);
        assert_eq!(snapshot.in_progress_total, 2);
        // The completed entry in the in-progress listing is dropped.
        assert_eq!(snapshot.runs.len(), 3);
        assert_eq!(snapshot.jobs.len(), 3);
        assert_eq!(snapshot.jobs_for(2).len(), 2);
        assert_eq!(snapshot.jobs_for(1)[0].status, RunStatus::Queued);
        assert!(snapshot.has_job_linkage());
    }

    #[tokio::test]
    async fn legacy_runs_skip_job_fetches() {
        let valid = repo("valid");
        let provider = FakeProvider::new().with_workflow_runs(
            &valid,
            r#"{"total_count": 2, "workflow_runs":[{"status":"queued"}, {"status":"completed"}]}"#,
            r#"{"total_count": 1, "workflow_runs":[{"status":"queued"}]}"#,
            r#"{"total_count": 0, "workflow_runs":[]}"#,
        );

        let snapshot = fetch_snapshot(&provider, &[valid]).await.unwrap();
        assert!(!snapshot.has_job_linkage());
        assert!(snapshot.jobs.is_empty());
        assert!(
            provider
                .requests()
                .iter()
                .all(|path| !path.ends_with("/jobs"))
        );
    }

    #[tokio::test]
    async fn organization_fan_out_sums_repositories() {
        let (a, b) = (repo("a"), repo("b"));
        let provider = FakeProvider::new()
            .with_workflow_runs(
                &a,
                "{}",
                r#"{"total_count": 2, "workflow_runs":[{"status":"queued"}, {"status":"queued"}]}"#,
                r#"{"total_count": 0, "workflow_runs":[]}"#,
            )
            .with_workflow_runs(
                &b,
                "{}",
                r#"{"total_count": 0, "workflow_runs":[]}"#,
                r#"{"total_count": 3, "workflow_runs":[{"status":"in_progress"}, {"status":"in_progress"}, {"status":"in_progress"}]}"#,
            );

        let snapshot = fetch_snapshot(&provider, &[a, b]).await.unwrap();
        assert_eq!(snapshot.queued_total, 2);
        assert_eq!(snapshot.in_progress_total, 3);
        assert_eq!(snapshot.runs.len(), 5);
    }

    #[tokio::test]
    async fn fan_out_totals_saturate() {
        let (a, b) = (repo("a"), repo("b"));
        let huge = r#"{"total_count": 4294967295, "workflow_runs":[]}"#;
        let empty = r#"{"total_count": 0, "workflow_runs":[]}"#;
        let provider = FakeProvider::new()
            .with_workflow_runs(&a, "{}", huge, huge)
            .with_workflow_runs(&b, "{}", huge, empty);

        let snapshot = fetch_snapshot(&provider, &[a, b]).await.unwrap();
        assert_eq!(snapshot.queued_total, u32::MAX);
        assert_eq!(snapshot.in_progress_total, u32::MAX);
    }

    #[tokio::test]
    async fn job_fetch_failure_aborts_snapshot() {
        let valid = repo("valid");
        let provider = linked_provider(&valid).with_status(
            github::workflow_jobs_path(&valid, 3),
            500,
            "boom",
        );

        let err = fetch_snapshot(&provider, &[valid]).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Transient);
    }

    #[tokio::test]
    async fn duplicate_run_ids_fetch_jobs_once() {
        let valid = repo("valid");
        let provider = FakeProvider::new()
            .with_workflow_runs(
                &valid,
                "{}",
                r#"{"total_count": 1, "workflow_runs":[{"id": 8, "status":"queued"}]}"#,
                r#"{"total_count": 1, "workflow_runs":[{"id": 8, "status":"in_progress"}]}"#,
            )
            .with_workflow_jobs(&valid, [(8, r#"{"jobs": []}"#)]);

        let snapshot = fetch_snapshot(&provider, &[valid]).await.unwrap();
        assert_eq!(snapshot.runs.len(), 1);
        let job_requests = provider
            .requests()
            .into_iter()
            .filter(|path| path.ends_with("/jobs"))
            .count();
        assert_eq!(job_requests, 1);
    }
}
