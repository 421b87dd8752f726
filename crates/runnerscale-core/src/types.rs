//! Domain types shared across runnerscale crates.
//!
//! Fleet targets and policies are rebuilt from configuration every pass,
//! queue snapshots are fetched fresh every pass, and `ScaleHistory` is the
//! only record that outlives a pass.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label every self-hosted runner implicitly advertises.
pub const SELF_HOSTED_LABEL: &str = "self-hosted";

/// Identity of a fleet; keys its `ScaleHistory`.
pub type FleetKey = String;

// ── Targets ────────────────────────────────────────────────────────

/// A repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Returns `None` unless both halves are non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where a fleet's runners are registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Repository {
        repository: RepositoryRef,
    },
    /// Organization runners; `repositories` are the member repos to poll.
    Organization {
        organization: String,
        repositories: Vec<String>,
    },
}

/// A fleet of self-hosted runners sharing one capability label set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTarget {
    pub name: FleetKey,
    pub scope: Scope,
    /// Configured capability labels. `self-hosted` is implied.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Manual replica override.
    #[serde(default)]
    pub fixed: Option<u32>,
}

impl ScaleTarget {
    pub fn repository(name: impl Into<String>, repository: RepositoryRef) -> Self {
        Self {
            name: name.into(),
            scope: Scope::Repository { repository },
            labels: Vec::new(),
            fixed: None,
        }
    }

    pub fn organization(
        name: impl Into<String>,
        organization: impl Into<String>,
        repositories: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            scope: Scope::Organization {
                organization: organization.into(),
                repositories,
            },
            labels: Vec::new(),
            fixed: None,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fixed(mut self, replicas: u32) -> Self {
        self.fixed = Some(replicas);
        self
    }

    pub fn key(&self) -> &str {
        &self.name
    }

    pub fn is_organization(&self) -> bool {
        matches!(self.scope, Scope::Organization { .. })
    }

    /// Configured labels plus the implicit `self-hosted`.
    pub fn effective_labels(&self) -> BTreeSet<String> {
        let mut labels: BTreeSet<String> = self.labels.iter().cloned().collect();
        labels.insert(SELF_HOSTED_LABEL.to_string());
        labels
    }
}

// ── Policy ─────────────────────────────────────────────────────────

/// Demand signal a policy scales on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetricSpec {
    /// Queued plus in-progress workflow runs (or matching jobs, when the
    /// provider links jobs to runs).
    TotalNumberOfQueuedAndInProgressWorkflowRuns {
        /// Member repositories to poll; required for organization fleets.
        #[serde(default)]
        repository_names: Vec<String>,
    },
}

impl MetricSpec {
    pub fn queued_and_in_progress() -> Self {
        MetricSpec::TotalNumberOfQueuedAndInProgressWorkflowRuns {
            repository_names: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricSpec::TotalNumberOfQueuedAndInProgressWorkflowRuns { .. } => {
                "TotalNumberOfQueuedAndInProgressWorkflowRuns"
            }
        }
    }
}

/// Extra replicas held until `expiration_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityReservation {
    pub replicas: u32,
    pub expiration_time: DateTime<Utc>,
}

/// How often a scheduled override repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Last instant a recurrence may start. Unbounded if absent.
    #[serde(default)]
    pub until_time: Option<DateTime<Utc>>,
}

/// Replaces the policy floor while `now` falls within the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOverride {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub min_replicas: u32,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
}

/// Autoscaling configuration attached to a fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalingPolicy {
    #[serde(default)]
    pub min_replicas: Option<u32>,
    #[serde(default)]
    pub max_replicas: Option<u32>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    /// Overrides the engine's default scale-down delay.
    #[serde(default)]
    pub scale_down_delay_secs: Option<u64>,
    #[serde(default)]
    pub capacity_reservations: Vec<CapacityReservation>,
    #[serde(default)]
    pub scheduled_overrides: Vec<ScheduledOverride>,
}

impl AutoscalingPolicy {
    pub fn bounded(min: u32, max: u32) -> Self {
        Self {
            min_replicas: Some(min),
            max_replicas: Some(max),
            metrics: vec![MetricSpec::queued_and_in_progress()],
            ..Self::default()
        }
    }

    /// The metric the engine evaluates. Only the first one counts.
    pub fn primary_metric(&self) -> Option<&MetricSpec> {
        self.metrics.first()
    }
}

/// A target and its policy, as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    pub target: ScaleTarget,
    pub policy: AutoscalingPolicy,
}

// ── History ────────────────────────────────────────────────────────

/// Per-fleet hysteresis record carried between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleHistory {
    /// Replica count decided by the last successful pass.
    pub committed_replicas: u32,
    /// Last time the committed count went up (or held steady).
    #[serde(default)]
    pub last_scale_out_time: Option<DateTime<Utc>>,
}

// ── Queue ──────────────────────────────────────────────────────────

/// Status of a workflow run or job as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Queued or in progress, i.e. still needs a runner.
    pub fn is_pending(self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// 0 when the provider did not link the run to its jobs.
    pub id: u64,
    pub status: RunStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub run_id: u64,
    pub status: RunStatus,
    /// Labels the job's `runs-on` requires.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Queue state for one fleet, fetched once per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queued_total: u32,
    pub in_progress_total: u32,
    /// Queued and in-progress runs.
    pub runs: Vec<WorkflowRun>,
    /// Jobs keyed by run id, only for runs with a non-zero id.
    pub jobs: BTreeMap<u64, Vec<WorkflowJob>>,
}

impl QueueSnapshot {
    /// True when at least one run carries a non-zero id.
    pub fn has_job_linkage(&self) -> bool {
        self.runs.iter().any(|run| run.id != 0)
    }

    pub fn jobs_for(&self, run_id: u64) -> &[WorkflowJob] {
        self.jobs.get(&run_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
