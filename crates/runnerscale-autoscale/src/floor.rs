//! Floor, ceiling, and fixed-override resolution.
//!
//! Validation happens here, before any provider call: an organization fleet
//! without a repository list cannot be polled and fails the pass.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use runnerscale_core::{AutoscalingPolicy, MetricSpec, RepositoryRef, ScaleTarget, Scope};

use crate::error::{AutoscaleError, AutoscaleResult};
use crate::schedule::{OverrideMatch, match_overrides};

/// Constraints for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Floor {
    pub min_replicas: u32,
    /// Unbounded when absent.
    pub max_replicas: Option<u32>,
    /// Manual override; skips the demand pipeline when set.
    pub fixed: Option<u32>,
    /// Repositories the demand metric polls. `None` when the fleet has no
    /// demand metric and sits at its floor.
    pub repositories: Option<Vec<RepositoryRef>>,
    /// Scheduled overrides in effect, for observability.
    pub overrides: OverrideMatch,
}

impl Floor {
    /// Clamp `replicas` into `[min, max]`. The ceiling wins a conflict.
    pub fn clamp(&self, replicas: u32) -> u32 {
        let raised = replicas.max(self.min_replicas);
        match self.max_replicas {
            Some(max) => raised.min(max),
            None => raised,
        }
    }
}

/// Validate `policy` against `target` and resolve the pass constraints.
pub fn resolve_floor(
    now: DateTime<Utc>,
    policy: &AutoscalingPolicy,
    target: &ScaleTarget,
) -> AutoscaleResult<Floor> {
    let repositories = polled_repositories(policy, target)?;
    let overrides = match_overrides(now, &policy.scheduled_overrides)?;

    let default_min = if target.fixed.is_some() { 0 } else { 1 };
    let min_replicas = overrides
        .min_replicas()
        .or(policy.min_replicas)
        .unwrap_or(default_min);

    if let Some(max) = policy.max_replicas
        && max < min_replicas
    {
        return Err(AutoscaleError::Invariant(format!(
            "fleet {}: max_replicas {max} is below min_replicas {min_replicas}",
            target.key()
        )));
    }

    if let Some(window) = &overrides.active {
        debug!(
            fleet = %target.key(),
            min_replicas = window.min_replicas,
            until = %window.end,
            "scheduled override active"
        );
    }

    Ok(Floor {
        min_replicas,
        max_replicas: policy.max_replicas,
        fixed: target.fixed,
        repositories,
        overrides,
    })
}

/// Repositories the fleet's demand metric polls.
fn polled_repositories(
    policy: &AutoscalingPolicy,
    target: &ScaleTarget,
) -> AutoscaleResult<Option<Vec<RepositoryRef>>> {
    match &target.scope {
        // With or without a declared metric, a repository fleet polls itself.
        Scope::Repository { repository } => Ok(Some(vec![repository.clone()])),
        Scope::Organization {
            organization,
            repositories,
        } => {
            if repositories.is_empty() {
                return Err(AutoscaleError::Validation(format!(
                    "validating scale target: organization fleet {} must list one or more repositories",
                    target.key()
                )));
            }

            let Some(MetricSpec::TotalNumberOfQueuedAndInProgressWorkflowRuns {
                repository_names,
            }) = policy.primary_metric()
            else {
                return Ok(None);
            };

            if repository_names.is_empty() {
                return Err(AutoscaleError::Validation(
                    "validating autoscaling metrics: metrics[].repository_names is required and must have one or more entries for organization fleets"
                        .to_string(),
                ));
            }

            let declared: BTreeSet<&String> = repositories.iter().collect();
            let polled: BTreeSet<&String> = repository_names.iter().collect();
            if declared != polled {
                return Err(AutoscaleError::Validation(format!(
                    "validating autoscaling metrics: metrics[].repository_names {repository_names:?} does not match the repositories of fleet {} {repositories:?}",
                    target.key()
                )));
            }

            Ok(Some(
                repository_names
                    .iter()
                    .map(|name| RepositoryRef::new(organization.clone(), name.clone()))
                    .collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runnerscale_core::ScheduledOverride;

    fn now() -> DateTime<Utc> {
        "2026-04-01T12:00:00Z".parse().unwrap()
    }

    fn repo_target() -> ScaleTarget {
        ScaleTarget::repository("ci", RepositoryRef::new("test", "valid"))
    }

    fn org_target(repos: &[&str]) -> ScaleTarget {
        ScaleTarget::organization("org-ci", "test", repos.iter().map(|r| r.to_string()).collect())
    }

    fn org_policy(repos: &[&str]) -> AutoscalingPolicy {
        AutoscalingPolicy {
            min_replicas: Some(1),
            max_replicas: Some(3),
            metrics: vec![MetricSpec::TotalNumberOfQueuedAndInProgressWorkflowRuns {
                repository_names: repos.iter().map(|r| r.to_string()).collect(),
            }],
            ..AutoscalingPolicy::default()
        }
    }

    #[test]
    fn explicit_bounds() {
        let floor = resolve_floor(now(), &AutoscalingPolicy::bounded(2, 3), &repo_target()).unwrap();
        assert_eq!(floor.min_replicas, 2);
        assert_eq!(floor.max_replicas, Some(3));
        assert_eq!(floor.fixed, None);
        assert_eq!(
            floor.repositories,
            Some(vec![RepositoryRef::new("test", "valid")])
        );
    }

    #[test]
    fn min_defaults_to_one() {
        let floor = resolve_floor(now(), &AutoscalingPolicy::default(), &repo_target()).unwrap();
        assert_eq!(floor.min_replicas, 1);
        assert_eq!(floor.max_replicas, None);
    }

    #[test]
    fn fixed_without_min_defaults_floor_to_zero() {
        let target = repo_target().with_fixed(4);
        let floor = resolve_floor(now(), &AutoscalingPolicy::default(), &target).unwrap();
        assert_eq!(floor.fixed, Some(4));
        assert_eq!(floor.min_replicas, 0);

        let floor = resolve_floor(now(), &AutoscalingPolicy::bounded(1, 3), &target).unwrap();
        assert_eq!(floor.min_replicas, 1);
        assert_eq!(floor.clamp(4), 3);
    }

    #[test]
    fn organization_requires_metric_repositories() {
        let err = resolve_floor(now(), &org_policy(&[]), &org_target(&["valid"])).unwrap_err();
        assert!(matches!(err, AutoscaleError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "validating autoscaling metrics: metrics[].repository_names is required and must have one or more entries for organization fleets"
        );
    }

    #[test]
    fn organization_requires_target_repositories() {
        let err = resolve_floor(now(), &org_policy(&["valid"]), &org_target(&[])).unwrap_err();
        assert!(matches!(err, AutoscaleError::Validation(_)));
    }

    #[test]
    fn organization_repository_lists_must_match() {
        let err =
            resolve_floor(now(), &org_policy(&["valid", "other"]), &org_target(&["valid"])).unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let floor = resolve_floor(
            now(),
            &org_policy(&["b", "a"]),
            &org_target(&["a", "b"]),
        )
        .unwrap();
        assert_eq!(
            floor.repositories,
            Some(vec![RepositoryRef::new("test", "b"), RepositoryRef::new("test", "a")])
        );
    }

    #[test]
    fn organization_without_metrics_sits_at_floor() {
        let policy = AutoscalingPolicy {
            min_replicas: Some(2),
            ..AutoscalingPolicy::default()
        };
        let floor = resolve_floor(now(), &policy, &org_target(&["valid"])).unwrap();
        assert_eq!(floor.repositories, None);
        assert_eq!(floor.min_replicas, 2);
    }

    #[test]
    fn max_below_min_is_an_invariant_violation() {
        let err = resolve_floor(now(), &AutoscalingPolicy::bounded(4, 2), &repo_target()).unwrap_err();
        assert!(matches!(err, AutoscaleError::Invariant(_)));
    }

    #[test]
    fn scheduled_override_replaces_min() {
        let mut policy = AutoscalingPolicy::bounded(2, 10);
        policy.scheduled_overrides.push(ScheduledOverride {
            start_time: "2026-04-01T00:00:00Z".parse().unwrap(),
            end_time: "2026-04-02T00:00:00Z".parse().unwrap(),
            min_replicas: 0,
            recurrence: None,
        });
        let floor = resolve_floor(now(), &policy, &repo_target()).unwrap();
        assert_eq!(floor.min_replicas, 0);
        assert!(floor.overrides.active.is_some());
    }

    #[test]
    fn clamp_bounds() {
        let floor = resolve_floor(now(), &AutoscalingPolicy::bounded(2, 3), &repo_target()).unwrap();
        assert_eq!(floor.clamp(0), 2);
        assert_eq!(floor.clamp(2), 2);
        assert_eq!(floor.clamp(3), 3);
        assert_eq!(floor.clamp(9), 3);

        let unbounded = resolve_floor(now(), &AutoscalingPolicy::default(), &repo_target()).unwrap();
        assert_eq!(unbounded.clamp(1_000), 1_000);
    }
}
