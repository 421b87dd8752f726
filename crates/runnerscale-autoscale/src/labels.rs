//! Job-to-fleet label matching.

use std::collections::BTreeSet;

use runnerscale_core::SELF_HOSTED_LABEL;

/// Whether a job requiring `job_labels` can run on a fleet offering
/// `fleet_labels`.
///
/// Jobs with no labels, or without `self-hosted`, target provider-hosted
/// runners and never match. Otherwise every required label must be offered.
pub fn matches(job_labels: &[String], fleet_labels: &BTreeSet<String>) -> bool {
    !job_labels.is_empty()
        && job_labels.iter().any(|l| l == SELF_HOSTED_LABEL)
        && job_labels.iter().all(|l| fleet_labels.contains(l))
}
