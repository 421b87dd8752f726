//! runnerscale.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::types::{
    AutoscalingPolicy, CapacityReservation, Fleet, MetricSpec, RepositoryRef, ScaleTarget,
    ScheduledOverride, Scope,
};

/// Scale-down delay used when neither the engine nor the policy sets one.
const FALLBACK_SCALE_DOWN_DELAY: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerscaleConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, rename = "fleet")]
    pub fleets: Vec<FleetConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub default_scale_down_delay: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub name: String,
    /// `owner/name` for repository runners.
    pub repository: Option<String>,
    /// Organization name for organization runners.
    pub organization: Option<String>,
    pub repositories: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    /// Fixed replica count.
    pub replicas: Option<u32>,
    pub autoscaling: Option<AutoscalingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscalingConfig {
    pub min_replicas: Option<u32>,
    pub max_replicas: Option<u32>,
    pub scale_down_delay: Option<String>,
    pub metrics: Option<Vec<MetricSpec>>,
    pub capacity_reservations: Option<Vec<CapacityReservation>>,
    pub scheduled_overrides: Option<Vec<ScheduledOverride>>,
}

impl RunnerscaleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: RunnerscaleConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Engine-wide scale-down delay, defaulting to ten minutes.
    pub fn default_scale_down_delay(&self) -> anyhow::Result<Duration> {
        match &self.engine.default_scale_down_delay {
            Some(s) => parse_duration(s).context("engine.default_scale_down_delay"),
            None => Ok(FALLBACK_SCALE_DOWN_DELAY),
        }
    }

    /// Build the declared fleets, rejecting structurally invalid entries.
    pub fn fleets(&self) -> anyhow::Result<Vec<Fleet>> {
        let mut fleets = Vec::with_capacity(self.fleets.len());
        for fc in &self.fleets {
            if fleets.iter().any(|f: &Fleet| f.target.name == fc.name) {
                bail!("duplicate fleet name {:?}", fc.name);
            }
            fleets.push(fc.to_fleet().with_context(|| format!("fleet {:?}", fc.name))?);
        }
        Ok(fleets)
    }
}

impl FleetConfig {
    pub fn to_fleet(&self) -> anyhow::Result<Fleet> {
        let scope = match (&self.repository, &self.organization) {
            (Some(repo), None) => {
                if self.repositories.is_some() {
                    bail!("repositories may only be set for organization fleets");
                }
                let repository = RepositoryRef::parse(repo)
                    .with_context(|| format!("repository {repo:?} is not in owner/name form"))?;
                Scope::Repository { repository }
            }
            (None, Some(org)) => Scope::Organization {
                organization: org.clone(),
                repositories: self.repositories.clone().unwrap_or_default(),
            },
            (Some(_), Some(_)) => bail!("repository and organization are mutually exclusive"),
            (None, None) => bail!("one of repository or organization is required"),
        };

        let target = ScaleTarget {
            name: self.name.clone(),
            scope,
            labels: self.labels.clone().unwrap_or_default(),
            fixed: self.replicas,
        };

        let policy = match &self.autoscaling {
            Some(ac) => ac.to_policy()?,
            None => AutoscalingPolicy::default(),
        };

        Ok(Fleet { target, policy })
    }
}

impl AutoscalingConfig {
    pub fn to_policy(&self) -> anyhow::Result<AutoscalingPolicy> {
        let scale_down_delay_secs = self
            .scale_down_delay
            .as_deref()
            .map(parse_duration)
            .transpose()
            .context("autoscaling.scale_down_delay")?
            .map(|d| d.as_secs());

        Ok(AutoscalingPolicy {
            min_replicas: self.min_replicas,
            max_replicas: self.max_replicas,
            metrics: self.metrics.clone().unwrap_or_default(),
            scale_down_delay_secs,
            capacity_reservations: self.capacity_reservations.clone().unwrap_or_default(),
            scheduled_overrides: self.scheduled_overrides.clone().unwrap_or_default(),
        })
    }
}

/// Parse a duration string like "30s", "5m", "1h" or bare seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s, 's'),
    };
    let value: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid duration {s:?}"))?;
    let secs = match unit {
        's' => Some(value),
        'm' => value.checked_mul(60),
        'h' => value.checked_mul(60 * 60),
        _ => bail!("invalid duration unit in {s:?} (expected s, m or h)"),
    };
    let secs = secs.with_context(|| format!("duration {s:?} out of range"))?;
    Ok(Duration::from_secs(secs))
}
