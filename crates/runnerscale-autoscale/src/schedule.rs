//! Scheduled min-replica overrides.
//!
//! An override replaces the policy floor while `now` falls in its window.
//! Recurring overrides repeat the window every day, week, month, or year
//! from `start_time` until `until_time`. The first active override in
//! declaration order wins.

use chrono::{DateTime, Days, Months, TimeDelta, Utc};

use runnerscale_core::{Frequency, ScheduledOverride};

use crate::error::{AutoscaleError, AutoscaleResult};

/// One concrete occurrence of an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub min_replicas: u32,
}

impl OverrideWindow {
    fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }
}

/// Result of matching overrides against `now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideMatch {
    /// First override whose window contains `now`.
    pub active: Option<OverrideWindow>,
    /// Earliest occurrence starting after `now`.
    pub upcoming: Option<OverrideWindow>,
}

impl OverrideMatch {
    /// Floor imposed by the active override, if one is active.
    pub fn min_replicas(&self) -> Option<u32> {
        self.active.map(|w| w.min_replicas)
    }
}

/// Match `overrides` against `now`.
pub fn match_overrides(
    now: DateTime<Utc>,
    overrides: &[ScheduledOverride],
) -> AutoscaleResult<OverrideMatch> {
    let mut result = OverrideMatch::default();

    for (i, o) in overrides.iter().enumerate() {
        if o.end_time <= o.start_time {
            return Err(AutoscaleError::Validation(format!(
                "validating scheduled overrides: scheduled_overrides[{i}].end_time must be after start_time"
            )));
        }

        let (current, next) = occurrences_around(now, o);

        if result.active.is_none()
            && let Some(window) = current.filter(|w| w.contains(now))
        {
            result.active = Some(window);
        }

        if let Some(window) = next
            && result.upcoming.is_none_or(|u| window.start < u.start)
        {
            result.upcoming = Some(window);
        }
    }

    Ok(result)
}

/// The latest occurrence starting at or before `now`, and the first one
/// starting after it.
fn occurrences_around(
    now: DateTime<Utc>,
    o: &ScheduledOverride,
) -> (Option<OverrideWindow>, Option<OverrideWindow>) {
    let length = o.end_time - o.start_time;
    let window = |start: DateTime<Utc>| OverrideWindow {
        start,
        end: start + length,
        min_replicas: o.min_replicas,
    };

    let Some(rule) = &o.recurrence else {
        return if o.start_time <= now {
            (Some(window(o.start_time)), None)
        } else {
            (None, Some(window(o.start_time)))
        };
    };

    if o.start_time > now {
        return (None, Some(window(o.start_time)));
    }

    let allowed = |start: &DateTime<Utc>| rule.until_time.is_none_or(|until| *start <= until);

    // Lower-bound estimate, then step forward to the last start <= now.
    let elapsed_days = (now - o.start_time).num_days().max(0) as u32;
    let mut n = elapsed_days / max_period_days(rule.frequency);
    while let Some(start) = nth_start(o.start_time, rule.frequency, n + 1) {
        if start > now {
            break;
        }
        n += 1;
    }

    let current = nth_start(o.start_time, rule.frequency, n)
        .filter(allowed)
        .map(window);
    let next = nth_start(o.start_time, rule.frequency, n + 1)
        .filter(allowed)
        .map(window);
    (current, next)
}

fn nth_start(start: DateTime<Utc>, frequency: Frequency, n: u32) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Daily => start.checked_add_days(Days::new(u64::from(n))),
        Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(n))),
        Frequency::Monthly => start.checked_add_months(Months::new(n)),
        Frequency::Yearly => start.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Longest possible period length in days.
fn max_period_days(frequency: Frequency) -> u32 {
    match frequency {
        Frequency::Daily => 1,
        Frequency::Weekly => 7,
        Frequency::Monthly => 31,
        Frequency::Yearly => 366,
    }
}

/// How long until the active override ends, for logging.
pub fn remaining(now: DateTime<Utc>, window: &OverrideWindow) -> TimeDelta {
    window.end - now
}
