// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic background checks, driven by an injectable clock.
//!
//! The scheduler only decides what is due; something else (the ticker, or a
//! test) calls [`Scheduler::due`] and runs the returned tasks.

use chrono::{DateTime, TimeDelta, Utc};
use strum::Display;
use tabvault_config::TabVaultConfig;
use tabvault_core::secs;

/// A background check run on its own interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PeriodicTask {
    /// Rotate the session key when due and re-encrypt the live record.
    RotationCheck,
    /// Re-run inactivity and user-agent validation.
    SessionValidation,
    /// Poll window geometry for docked developer tools.
    DevtoolsProbe,
}

#[derive(Debug, Clone)]
struct Entry {
    task: PeriodicTask,
    every: TimeDelta,
    next_due: DateTime<Utc>,
}

/// Tracks when each [`PeriodicTask`] is next due.
#[derive(Debug, Clone)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    /// Schedule every task with a non-zero interval, first due one interval
    /// after `now`.
    pub fn new(now: DateTime<Utc>, config: &TabVaultConfig) -> Self {
        let entries = [
            (
                PeriodicTask::RotationCheck,
                config.vault.rotation_check_interval_secs,
            ),
            (
                PeriodicTask::SessionValidation,
                config.session.validation_interval_secs,
            ),
            (PeriodicTask::DevtoolsProbe, config.session.devtools_poll_secs),
        ]
        .into_iter()
        .filter(|(_, every)| *every > 0)
        .map(|(task, every)| Entry {
            task,
            every: secs(every),
            next_due: after(now, secs(every)),
        })
        .collect();
        Self { entries }
    }

    /// Tasks due at `now`, in declaration order. Each returned task is
    /// rescheduled one interval after `now`; missed runs are not replayed.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<PeriodicTask> {
        self.entries
            .iter_mut()
            .filter(|entry| now >= entry.next_due)
            .map(|entry| {
                entry.next_due = after(now, entry.every);
                entry.task
            })
            .collect()
    }

    /// Earliest upcoming due time.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|e| e.next_due).min()
    }

    pub fn tasks(&self) -> impl Iterator<Item = PeriodicTask> + '_ {
        self.entries.iter().map(|e| e.task)
    }
}

fn after(now: DateTime<Utc>, every: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(every).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TabVaultConfig {
        let mut config = TabVaultConfig::default();
        config.vault.rotation_check_interval_secs = 60;
        config.session.validation_interval_secs = 30;
        config.session.devtools_poll_secs = 5;
        config
    }

    #[test]
    fn nothing_due_before_first_interval() {
        let now = Utc::now();
        let mut scheduler = Scheduler::new(now, &config());
        assert!(scheduler.due(now).is_empty());
        assert!(scheduler.due(now + TimeDelta::seconds(4)).is_empty());
        assert_eq!(scheduler.next_due(), Some(now + TimeDelta::seconds(5)));
    }

    #[test]
    fn tasks_fire_on_their_own_intervals() {
        let start = Utc::now();
        let mut scheduler = Scheduler::new(start, &config());

        assert_eq!(
            scheduler.due(start + TimeDelta::seconds(5)),
            vec![PeriodicTask::DevtoolsProbe]
        );
        assert_eq!(
            scheduler.due(start + TimeDelta::seconds(30)),
            vec![PeriodicTask::SessionValidation, PeriodicTask::DevtoolsProbe]
        );
        assert_eq!(
            scheduler.due(start + TimeDelta::seconds(60)),
            vec![
                PeriodicTask::RotationCheck,
                PeriodicTask::SessionValidation,
                PeriodicTask::DevtoolsProbe
            ]
        );
    }

    #[test]
    fn missed_runs_are_not_replayed() {
        let start = Utc::now();
        let mut scheduler = Scheduler::new(start, &config());
        let late = start + TimeDelta::hours(3);
        assert_eq!(scheduler.due(late).len(), 3);
        assert!(scheduler.due(late).is_empty());
        assert_eq!(scheduler.next_due(), Some(late + TimeDelta::seconds(5)));
    }

    #[test]
    fn zero_interval_disables_task() {
        let mut config = config();
        config.session.devtools_poll_secs = 0;
        let scheduler = Scheduler::new(Utc::now(), &config);
        assert!(!scheduler.tasks().any(|t| t == PeriodicTask::DevtoolsProbe));
    }

    #[test]
    fn huge_interval_never_comes_due() {
        let mut config = config();
        config.session.devtools_poll_secs = u64::MAX;
        let start = Utc::now();
        let mut scheduler = Scheduler::new(start, &config);
        let due = scheduler.due(start + TimeDelta::days(365));
        assert!(!due.contains(&PeriodicTask::DevtoolsProbe));
    }

    #[test]
    fn task_names_are_snake_case() {
        assert_eq!(PeriodicTask::RotationCheck.to_string(), "rotation_check");
    }
}
