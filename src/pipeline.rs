// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Operation pipeline.
//!
//! Every service operation runs through the same three stages, in order:
//!
//! 1. **validate** - turn raw input into typed arguments,
//! 2. **execute** - run the operation (skipped if validation failed),
//! 3. **record** - always, exactly once: update per-operation statistics,
//!    append an [`OperationRecord`] to the journal and emit a log event.
//!
//! The journal is bounded; once full, the oldest record is dropped.

use crate::ReservationError;
use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Validation failed; the operation never ran.
    Rejected(ReservationError),
    /// The operation ran and failed.
    Failed(ReservationError),
}

impl Outcome {
    pub fn error(&self) -> Option<&ReservationError> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Rejected(e) | Outcome::Failed(e) => Some(e),
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub operation: &'static str,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Aggregated statistics for one operation name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub requests: u64,
    pub errors: u64,
    /// Cumulative time spent in validate + execute, in microseconds.
    pub latency_us: u64,
}

/// Runs operations through validate → execute → record.
#[derive(Debug)]
pub struct Pipeline {
    stats: DashMap<&'static str, OperationStats>,
    journal: ArrayQueue<OperationRecord>,
}

impl Pipeline {
    pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_journal_capacity(Self::DEFAULT_JOURNAL_CAPACITY)
    }

    /// `capacity` is clamped to at least one record.
    pub fn with_journal_capacity(capacity: usize) -> Self {
        Self {
            stats: DashMap::new(),
            journal: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Runs `execute` on the output of `validate` and records the outcome.
    pub fn run<I, T>(
        &self,
        operation: &'static str,
        validate: impl FnOnce() -> Result<I, ReservationError>,
        execute: impl FnOnce(I) -> Result<T, ReservationError>,
    ) -> Result<T, ReservationError> {
        let begin = Instant::now();
        let (result, outcome) = match validate() {
            Err(e) => (Err(e.clone()), Outcome::Rejected(e)),
            Ok(input) => match execute(input) {
                Ok(value) => (Ok(value), Outcome::Succeeded),
                Err(e) => (Err(e.clone()), Outcome::Failed(e)),
            },
        };
        self.record(operation, outcome, begin.elapsed());
        result
    }

    /// Shorthand for operations that need no validation.
    pub fn execute<T>(
        &self,
        operation: &'static str,
        execute: impl FnOnce() -> Result<T, ReservationError>,
    ) -> Result<T, ReservationError> {
        self.run(operation, || Ok(()), |()| execute())
    }

    fn record(&self, operation: &'static str, outcome: Outcome, elapsed: Duration) {
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        {
            let mut stats = self.stats.entry(operation).or_default();
            stats.requests += 1;
            if outcome.error().is_some() {
                stats.errors += 1;
            }
            stats.latency_us = stats.latency_us.saturating_add(elapsed_us);
        }

        match &outcome {
            Outcome::Succeeded => tracing::info!(operation, elapsed_us, "operation succeeded"),
            Outcome::Rejected(e) => {
                tracing::warn!(operation, elapsed_us, error = %e, "operation rejected")
            }
            Outcome::Failed(e) => {
                tracing::warn!(operation, elapsed_us, error = %e, "operation failed")
            }
        }

        self.journal.force_push(OperationRecord {
            operation,
            outcome,
            elapsed,
        });
    }

    /// Statistics for one operation, if it has run at least once.
    pub fn stats(&self, operation: &str) -> Option<OperationStats> {
        self.stats.get(operation).map(|entry| *entry)
    }

    /// Statistics for every operation, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, OperationStats> {
        self.stats
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Removes and returns the journal, oldest record first.
    pub fn drain_journal(&self) -> Vec<OperationRecord> {
        std::iter::from_fn(|| self.journal.pop()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
