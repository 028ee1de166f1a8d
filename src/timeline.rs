//! Per-test execution intervals folded from the event stream.
//!
//! [`TimelineBuilder`] applies events in wire order to two maps, `runs` and
//! `pauses`, and tracks the observed time bounds. [`TimelineBuilder::finish`]
//! prunes intervals that can't be drawn and produces an immutable
//! [`Timeline`].
//!
//! A test keeps at most one pause interval: a later `pause` overwrites the
//! start and a later `cont` overwrites the end.

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::event::{Action, TestEvent, TestName};

/// A `(start, end, passed)` interval for one test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub test: TestName,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Only meaningful once a terminal action was seen.
    pub passed: bool,
}

impl Execution {
    pub fn new(test: TestName) -> Self {
        Self {
            test,
            ..Self::default()
        }
    }

    /// `end - start`, or zero while either bound is unset.
    pub fn duration(&self) -> TimeDelta {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end - start,
            _ => TimeDelta::zero(),
        }
    }
}

/// Executions keyed by test identity, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Executions(IndexMap<TestName, Execution>);

impl Executions {
    /// Apply `update` to the execution of `name`, creating it on first use.
    pub fn update(&mut self, name: &TestName, update: impl FnOnce(&mut Execution)) {
        if let Some(execution) = self.0.get_mut(name) {
            update(execution);
            return;
        }
        let mut execution = Execution::new(name.clone());
        update(&mut execution);
        self.0.insert(name.clone(), execution);
    }

    pub fn get(&self, name: &TestName) -> Option<&Execution> {
        self.0.get(name)
    }

    #[cfg(test)]
    pub fn contains(&self, name: &TestName) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Execution> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn retain_drawable(&mut self, kind: &'static str, cutoff: TimeDelta) {
        self.0.retain(|name, execution| {
            let duration = execution.duration();
            if duration.is_zero() {
                debug!(kind, test = %name, "removed incomplete execution");
                return false;
            }
            if duration <= cutoff {
                debug!(kind, test = %name, ?duration, "removed execution below threshold");
                return false;
            }
            if execution.test.test.is_empty() {
                debug!(kind, test = %name, "removed execution with empty test name");
                return false;
            }
            true
        });
    }
}

/// Mutable fold state. Feed events with [`apply`](Self::apply), then call
/// [`finish`](Self::finish) once the stream has ended.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    runs: Executions,
    pauses: Executions,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    failed: bool,
    appearance: IndexSet<TestName>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &TestEvent) {
        if let Some(at) = event.time {
            self.start = Some(self.start.map_or(at, |start| start.min(at)));
            self.end = Some(self.end.map_or(at, |end| end.max(at)));
        }

        let Some(action) = event.action else {
            return;
        };
        if action == Action::Fail {
            self.failed = true;
        }

        let name = event.name();
        let at = event.time;

        match action {
            Action::Run => self.runs.update(&name, |run| run.start = at),
            Action::Pause => self.pauses.update(&name, |pause| pause.start = at),
            Action::Cont => {
                self.pauses.update(&name, |pause| pause.end = at);
                // Also the recovery path when the `run` event was missed.
                self.runs.update(&name, |run| run.start = at);
            }
            Action::Pass | Action::Fail | Action::Skip => self.runs.update(&name, |run| {
                run.end = at;
                run.passed = action == Action::Pass;
            }),
            _ => return,
        }

        self.appearance.insert(name);
    }

    /// Drop executions that are incomplete, at or below `cutoff`, or unnamed,
    /// then compute the longest run.
    pub fn finish(mut self, cutoff: TimeDelta) -> Timeline {
        self.pauses.retain_drawable("pause", cutoff);
        self.runs.retain_drawable("run", cutoff);

        for run in self.runs.iter() {
            debug!(
                test = %run.test,
                duration = ?run.duration(),
                passed = run.passed,
                "parsed test run"
            );
        }

        let max_duration = self
            .runs
            .iter()
            .map(Execution::duration)
            .max()
            .unwrap_or_else(TimeDelta::zero);

        debug!(start = ?self.start, end = ?self.end, ?max_duration, "timeline finalized");

        Timeline {
            runs: self.runs,
            pauses: self.pauses,
            start: self.start,
            end: self.end,
            max_duration,
            failed: self.failed,
            appearance: self.appearance,
        }
    }
}

/// Finalized, read-only timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    runs: Executions,
    pauses: Executions,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    max_duration: TimeDelta,
    failed: bool,
    appearance: IndexSet<TestName>,
}

impl Timeline {
    /// Fold a sequence of events and finalize in one go.
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a TestEvent>,
        cutoff: TimeDelta,
    ) -> Self {
        let mut builder = TimelineBuilder::new();
        for event in events {
            builder.apply(event);
        }
        builder.finish(cutoff)
    }

    pub fn runs(&self) -> &Executions {
        &self.runs
    }

    pub fn pauses(&self) -> &Executions {
        &self.pauses
    }

    /// Earliest timestamp observed on any event.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Latest timestamp observed on any event.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn max_duration(&self) -> TimeDelta {
        self.max_duration
    }

    /// Whether any `fail` action was seen, including package-level failures
    /// and runs later filtered out.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Wall-clock span of the whole stream.
    pub fn wall_clock(&self) -> TimeDelta {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end - start,
            _ => TimeDelta::zero(),
        }
    }

    /// Offset of `at` from the start of the timeline.
    pub fn offset(&self, at: Option<DateTime<Utc>>) -> TimeDelta {
        match (self.start, at) {
            (Some(start), Some(at)) => at - start,
            _ => TimeDelta::zero(),
        }
    }

    /// (passed, failed) counts over retained runs. Skipped tests count as failed.
    pub fn counts(&self) -> (usize, usize) {
        let passed = self.runs.iter().filter(|run| run.passed).count();
        (passed, self.runs.len() - passed)
    }

    /// Test names by earliest start across runs and pauses. Ties keep the
    /// order in which tests first appeared on the stream.
    pub fn names_by_start(&self) -> Vec<TestName> {
        let mut executions: Vec<&Execution> =
            self.pauses.iter().chain(self.runs.iter()).collect();
        executions.sort_by_key(|execution| {
            let appeared = self
                .appearance
                .get_index_of(&execution.test)
                .unwrap_or(usize::MAX);
            (execution.start, appeared)
        });

        let names: IndexSet<&TestName> = executions.into_iter().map(|e| &e.test).collect();
        names.into_iter().cloned().collect()
    }
}
