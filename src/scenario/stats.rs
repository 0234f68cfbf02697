use dashmap::DashMap;

use crate::scenario::ScenarioResult;

/// Per-kind verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub success: u64,
    pub fail: u64,
    pub skipped: u64,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.success + self.fail + self.skipped
    }
}

/// Concurrent verdict ledger keyed by scenario kind.
#[derive(Debug, Default)]
pub struct ScenarioStats {
    tallies: DashMap<&'static str, Tally>,
}

impl ScenarioStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one verdict to `kind`'s tally and hands the verdict back, so a
    /// scenario can record and return in one expression.
    pub fn record(
        &self,
        kind: &'static str,
        result: ScenarioResult,
    ) -> ScenarioResult {
        let mut entry = self.tallies.entry(kind).or_default();
        *bucket(entry.value_mut(), result) += 1;
        result
    }

    /// Revises an already-recorded verdict: `old`'s bucket goes down one,
    /// `new`'s goes up one, leaving the kind's total unchanged.
    pub fn replace_result(
        &self,
        kind: &'static str,
        old: ScenarioResult,
        new: ScenarioResult,
    ) -> ScenarioResult {
        let mut entry = self.tallies.entry(kind).or_default();
        let slot = bucket(entry.value_mut(), old);
        *slot = slot.saturating_sub(1);
        *bucket(entry.value_mut(), new) += 1;
        new
    }

    /// Tally for one kind; zeroes when the kind never ran.
    pub fn tally(
        &self,
        kind: &str,
    ) -> Tally {
        self.tallies.get(kind).map(|entry| *entry.value()).unwrap_or_default()
    }

    /// Failures across every kind.
    pub fn total_failures(&self) -> u64 {
        self.tallies.iter().map(|entry| entry.value().fail).sum()
    }

    /// One line per kind, sorted by kind name.
    pub fn summary(&self) -> String {
        let mut entries: Vec<(&'static str, Tally)> = self
            .tallies
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(kind, _)| *kind);
        entries
            .iter()
            .map(|(kind, tally)| {
                format!(
                    "{kind}: {} succeeded, {} failed, {} skipped",
                    tally.success, tally.fail, tally.skipped
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn bucket<'a>(
    tally: &'a mut Tally,
    result: ScenarioResult,
) -> &'a mut u64 {
    match result {
        ScenarioResult::Success => &mut tally.success,
        ScenarioResult::Fail => &mut tally.fail,
        ScenarioResult::Skipped => &mut tally.skipped,
    }
}
