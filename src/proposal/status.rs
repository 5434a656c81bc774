/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Proposal lifecycle status and its indexer-side filter.
//!
//! The filter is built out of the same comparisons the resolver makes,
//! so for any record and instant `StatusFilter::new(s, now).matches(r)`
//! holds exactly when `compute_status(r, now) == s`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::util::time::Timestamp;

/// Lifecycle status of a proposal. Always derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Active,
    Succeeded,
    Executed,
    Defeated,
}

impl ProposalStatus {
    pub const ALL: [Self; 5] =
        [Self::Pending, Self::Active, Self::Succeeded, Self::Executed, Self::Defeated];
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Succeeded => "Succeeded",
            Self::Executed => "Executed",
            Self::Defeated => "Defeated",
        };
        write!(f, "{}", s)
    }
}

/// The inputs status resolution depends on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusInput {
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub executed: bool,
    /// Only reported by plugins supporting early execution
    pub early_executable: Option<bool>,
    /// Indexer hint that the passing conditions are currently met
    pub potentially_executable: bool,
}

/// Compute the status of a proposal at instant `now`.
pub fn compute_status(input: &StatusInput, now: Timestamp) -> ProposalStatus {
    if input.executed {
        return ProposalStatus::Executed
    }

    if now < input.start_date {
        return ProposalStatus::Pending
    }

    if input.potentially_executable || input.early_executable.unwrap_or(false) {
        return ProposalStatus::Succeeded
    }

    if now < input.end_date {
        return ProposalStatus::Active
    }

    ProposalStatus::Defeated
}

/// Single indexer comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Predicate {
    Executed(bool),
    StartDateGt(Timestamp),
    StartDateLte(Timestamp),
    EndDateGt(Timestamp),
    EndDateLte(Timestamp),
    PotentiallyExecutable(bool),
    EarlyExecutable(bool),
}

impl Predicate {
    fn key(&self) -> &'static str {
        match self {
            Self::Executed(_) => "executed",
            Self::StartDateGt(_) => "startDate_gt",
            Self::StartDateLte(_) => "startDate_lte",
            Self::EndDateGt(_) => "endDate_gt",
            Self::EndDateLte(_) => "endDate_lte",
            Self::PotentiallyExecutable(_) => "potentiallyExecutable",
            Self::EarlyExecutable(_) => "earlyExecutable",
        }
    }

    fn value(&self) -> Value {
        match self {
            // Indexer BigInt fields compare against strings
            Self::StartDateGt(t) | Self::StartDateLte(t) | Self::EndDateGt(t) | Self::EndDateLte(t) => {
                json!(t.0.to_string())
            }
            Self::Executed(b) | Self::PotentiallyExecutable(b) | Self::EarlyExecutable(b) => json!(b),
        }
    }

    fn holds(&self, input: &StatusInput) -> bool {
        match *self {
            Self::Executed(b) => input.executed == b,
            Self::StartDateGt(t) => input.start_date > t,
            Self::StartDateLte(t) => input.start_date <= t,
            Self::EndDateGt(t) => input.end_date > t,
            Self::EndDateLte(t) => input.end_date <= t,
            Self::PotentiallyExecutable(b) => input.potentially_executable == b,
            // A null field matches neither value on the indexer either
            Self::EarlyExecutable(b) => input.early_executable == Some(b),
        }
    }
}

/// Indexer `where` clause selecting proposals of a given status at a
/// given instant. Internally a disjunction of conjunctions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusFilter {
    status: ProposalStatus,
    branches: Vec<Vec<Predicate>>,
}

impl StatusFilter {
    /// Filter for plugins whose indexer entities have no
    /// `earlyExecutable` field.
    pub fn new(status: ProposalStatus, now: Timestamp) -> Self {
        Self::build(status, now, false)
    }

    /// Filter for plugins whose indexer entities report `earlyExecutable`.
    pub fn with_early_execution(status: ProposalStatus, now: Timestamp) -> Self {
        Self::build(status, now, true)
    }

    fn build(status: ProposalStatus, now: Timestamp, early: bool) -> Self {
        use Predicate::*;

        let started = [Executed(false), StartDateLte(now)];
        let not_passing = |mut preds: Vec<Predicate>| {
            preds.push(PotentiallyExecutable(false));
            if early {
                preds.push(EarlyExecutable(false));
            }
            preds
        };

        let branches = match status {
            ProposalStatus::Executed => vec![vec![Executed(true)]],
            ProposalStatus::Pending => vec![vec![Executed(false), StartDateGt(now)]],
            ProposalStatus::Succeeded => {
                let mut branches = vec![[&started[..], &[PotentiallyExecutable(true)][..]].concat()];
                if early {
                    branches.push([&started[..], &[EarlyExecutable(true)][..]].concat());
                }
                branches
            }
            ProposalStatus::Active => {
                vec![not_passing([&started[..], &[EndDateGt(now)][..]].concat())]
            }
            ProposalStatus::Defeated => {
                vec![not_passing([&started[..], &[EndDateLte(now)][..]].concat())]
            }
        };

        Self { status, branches }
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    /// Evaluate the filter locally against a record.
    pub fn matches(&self, input: &StatusInput) -> bool {
        self.branches.iter().any(|branch| branch.iter().all(|p| p.holds(input)))
    }

    /// Indexer `where` object. `base` holds the extra conditions of the
    /// query and is merged into every branch.
    pub fn to_where(&self, base: &Map<String, Value>) -> Value {
        let mut clauses: Vec<Value> = self
            .branches
            .iter()
            .map(|branch| {
                let mut clause = base.clone();
                for pred in branch {
                    clause.insert(pred.key().to_string(), pred.value());
                }
                Value::Object(clause)
            })
            .collect();

        if clauses.len() == 1 {
            return clauses.remove(0)
        }

        json!({ "or": clauses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(start: u64, end: u64, executed: bool, pot: bool, early: Option<bool>) -> StatusInput {
        StatusInput {
            start_date: Timestamp(start),
            end_date: Timestamp(end),
            executed,
            early_executable: early,
            potentially_executable: pot,
        }
    }

    #[test]
    fn resolution_order() {
        let now = Timestamp(1000);
        assert_eq!(compute_status(&input(2000, 3000, false, false, None), now), ProposalStatus::Pending);
        assert_eq!(compute_status(&input(500, 3000, false, false, None), now), ProposalStatus::Active);
        assert_eq!(compute_status(&input(500, 3000, false, true, None), now), ProposalStatus::Succeeded);
        assert_eq!(
            compute_status(&input(500, 3000, false, false, Some(true)), now),
            ProposalStatus::Succeeded
        );
        assert_eq!(compute_status(&input(100, 500, false, false, None), now), ProposalStatus::Defeated);
        assert_eq!(compute_status(&input(100, 500, false, true, None), now), ProposalStatus::Succeeded);
        // Executed after its window still reports executed
        assert_eq!(compute_status(&input(100, 500, true, false, None), now), ProposalStatus::Executed);
        // A pending proposal is not succeeded, even with the hint set
        assert_eq!(compute_status(&input(2000, 3000, false, true, None), now), ProposalStatus::Pending);
    }

    #[test]
    fn boundaries() {
        // now == start_date is no longer pending
        let now = Timestamp(1000);
        assert_eq!(compute_status(&input(1000, 2000, false, false, None), now), ProposalStatus::Active);
        // now == end_date is over
        assert_eq!(compute_status(&input(500, 1000, false, false, None), now), ProposalStatus::Defeated);
        // Degenerate window
        assert_eq!(compute_status(&input(1000, 1000, false, false, None), now), ProposalStatus::Defeated);
        assert_eq!(compute_status(&input(1000, 1000, false, true, None), now), ProposalStatus::Succeeded);
        assert_eq!(compute_status(&input(1001, 1001, false, false, None), now), ProposalStatus::Pending);

        for status in ProposalStatus::ALL {
            let filter = StatusFilter::new(status, now);
            let record = input(1000, 2000, false, false, None);
            assert_eq!(filter.matches(&record), status == ProposalStatus::Active);
        }
    }

    #[test]
    fn executed_is_terminal() {
        for now in [0, 999, 1000, 1001, 5000, u64::MAX] {
            for (start, end) in [(0, 0), (1000, 2000), (2000, 1000), (u64::MAX, u64::MAX)] {
                for pot in [false, true] {
                    for early in [None, Some(false), Some(true)] {
                        let record = input(start, end, true, pot, early);
                        assert_eq!(compute_status(&record, Timestamp(now)), ProposalStatus::Executed);
                    }
                }
            }
        }
    }

    #[test]
    fn filter_matches_resolver() {
        let instants = [0, 1, 99, 100, 101, 150, 199, 200, 201, 1000];
        let windows = [(100, 200), (100, 100), (200, 100), (0, 0), (0, 1000), (150, 151)];
        let earlies = [None, Some(false), Some(true)];

        for now in instants {
            let now = Timestamp(now);
            for (start, end) in windows {
                for executed in [false, true] {
                    for pot in [false, true] {
                        for early in earlies {
                            let record = input(start, end, executed, pot, early);
                            let status = compute_status(&record, now);

                            for s in ProposalStatus::ALL {
                                // Plugins with early execution always report
                                // the flag, the others never do
                                let filter = match early {
                                    Some(_) => StatusFilter::with_early_execution(s, now),
                                    None => StatusFilter::new(s, now),
                                };
                                assert_eq!(
                                    filter.matches(&record),
                                    s == status,
                                    "status={} filter={} record={:?} now={}",
                                    status,
                                    s,
                                    record,
                                    now
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn null_early_executable() {
        let now = Timestamp(150);
        let record = input(100, 200, false, false, None);
        for status in [ProposalStatus::Active, ProposalStatus::Defeated, ProposalStatus::Succeeded] {
            assert!(!StatusFilter::with_early_execution(status, now).matches(&record));
        }

        let record = input(100, 200, false, true, None);
        assert!(StatusFilter::with_early_execution(ProposalStatus::Succeeded, now).matches(&record));

        let record = input(100, 200, false, false, Some(false));
        assert!(StatusFilter::with_early_execution(ProposalStatus::Active, now).matches(&record));
    }

    #[test]
    fn where_clauses() {
        let now = Timestamp(1700000000);
        let mut base = Map::new();
        base.insert("dao".to_string(), json!("0xdao"));

        let active = StatusFilter::new(ProposalStatus::Active, now).to_where(&base);
        assert_eq!(
            active,
            json!({
                "dao": "0xdao",
                "executed": false,
                "startDate_lte": "1700000000",
                "endDate_gt": "1700000000",
                "potentiallyExecutable": false,
            })
        );

        let executed = StatusFilter::new(ProposalStatus::Executed, now).to_where(&Map::new());
        assert_eq!(executed, json!({ "executed": true }));

        let succeeded =
            StatusFilter::with_early_execution(ProposalStatus::Succeeded, now).to_where(&base);
        assert_eq!(
            succeeded,
            json!({ "or": [
                {
                    "dao": "0xdao",
                    "executed": false,
                    "startDate_lte": "1700000000",
                    "potentiallyExecutable": true,
                },
                {
                    "dao": "0xdao",
                    "executed": false,
                    "startDate_lte": "1700000000",
                    "earlyExecutable": true,
                },
            ]})
        );
    }
}
