// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! [`ResubmitMachine`]: minimal re-enrichment of outstanding commits after
//! a reconnect.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::commit::GraphCommit;
use crate::enricher::BranchCommitEnricher;
use crate::error::ResubmitError;
use crate::revision::{RevisionTag, TaggedChange};

struct OutstandingCommit<C> {
    commit: GraphCommit<C>,
    original_enriched: TaggedChange<C>,
    sequenced: bool,
    rebased: bool,
}

/// Tracks submitted-but-not-yet-sequenced commits so that, after a
/// reconnect, exactly the commits that were actually rebased in the
/// meantime get re-enriched, and everything else is resubmitted as-is.
pub struct ResubmitMachine<C> {
    outstanding: RefCell<VecDeque<OutstandingCommit<C>>>,
    checkout: RefCell<Option<Vec<GraphCommit<C>>>>,
}

impl<C> Default for ResubmitMachine<C> {
    fn default() -> Self {
        ResubmitMachine {
            outstanding: RefCell::new(VecDeque::new()),
            checkout: RefCell::new(None),
        }
    }
}

impl<C> ResubmitMachine<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly submitted commit, along with the enriched form it
    /// was submitted with.
    pub fn on_commit_submitted(&self, commit: GraphCommit<C>, original_enriched: TaggedChange<C>) {
        self.outstanding.borrow_mut().push_back(OutstandingCommit {
            commit,
            original_enriched,
            sequenced: false,
            rebased: false,
        });
    }

    /// Marks the frontmost outstanding commit matching `revision` as
    /// sequenced, removing it from resubmit duty. If the sequenced commit
    /// did not originate locally, every other outstanding commit is marked
    /// as having been rebased (it must have been, to land after a foreign
    /// commit).
    pub fn on_sequenced_commit_applied(&self, revision: RevisionTag, is_local: bool) {
        let mut outstanding = self.outstanding.borrow_mut();
        if let Some(index) = outstanding.iter().position(|o| o.commit.revision() == revision) {
            outstanding.remove(index);
        }
        if !is_local {
            for entry in outstanding.iter_mut() {
                entry.rebased = true;
            }
        }
    }

    /// Starts a new resubmit phase: the next rebased commit requested via
    /// [`Self::get_enriched_commit`] will trigger exactly one `resupply`
    /// call, shared by every commit resolved within this phase.
    pub fn begin_resubmit_phase(&self) {
        *self.checkout.borrow_mut() = None;
    }

    /// Resolves the commit to resubmit for `revision`.
    ///
    /// `resupply` produces the current, post-rebase local-branch commit
    /// chain (oldest first) and is called at most once per resubmit phase,
    /// the first time a rebased commit is encountered. Errors if `revision`
    /// was never submitted, or has already been sequenced and dropped from
    /// `outstanding` (nothing left to resubmit for it).
    #[tracing::instrument(skip(self, enricher, resupply))]
    pub fn get_enriched_commit<F>(
        &self,
        revision: RevisionTag,
        enricher: &BranchCommitEnricher<C, F>,
        resupply: impl FnOnce() -> Vec<GraphCommit<C>>,
    ) -> Result<TaggedChange<C>, ResubmitError>
    where
        F: Fn(&GraphCommit<C>) -> C,
        C: Clone,
    {
        let (index, rebased, original) = {
            let outstanding = self.outstanding.borrow();
            let index = outstanding
                .iter()
                .position(|o| o.commit.revision() == revision)
                .ok_or(ResubmitError::UnknownCommit(revision))?;
            let entry = &outstanding[index];
            if entry.sequenced {
                return Err(ResubmitError::UnknownCommit(revision));
            }
            (index, entry.rebased, entry.original_enriched.clone())
        };

        if !rebased {
            tracing::trace!("resubmitting original enrichment, commit was not rebased");
            return Ok(original);
        }

        let mut checkout = self.checkout.borrow_mut();
        let is_first_in_phase = checkout.is_none();
        let chain = checkout.get_or_insert_with(resupply);
        if is_first_in_phase {
            tracing::debug!(len = chain.len(), "resupplied checkout for resubmit phase");
        }
        let fresh_commit = chain
            .get(index)
            .ok_or(ResubmitError::UnknownCommit(revision))?;
        tracing::trace!("re-enriching commit against resupplied checkout");
        Ok(enricher.enrich(fresh_commit))
    }

    pub fn outstanding_len(&self) -> usize {
        self.outstanding.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::RevisionTag;
    use std::cell::Cell;
    use std::rc::Rc;

    fn commit(revision: u128, parent: &GraphCommit<i64>) -> GraphCommit<i64> {
        GraphCommit::new(revision as i64, RevisionTag::from_raw(revision), parent.clone())
    }

    #[test]
    fn unrebased_commits_resubmit_without_touching_the_enricher() {
        let machine = ResubmitMachine::new();
        let root = GraphCommit::new_root(0i64);
        let c1 = commit(1, &root);
        machine.on_commit_submitted(c1.clone(), TaggedChange::new(c1.revision(), 1));

        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let enricher = BranchCommitEnricher::new(move |_: &GraphCommit<i64>| {
            calls_clone.set(calls_clone.get() + 1);
            0
        });

        machine.begin_resubmit_phase();
        let result = machine.get_enriched_commit(c1.revision(), &enricher, || panic!("resupply must not run"));
        assert_eq!(result.unwrap().change, 1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn sequenced_commits_are_skipped() {
        let machine = ResubmitMachine::new();
        let root = GraphCommit::new_root(0i64);
        let c1 = commit(1, &root);
        machine.on_commit_submitted(c1.clone(), TaggedChange::new(c1.revision(), 1));
        machine.on_sequenced_commit_applied(c1.revision(), true);

        let enricher = BranchCommitEnricher::new(|_: &GraphCommit<i64>| 0);
        machine.begin_resubmit_phase();
        let result = machine.get_enriched_commit(c1.revision(), &enricher, Vec::new);
        assert_eq!(result.unwrap_err(), crate::error::ResubmitError::UnknownCommit(c1.revision()));
        assert_eq!(machine.outstanding_len(), 0);
    }

    #[test]
    fn one_checkout_serves_every_rebased_commit_in_a_phase() {
        let machine = ResubmitMachine::new();
        let root = GraphCommit::new_root(0i64);
        let c1 = commit(1, &root);
        let c2 = commit(2, &c1);
        machine.on_commit_submitted(c1.clone(), TaggedChange::new(c1.revision(), 1));
        machine.on_commit_submitted(c2.clone(), TaggedChange::new(c2.revision(), 2));

        // A peer commit landed: both outstanding commits are now rebased.
        machine.on_sequenced_commit_applied(RevisionTag::from_raw(999), false);

        let resupply_calls = Rc::new(Cell::new(0));
        let fresh1 = commit(11, &root);
        let fresh2 = commit(12, &fresh1);
        let fresh = vec![fresh1, fresh2];

        let enrich_calls = Rc::new(Cell::new(0));
        let enrich_calls_clone = Rc::clone(&enrich_calls);
        let enricher = BranchCommitEnricher::new(move |c: &GraphCommit<i64>| {
            enrich_calls_clone.set(enrich_calls_clone.get() + 1);
            *c.change()
        });

        machine.begin_resubmit_phase();
        let resupply_calls_clone = Rc::clone(&resupply_calls);
        let fresh_clone = fresh.clone();
        let resupply = move || {
            resupply_calls_clone.set(resupply_calls_clone.get() + 1);
            fresh_clone.clone()
        };
        let _ = machine.get_enriched_commit(c1.revision(), &enricher, resupply.clone());
        let _ = machine.get_enriched_commit(c2.revision(), &enricher, resupply);

        assert_eq!(resupply_calls.get(), 1);
        assert_eq!(enrich_calls.get(), 2);

        // Re-entering the same phase for the same commits must not
        // re-enrich.
        let resupply_calls_clone2 = Rc::clone(&resupply_calls);
        let _ = machine.get_enriched_commit(c1.revision(), &enricher, move || {
            resupply_calls_clone2.set(resupply_calls_clone2.get() + 1);
            fresh.clone()
        });
        assert_eq!(resupply_calls.get(), 1);
        assert_eq!(enrich_calls.get(), 2);
    }
}
