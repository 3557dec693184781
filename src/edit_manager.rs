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

//! [`EditManager`]: trunk + per-session peer branches + local branch.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::branch::SharedTreeBranch;
use crate::commit::GraphCommit;
use crate::config::CoreConfig;
use crate::error::EditManagerError;
use crate::rebaser::ChangeRebaser;
use crate::revision::RevisionTag;

/// Opaque identifier for a collaborating session, assigned by the host's
/// sequencer (see `BranchCommitEnricher`/`ResubmitMachine` for the
/// originating-session concept this tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u64);

/// Trunk/local/peer branch state for one collaborating session.
///
/// `trunk` is the append-only sequenced prefix; `local_branch` always
/// forks off the current trunk tip and is kept rebased onto it as new
/// sequenced commits arrive; each entry in `peer_branches` tracks the most
/// recent commit seen from that peer and is rebased onto the current trunk
/// tip lazily, the next time a commit from that peer is processed.
pub struct EditManager<C, R> {
    rebaser: Rc<R>,
    local_session: PeerId,
    trunk_head: RefCell<GraphCommit<C>>,
    trunk_by_sequence: RefCell<BTreeMap<u64, GraphCommit<C>>>,
    local_branch: SharedTreeBranch<C, R>,
    peer_branches: RefCell<HashMap<PeerId, SharedTreeBranch<C, R>>>,
    minimum_sequence_number: Cell<u64>,
    config: CoreConfig,
}

impl<C, R: ChangeRebaser<C>> EditManager<C, R> {
    pub fn new(rebaser: Rc<R>, root: GraphCommit<C>, local_session: PeerId, config: CoreConfig) -> Self
    where
        C: Clone,
    {
        let local_branch = SharedTreeBranch::with_config(Rc::clone(&rebaser), root.clone(), config);
        EditManager {
            rebaser,
            local_session,
            trunk_head: RefCell::new(root),
            trunk_by_sequence: RefCell::new(BTreeMap::new()),
            local_branch,
            peer_branches: RefCell::new(HashMap::new()),
            minimum_sequence_number: Cell::new(0),
            config,
        }
    }

    pub fn trunk_head(&self) -> GraphCommit<C> {
        self.trunk_head.borrow().clone()
    }

    /// The sequenced trunk commits seen so far, in sequence-number order.
    pub fn get_trunk_changes(&self) -> Vec<GraphCommit<C>> {
        self.trunk_by_sequence.borrow().values().cloned().collect()
    }

    pub fn local_branch(&self) -> &SharedTreeBranch<C, R> {
        &self.local_branch
    }

    /// The number of peer branches currently tracked, i.e. peers whose most
    /// recent commit has not yet been pruned by
    /// [`Self::prune_peer_branches`].
    pub fn peer_branch_count(&self) -> usize {
        self.peer_branches.borrow().len()
    }

    /// Appends a local (not yet sequenced) change to `local_branch`.
    pub fn apply_local_change(
        &self,
        change: C,
        revision: RevisionTag,
    ) -> Result<GraphCommit<C>, EditManagerError>
    where
        C: Clone,
    {
        Ok(self.local_branch.apply(change, revision)?)
    }

    /// Processes one sequenced commit, per the sandwich-rebase protocol:
    /// an echo of our own commit advances the local branch past it; a
    /// peer's commit is rebased onto the current trunk tip, appended to
    /// trunk, and the local branch is then rebased over that new trunk
    /// commit in turn.
    #[tracing::instrument(skip(self, change, new_revision))]
    pub fn add_sequenced_change(
        &self,
        change: C,
        revision: RevisionTag,
        sequence_number: u64,
        reference_sequence_number: u64,
        originator: PeerId,
        new_revision: &mut impl FnMut() -> RevisionTag,
    ) -> Result<(), EditManagerError>
    where
        C: Clone,
    {
        tracing::debug!(?revision, sequence_number, originator = originator.0, "applying sequenced change");
        let new_trunk_tip = if originator == self.local_session {
            tracing::debug!("echoing local commit onto trunk");
            let parent = self.trunk_head();
            let commit = GraphCommit::new(change, revision, parent);
            // Our own commit is already the local branch's next commit by
            // revision tag; rebasing onto it elides that commit entirely
            // via commit reuse instead of re-applying it.
            self.local_branch.rebase_onto_commit(&commit, new_revision)?;
            commit
        } else {
            if !self.peer_branches.borrow().contains_key(&originator) {
                let anchor = self
                    .trunk_by_sequence
                    .borrow()
                    .get(&reference_sequence_number)
                    .cloned()
                    .unwrap_or_else(|| self.trunk_head());
                let branch = SharedTreeBranch::with_config(Rc::clone(&self.rebaser), anchor, self.config);
                self.peer_branches.borrow_mut().insert(originator, branch);
            }
            let peer_branches = self.peer_branches.borrow();
            let peer_branch = peer_branches.get(&originator).expect("just inserted");
            peer_branch.rebase_onto_commit(&self.trunk_head(), new_revision)?;
            let commit = peer_branch.apply(change, revision)?;
            self.local_branch.rebase_onto_commit(&commit, new_revision)?;
            commit
        };

        *self.trunk_head.borrow_mut() = new_trunk_tip.clone();
        self.trunk_by_sequence
            .borrow_mut()
            .insert(sequence_number, new_trunk_tip);

        self.minimum_sequence_number.set(reference_sequence_number.max(self.minimum_sequence_number.get()));
        self.prune_peer_branches();

        Ok(())
    }

    /// Drops peer branches whose head lies strictly before
    /// `minimum_sequence_number` (unconditional: the commits themselves are
    /// never freed here, each is still reachable through the parent chain of
    /// whatever still holds a handle into it — the trunk head, a surviving
    /// peer branch's head, the local branch). The `sequence_number ->
    /// commit` index used to anchor a not-yet-seen peer's first branch is
    /// additionally compacted below that point when
    /// [`CoreConfig::trunk_eviction`] says to.
    fn prune_peer_branches(&self) {
        let minimum = self.minimum_sequence_number.get();
        let trunk_by_sequence = self.trunk_by_sequence.borrow();
        self.peer_branches.borrow_mut().retain(|_, branch| {
            trunk_by_sequence
                .iter()
                .rev()
                .find(|(seq, commit)| **seq <= minimum && **commit == branch.get_head())
                .is_none()
        });
        drop(trunk_by_sequence);

        if self.config.trunk_eviction == crate::config::TrunkEvictionPolicy::Compact {
            self.trunk_by_sequence.borrow_mut().retain(|seq, _| *seq >= minimum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RebaseError;
    use crate::rebaser::RevisionMetadataProvider;

    struct CounterRebaser;

    impl ChangeRebaser<i64> for CounterRebaser {
        fn compose(
            &self,
            changes: &[crate::revision::TaggedChange<&i64>],
            _metadata: &dyn RevisionMetadataProvider,
        ) -> Result<i64, RebaseError> {
            Ok(changes.iter().map(|c| *c.change).sum())
        }

        fn invert(
            &self,
            change: crate::revision::TaggedChange<&i64>,
            _is_rollback: bool,
            _revision: RevisionTag,
            _metadata: &dyn RevisionMetadataProvider,
        ) -> Result<i64, RebaseError> {
            Ok(-*change.change)
        }

        fn rebase(
            &self,
            change: crate::revision::TaggedChange<&i64>,
            _over: crate::revision::TaggedChange<&i64>,
            _metadata: &dyn RevisionMetadataProvider,
        ) -> Result<i64, RebaseError> {
            Ok(*change.change)
        }

        fn change_revision(&self, change: i64, _new_revision: RevisionTag, _rollback_of: Option<RevisionTag>) -> i64 {
            change
        }

        fn is_empty(&self, change: &i64) -> bool {
            *change == 0
        }

        fn empty(&self) -> i64 {
            0
        }
    }

    fn revision_source(start: u128) -> impl FnMut() -> RevisionTag {
        let mut next = start;
        move || {
            let tag = RevisionTag::from_raw(next);
            next += 1;
            tag
        }
    }

    #[test]
    fn echo_advances_local_branch_without_duplicating_it() {
        let rebaser = Rc::new(CounterRebaser);
        let root = GraphCommit::new_root(0i64);
        let manager = EditManager::new(rebaser, root, PeerId(1), CoreConfig::default());

        let mut new_revision = revision_source(1000);
        let commit = manager.apply_local_change(5, RevisionTag::from_raw(1)).unwrap();

        manager
            .add_sequenced_change(5, commit.revision(), 0, 0, PeerId(1), &mut new_revision)
            .unwrap();

        assert_eq!(manager.trunk_head().revision(), commit.revision());
        assert_eq!(manager.local_branch().get_head(), manager.trunk_head());
    }

    #[test]
    fn peer_commit_is_integrated_onto_trunk_and_local_is_rebased() {
        let rebaser = Rc::new(CounterRebaser);
        let root = GraphCommit::new_root(0i64);
        let manager = EditManager::new(rebaser, root, PeerId(1), CoreConfig::default());

        manager.apply_local_change(10, RevisionTag::from_raw(100)).unwrap();

        let mut new_revision = revision_source(1000);
        manager
            .add_sequenced_change(7, RevisionTag::from_raw(7), 0, 0, PeerId(2), &mut new_revision)
            .unwrap();

        assert_eq!(manager.trunk_head().revision(), RevisionTag::from_raw(7));
        assert_ne!(manager.local_branch().get_head(), manager.trunk_head());
        assert_eq!(
            manager.local_branch().get_head().parent().unwrap().revision(),
            RevisionTag::from_raw(7)
        );
    }
}
