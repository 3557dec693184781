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

//! [`BranchCommitEnricher`]: lazy, transaction-aware enrichment of
//! newly-appended local commits.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::collections::hash_map::Entry;

use crate::branch::SharedTreeBranchChange;
use crate::commit::GraphCommit;
use crate::revision::{RevisionTag, TaggedChange};

/// Wraps the local-branch append path so each newly appended commit can be
/// enriched with refreshed context (e.g. an embedded tree snapshot) lazily,
/// and only once it is certain the commit is not going to be discarded by
/// an aborted transaction.
pub struct BranchCommitEnricher<C, F> {
    enrich_fn: F,
    queue: RefCell<VecDeque<GraphCommit<C>>>,
    transactions: RefCell<Vec<Vec<GraphCommit<C>>>>,
    enriched: RefCell<HashMap<RevisionTag, TaggedChange<C>>>,
}

impl<C, F> BranchCommitEnricher<C, F>
where
    F: Fn(&GraphCommit<C>) -> C,
{
    pub fn new(enrich_fn: F) -> Self {
        BranchCommitEnricher {
            enrich_fn,
            queue: RefCell::new(VecDeque::new()),
            transactions: RefCell::new(Vec::new()),
            enriched: RefCell::new(HashMap::new()),
        }
    }

    /// Called on every local-branch `append`/`rebase`/`remove` event.
    pub fn process_change(&self, event: &SharedTreeBranchChange<C>) {
        match event {
            SharedTreeBranchChange::Append { new_commits, .. }
            | SharedTreeBranchChange::Rebase { new_commits, .. } => {
                self.add_transaction_commits(new_commits.clone());
            }
            SharedTreeBranchChange::Remove { removed_commits, .. } => {
                let discarded: HashSet<RevisionTag> =
                    removed_commits.iter().map(|c| c.revision()).collect();
                self.queue
                    .borrow_mut()
                    .retain(|c| !discarded.contains(&c.revision()));
                for scope in self.transactions.borrow_mut().iter_mut() {
                    scope.retain(|c| !discarded.contains(&c.revision()));
                }
                let mut enriched = self.enriched.borrow_mut();
                for revision in discarded {
                    enriched.remove(&revision);
                }
            }
        }
    }

    /// Incorporates commits into the current transaction scope (or
    /// directly into the externally-visible queue if no transaction is
    /// open).
    pub fn add_transaction_commits(&self, commits: Vec<GraphCommit<C>>) {
        let mut transactions = self.transactions.borrow_mut();
        match transactions.last_mut() {
            Some(scope) => scope.extend(commits),
            None => self.queue.borrow_mut().extend(commits),
        }
    }

    pub fn start_transaction(&self) {
        self.transactions.borrow_mut().push(Vec::new());
    }

    /// Commits the innermost transaction: its buffered commits become
    /// visible to the enclosing transaction, or, if this was the
    /// outermost one, to [`Self::enrich`] directly.
    pub fn commit_transaction(&self) {
        let Some(scope) = self.transactions.borrow_mut().pop() else {
            return;
        };
        self.add_transaction_commits(scope);
    }

    /// Discards the innermost transaction's buffered commits; they are
    /// never enriched.
    pub fn abort_transaction(&self) {
        self.transactions.borrow_mut().pop();
    }

    pub fn in_transaction(&self) -> bool {
        !self.transactions.borrow().is_empty()
    }

    /// Returns the enriched form of `commit`, computing and caching it on
    /// first call; subsequent calls for the same revision are free.
    pub fn enrich(&self, commit: &GraphCommit<C>) -> TaggedChange<C>
    where
        C: Clone,
    {
        let mut enriched = self.enriched.borrow_mut();
        match enriched.entry(commit.revision()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let change = (self.enrich_fn)(commit);
                let tagged = TaggedChange::new(commit.revision(), change);
                entry.insert(tagged.clone());
                tagged
            }
        }
    }
}
