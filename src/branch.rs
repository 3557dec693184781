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

//! [`SharedTreeBranch`]: a mutable head over the commit DAG, with fork,
//! rebase and a change-event surface.

use std::cell::RefCell;
use std::rc::Rc;

use crate::commit::GraphCommit;
use crate::config::CoreConfig;
use crate::dag_walk::find_ancestor;
use crate::error::BranchError;
use crate::rebase_branch::rebase_branch;
use crate::rebaser::{ChangeRebaser, NoRevisionMetadata};
use crate::revision::RevisionTag;

/// The payload of `beforeChange`/`afterChange`, distinguishing why the head
/// moved.
#[derive(Debug, Clone)]
pub enum SharedTreeBranchChange<C> {
    Append {
        change: C,
        new_commits: Vec<GraphCommit<C>>,
    },
    Remove {
        change: C,
        removed_commits: Vec<GraphCommit<C>>,
    },
    Rebase {
        change: C,
        new_commits: Vec<GraphCommit<C>>,
    },
}

type ChangeListener<C> = Rc<dyn Fn(&SharedTreeBranchChange<C>)>;
type ForkListener<C, R> = Rc<dyn Fn(&SharedTreeBranch<C, R>)>;
type DisposeListener = Rc<dyn Fn()>;

/// The part of a branch's bookkeeping shared by every branch forked from a
/// common ancestor, so that a fork listener registered anywhere in the
/// family observes every descendant fork, including ones created from
/// inside the listener itself.
struct Family<C, R> {
    fork_listeners: RefCell<Vec<ForkListener<C, R>>>,
}

impl<C, R> Family<C, R> {
    fn new() -> Rc<Self> {
        Rc::new(Family {
            fork_listeners: RefCell::new(Vec::new()),
        })
    }

    fn notify_fork(&self, child: &SharedTreeBranch<C, R>) {
        // Snapshot the listener list before invoking anything: a listener
        // may itself fork the new child, which re-enters this method and
        // must not observe a borrowed `RefCell`.
        let listeners = self.fork_listeners.borrow().clone();
        for listener in &listeners {
            listener(child);
        }
    }
}

/// A mutable head over an immutable commit DAG.
///
/// Mutation is cooperative single-threaded (there is no internal
/// parallelism to guard against); `Rc`/`RefCell` are used throughout rather
/// than `Arc`/`Mutex` for that reason.
pub struct SharedTreeBranch<C, R> {
    rebaser: Rc<R>,
    head: RefCell<GraphCommit<C>>,
    disposed: RefCell<bool>,
    family: Rc<Family<C, R>>,
    before_change: RefCell<Vec<ChangeListener<C>>>,
    after_change: RefCell<Vec<ChangeListener<C>>>,
    on_dispose: RefCell<Vec<DisposeListener>>,
    enforce_unrelated_branches_check: bool,
}

impl<C, R: ChangeRebaser<C>> SharedTreeBranch<C, R> {
    pub fn new(rebaser: Rc<R>, head: GraphCommit<C>) -> Self {
        SharedTreeBranch {
            rebaser,
            head: RefCell::new(head),
            disposed: RefCell::new(false),
            family: Family::new(),
            before_change: RefCell::new(Vec::new()),
            after_change: RefCell::new(Vec::new()),
            on_dispose: RefCell::new(Vec::new()),
            enforce_unrelated_branches_check: true,
        }
    }

    /// As [`Self::new`], but takes the [`CoreConfig::enforce_unrelated_branches_check`]
    /// setting from `config` instead of defaulting it to `true`.
    pub fn with_config(rebaser: Rc<R>, head: GraphCommit<C>, config: CoreConfig) -> Self {
        SharedTreeBranch {
            enforce_unrelated_branches_check: config.enforce_unrelated_branches_check,
            ..Self::new(rebaser, head)
        }
    }

    pub fn get_head(&self) -> GraphCommit<C> {
        self.head.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    pub fn on_before_change(&self, listener: impl Fn(&SharedTreeBranchChange<C>) + 'static) {
        self.before_change.borrow_mut().push(Rc::new(listener));
    }

    pub fn on_after_change(&self, listener: impl Fn(&SharedTreeBranchChange<C>) + 'static) {
        self.after_change.borrow_mut().push(Rc::new(listener));
    }

    /// Registers `listener` for forks of this branch and, transitively, of
    /// every branch forked from it (past and future).
    pub fn on_fork(&self, listener: impl Fn(&SharedTreeBranch<C, R>) + 'static) {
        self.family.fork_listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn on_dispose(&self, listener: impl Fn() + 'static) {
        self.on_dispose.borrow_mut().push(Rc::new(listener));
    }

    fn emit_change(&self, change: SharedTreeBranchChange<C>, new_head: GraphCommit<C>) {
        let before = self.before_change.borrow().clone();
        for listener in &before {
            listener(&change);
        }
        *self.head.borrow_mut() = new_head;
        let after = self.after_change.borrow().clone();
        for listener in &after {
            listener(&change);
        }
    }

    fn check_mutable(&self) -> Result<(), BranchError> {
        if *self.disposed.borrow() {
            Err(BranchError::BranchDisposed)
        } else {
            Ok(())
        }
    }

    /// Appends a single commit with the given `change`/`revision`.
    pub fn apply(&self, change: C, revision: RevisionTag) -> Result<GraphCommit<C>, BranchError>
    where
        C: Clone,
    {
        self.check_mutable()?;
        if find_ancestor(&self.get_head(), |c| c.revision() == revision, None).is_some() {
            return Err(BranchError::DuplicateRevision(revision));
        }
        let new_commit = GraphCommit::new(change.clone(), revision, self.get_head());
        self.emit_change(
            SharedTreeBranchChange::Append {
                change,
                new_commits: vec![new_commit.clone()],
            },
            new_commit.clone(),
        );
        Ok(new_commit)
    }

    /// Creates a new branch sharing this branch's current head and fork
    /// family.
    pub fn fork(&self) -> SharedTreeBranch<C, R> {
        let child = SharedTreeBranch {
            rebaser: Rc::clone(&self.rebaser),
            head: RefCell::new(self.get_head()),
            disposed: RefCell::new(false),
            family: Rc::clone(&self.family),
            before_change: RefCell::new(Vec::new()),
            after_change: RefCell::new(Vec::new()),
            on_dispose: RefCell::new(Vec::new()),
            enforce_unrelated_branches_check: self.enforce_unrelated_branches_check,
        };
        self.family.notify_fork(&child);
        child
    }

    /// Rebases this branch's commits onto `other`'s head (or `up_to`,
    /// if given), replacing this branch's head in place.
    pub fn rebase_onto(
        &self,
        other: &SharedTreeBranch<C, R>,
        up_to: Option<&GraphCommit<C>>,
        new_revision: &mut impl FnMut() -> RevisionTag,
    ) -> Result<(), BranchError>
    where
        C: Clone,
    {
        let other_head = other.get_head();
        let new_base = up_to.unwrap_or(&other_head);
        self.rebase_onto_commit(new_base, new_revision)
    }

    /// As [`Self::rebase_onto`], but the new base is given directly as a
    /// commit rather than another branch's head. Used by callers (e.g. the
    /// edit manager) that track a chain's tip without wrapping it in a
    /// `SharedTreeBranch`.
    pub fn rebase_onto_commit(
        &self,
        new_base: &GraphCommit<C>,
        new_revision: &mut impl FnMut() -> RevisionTag,
    ) -> Result<(), BranchError>
    where
        C: Clone,
    {
        self.check_mutable()?;
        let source = self.get_head();
        let result = rebase_branch(
            &*self.rebaser,
            &source,
            new_base,
            None,
            self.enforce_unrelated_branches_check,
            new_revision,
        )?;

        if result.commits.source_commits.is_empty() && result.telemetry.count_dropped == 0 {
            return Ok(());
        }

        let change = result.source_change.unwrap_or_else(|| self.rebaser.empty());
        self.emit_change(
            SharedTreeBranchChange::Rebase {
                change,
                new_commits: result.commits.source_commits,
            },
            result.new_source_head,
        );
        Ok(())
    }

    /// Rebases `other`'s commits onto this branch's head and appends them
    /// here.
    pub fn merge(
        &self,
        other: &SharedTreeBranch<C, R>,
        new_revision: &mut impl FnMut() -> RevisionTag,
    ) -> Result<(), BranchError>
    where
        C: Clone,
    {
        self.check_mutable()?;
        let this_head = self.get_head();
        let other_head = other.get_head();
        let result = rebase_branch(
            &*self.rebaser,
            &other_head,
            &this_head,
            None,
            self.enforce_unrelated_branches_check,
            new_revision,
        )?;

        if result.commits.source_commits.is_empty() {
            return Ok(());
        }

        let change = result.source_change.unwrap_or_else(|| self.rebaser.empty());
        self.emit_change(
            SharedTreeBranchChange::Append {
                change,
                new_commits: result.commits.source_commits,
            },
            result.new_source_head,
        );
        Ok(())
    }

    /// Truncates the branch back to `commit`, an ancestor of the current
    /// head, discarding everything after it.
    pub fn remove_after(
        &self,
        commit: &GraphCommit<C>,
        new_revision: &mut impl FnMut() -> RevisionTag,
    ) -> Result<(), BranchError>
    where
        C: Clone,
    {
        self.check_mutable()?;
        let head = self.get_head();
        let mut removed_commits = Vec::new();
        let found = find_ancestor(
            &head,
            |c| c.is_same_commit(commit),
            Some(&mut removed_commits),
        );
        if found.is_none() {
            return Ok(());
        }
        if removed_commits.is_empty() {
            return Ok(());
        }

        let mut inverted = Vec::with_capacity(removed_commits.len());
        for removed in removed_commits.iter().rev() {
            let revision = new_revision();
            // These commits are discarded outright, never sequenced: their
            // inverses undo edits no peer ever observed, the same rollback
            // case `rebase_branch` tags for its sandwich inverses.
            let change = self
                .rebaser
                .invert(removed.tagged(), true, revision, &NoRevisionMetadata)?;
            inverted.push(change);
        }
        let tagged: Vec<_> = inverted.iter().map(crate::revision::TaggedChange::untagged).collect();
        let change = self.rebaser.compose(&tagged, &NoRevisionMetadata)?;

        self.emit_change(
            SharedTreeBranchChange::Remove {
                change,
                removed_commits,
            },
            commit.clone(),
        );
        Ok(())
    }

    /// Forbids further mutation; `get_head()` remains legal.
    pub fn dispose(&self) {
        if *self.disposed.borrow() {
            return;
        }
        *self.disposed.borrow_mut() = true;
        let listeners = self.on_dispose.borrow().clone();
        for listener in &listeners {
            listener();
        }
    }
}
