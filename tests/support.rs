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

//! Two small changeset kinds shared by the tests in this directory.
//!
//! `Counter` is the degenerate case: `rebase` ignores its `over` argument
//! entirely, so every axiom in spec §4.1 holds of it trivially. `Log` is a
//! richer, position-based changeset (an ordered sequence of insert/remove
//! ops, the shape most field kinds in practice actually have) whose
//! index-shifting `rebase` satisfies every axiom except right-distributivity
//! (see `test_rebaser_axioms::log_rebaser_right_distributivity_counterexample`).

use std::rc::Rc;

use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

use tree_edit_core::{ChangeRebaser, GraphCommit, RebaseError, RevisionTag};

// ---------------------------------------------------------------------
// Counter: i64 under addition.
// ---------------------------------------------------------------------

pub struct CounterRebaser;

impl ChangeRebaser<i64> for CounterRebaser {
    fn compose(
        &self,
        changes: &[tree_edit_core::TaggedChange<&i64>],
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
    ) -> Result<i64, RebaseError> {
        Ok(changes.iter().map(|c| *c.change).sum())
    }

    fn invert(
        &self,
        change: tree_edit_core::TaggedChange<&i64>,
        _is_rollback: bool,
        _revision: RevisionTag,
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
    ) -> Result<i64, RebaseError> {
        Ok(-*change.change)
    }

    fn rebase(
        &self,
        change: tree_edit_core::TaggedChange<&i64>,
        _over: tree_edit_core::TaggedChange<&i64>,
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
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

// ---------------------------------------------------------------------
// Log: an ordered sequence of position-addressed insert/remove ops.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Arbitrary)]
pub enum LogOp {
    Insert {
        #[proptest(strategy = "0usize..6")]
        index: usize,
        #[proptest(strategy = "\"[a-z]\"")]
        text: String,
    },
    Remove {
        #[proptest(strategy = "0usize..6")]
        index: usize,
        #[proptest(strategy = "\"[a-z]\"")]
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogChange(pub Vec<LogOp>);

/// Interprets `ops` against `doc` from whatever state it is already in.
/// A `Remove` whose `text` no longer matches the element at `index` is
/// treated as already absorbed and silently skipped, the same tolerance a
/// real sandwich-rebase rollback relies on.
pub fn simulate(doc: &mut Vec<String>, ops: &[LogOp]) {
    for op in ops {
        match op {
            LogOp::Insert { index, text } => {
                let index = (*index).min(doc.len());
                doc.insert(index, text.clone());
            }
            LogOp::Remove { index, text } => {
                if doc.get(*index).is_some_and(|existing| existing == text) {
                    doc.remove(*index);
                }
            }
        }
    }
}

pub struct LogRebaser;

impl ChangeRebaser<LogChange> for LogRebaser {
    fn compose(
        &self,
        changes: &[tree_edit_core::TaggedChange<&LogChange>],
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
    ) -> Result<LogChange, RebaseError> {
        let mut ops = Vec::new();
        for change in changes {
            ops.extend(change.change.0.iter().cloned());
        }
        Ok(LogChange(ops))
    }

    fn invert(
        &self,
        change: tree_edit_core::TaggedChange<&LogChange>,
        _is_rollback: bool,
        _revision: RevisionTag,
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
    ) -> Result<LogChange, RebaseError> {
        let inverted = change
            .change
            .0
            .iter()
            .rev()
            .map(|op| match op {
                LogOp::Insert { index, text } => LogOp::Remove {
                    index: *index,
                    text: text.clone(),
                },
                LogOp::Remove { index, text } => LogOp::Insert {
                    index: *index,
                    text: text.clone(),
                },
            })
            .collect();
        Ok(LogChange(inverted))
    }

    /// Shifts each op's `index` across every op in `over`, in order: a
    /// preceding `Insert` at or before the current index pushes it forward,
    /// a preceding `Remove` strictly before it pulls it back. This is the
    /// same fold a list-splice field kind performs in practice; it says
    /// nothing about which of two concurrent inserts at the same position
    /// should end up first, which is exactly the gap right-distributivity
    /// exposes.
    fn rebase(
        &self,
        change: tree_edit_core::TaggedChange<&LogChange>,
        over: tree_edit_core::TaggedChange<&LogChange>,
        _metadata: &dyn tree_edit_core::rebaser::RevisionMetadataProvider,
    ) -> Result<LogChange, RebaseError> {
        let ops = change
            .change
            .0
            .iter()
            .map(|op| {
                let (mut index, is_insert, text) = match op {
                    LogOp::Insert { index, text } => (*index, true, text.clone()),
                    LogOp::Remove { index, text } => (*index, false, text.clone()),
                };
                for over_op in &over.change.0 {
                    match over_op {
                        LogOp::Insert { index: over_index, .. } if *over_index <= index => index += 1,
                        LogOp::Remove { index: over_index, .. } if *over_index < index => index = index.saturating_sub(1),
                        _ => {}
                    }
                }
                if is_insert {
                    LogOp::Insert { index, text }
                } else {
                    LogOp::Remove { index, text }
                }
            })
            .collect();
        Ok(LogChange(ops))
    }

    fn change_revision(&self, change: LogChange, _new_revision: RevisionTag, _rollback_of: Option<RevisionTag>) -> LogChange {
        change
    }

    fn is_empty(&self, change: &LogChange) -> bool {
        change.0.is_empty()
    }

    fn empty(&self) -> LogChange {
        LogChange(Vec::new())
    }

    /// Structural equality is too strict for a sequence type: `A` composed
    /// with its own inverse never shrinks back to an empty op list, only to
    /// one with no net effect. Simulate both changes from the empty
    /// document and compare the result instead.
    fn assert_changesets_equivalent(&self, a: &LogChange, b: &LogChange) -> Option<bool> {
        let mut doc_a = Vec::new();
        simulate(&mut doc_a, &a.0);
        let mut doc_b = Vec::new();
        simulate(&mut doc_b, &b.0);
        Some(doc_a == doc_b)
    }
}

// ---------------------------------------------------------------------
// Commit graph builder, grounded on the teacher's `CommitGraphBuilder`.
// ---------------------------------------------------------------------

/// Builds a chain of `i64`-valued commits on top of a shared root, mirroring
/// the teacher's `testutils::CommitGraphBuilder` minus the repo/backend
/// plumbing this crate has no use for.
pub struct CommitChainBuilder {
    next_revision: u128,
}

impl CommitChainBuilder {
    pub fn new() -> Self {
        CommitChainBuilder { next_revision: 1 }
    }

    pub fn root(&self) -> GraphCommit<i64> {
        GraphCommit::new_root(0)
    }

    pub fn child(&mut self, parent: &GraphCommit<i64>, change: i64) -> GraphCommit<i64> {
        let revision = RevisionTag::from_raw(self.next_revision);
        self.next_revision += 1;
        GraphCommit::new(change, revision, parent.clone())
    }

    pub fn chain(&mut self, parent: &GraphCommit<i64>, changes: &[i64]) -> GraphCommit<i64> {
        let mut head = parent.clone();
        for change in changes {
            head = self.child(&head, *change);
        }
        head
    }
}

pub fn rc<T>(value: T) -> Rc<T> {
    Rc::new(value)
}

/// Installs a `tracing` subscriber reading `RUST_LOG`, the same
/// env-filter-driven shape the teacher installs at CLI startup, scoped down
/// to what the integration-test binary needs. Safe to call from every test
/// in the `runner` binary: `try_init` is a no-op after the first caller.
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::metadata::LevelFilter::WARN.into())
        .from_env_lossy();
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_filter(filter))
        .try_init();
}
