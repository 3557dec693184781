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

//! [`GraphCommit`]: an immutable node in the commit DAG.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::revision::{RevisionTag, TaggedChange};

struct GraphCommitData<C> {
    change: C,
    revision: RevisionTag,
    parent: Option<GraphCommit<C>>,
}

/// An immutable commit node: a changeset, its revision tag, and an optional
/// parent link set once at construction and never mutated.
///
/// Cloning a handle is a refcount bump (`Arc`), so commit nodes are cheaply
/// shared across any number of branches; two branches that fork from the
/// same head share the same backing allocations for their common history.
pub struct GraphCommit<C> {
    inner: Arc<GraphCommitData<C>>,
}

impl<C> Clone for GraphCommit<C> {
    fn clone(&self) -> Self {
        GraphCommit {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for GraphCommit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCommit")
            .field("revision", &self.inner.revision)
            .finish()
    }
}

impl<C> PartialEq for GraphCommit<C> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.revision == other.inner.revision
    }
}

impl<C> Eq for GraphCommit<C> {}

impl<C> Hash for GraphCommit<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.revision.hash(state);
    }
}

impl<C> GraphCommit<C> {
    /// The root commit of a freshly created document: the well-known
    /// sentinel revision, no parent, and the rebaser's empty change.
    pub fn new_root(empty_change: C) -> Self {
        GraphCommit {
            inner: Arc::new(GraphCommitData {
                change: empty_change,
                revision: RevisionTag::ROOT,
                parent: None,
            }),
        }
    }

    /// Like [`Self::new_root`], but with an explicit root revision instead
    /// of the [`RevisionTag::ROOT`] sentinel every real document's root
    /// carries. Only meaningful for test doubles simulating two genuinely
    /// unrelated documents: production code always calls `new_root`, since
    /// the shared sentinel is what lets every peer recognise a root commit
    /// without coordinating identifiers for it.
    #[cfg(test)]
    pub fn new_root_with_revision(empty_change: C, revision: RevisionTag) -> Self {
        GraphCommit {
            inner: Arc::new(GraphCommitData {
                change: empty_change,
                revision,
                parent: None,
            }),
        }
    }

    pub fn new(change: C, revision: RevisionTag, parent: GraphCommit<C>) -> Self {
        GraphCommit {
            inner: Arc::new(GraphCommitData {
                change,
                revision,
                parent: Some(parent),
            }),
        }
    }

    pub fn change(&self) -> &C {
        &self.inner.change
    }

    pub fn revision(&self) -> RevisionTag {
        self.inner.revision
    }

    pub fn parent(&self) -> Option<&GraphCommit<C>> {
        self.inner.parent.as_ref()
    }

    /// Whether this is the reference-identical commit object `other`
    /// (rather than merely a commit with the same revision tag -- which,
    /// for non-root commits, [`PartialEq`] already treats as equal).
    pub fn is_same_commit(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The `(revision, change, rollback_of)` view used by the rebaser.
    /// Commits minted by the core never carry `rollback_of` themselves;
    /// that marker lives on the [`TaggedChange`] produced transiently
    /// during a sandwich rebase, not on the persisted commit.
    pub fn tagged(&self) -> TaggedChange<&C> {
        TaggedChange::new(self.inner.revision, &self.inner.change)
    }

    /// Depth from the root, i.e. the number of parent links to follow.
    /// `O(depth)`.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.clone();
        while let Some(parent) = current.parent().cloned() {
            depth += 1;
            current = parent;
        }
        depth
    }
}
