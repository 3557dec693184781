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

//! Error types for the collaborative editing core.
//!
//! Every fallible subsystem gets its own `thiserror` enum; all of them fold
//! into [`CoreError`] so a caller that only wants to propagate with `?`
//! doesn't need to match on the fine-grained variant.

use thiserror::Error;

use crate::revision::RevisionTag;

/// Errors raised by the change algebra (`ChangeRebaser`, `rebase_branch`).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RebaseError {
    /// A change was presented against a state whose context it does not
    /// match. The host must refuse the change upstream; in production this
    /// indicates a bug in the field-kind implementation.
    #[error("change is not applicable in the given context")]
    NotApplicable,
    /// The supplied `RevisionMetadata` does not contain a revision the
    /// change or rebase path refers to.
    #[error("revision metadata is missing revision {0:?}")]
    IncompatibleRevisions(RevisionTag),
    /// `rebase_branch` was asked to relate two branches with no common
    /// ancestor. The check may be disabled via `CoreConfig` for
    /// performance; the host is then responsible for the precondition.
    #[error("source and target branches share no common ancestor")]
    UnrelatedBranches,
}

/// Errors raised by [`crate::branch::SharedTreeBranch`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BranchError {
    /// Mutation was attempted on a branch that has already been disposed.
    #[error("branch has been disposed")]
    BranchDisposed,
    /// A commit with a tag already present on the target chain was added.
    #[error("revision {0:?} is already present on this branch")]
    DuplicateRevision(RevisionTag),
    #[error(transparent)]
    Rebase(#[from] RebaseError),
}

/// Errors raised by [`crate::edit_manager::EditManager`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EditManagerError {
    #[error(transparent)]
    Branch(#[from] BranchError),
    #[error(transparent)]
    Rebase(#[from] RebaseError),
}

/// Errors raised by [`crate::resubmit::ResubmitMachine`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ResubmitError {
    /// `get_enriched_commit` was called for a revision that was never
    /// submitted, or has already been resolved (sequenced) and dropped.
    #[error("revision {0:?} is not an outstanding submitted commit")]
    UnknownCommit(RevisionTag),
}

/// A codec rejected a payload while encoding or decoding a changeset.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("codec mismatch: {0}")]
pub struct CodecMismatch(pub String);

/// The union of every error kind the core can raise.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error(transparent)]
    Rebase(#[from] RebaseError),
    #[error(transparent)]
    Branch(#[from] BranchError),
    #[error(transparent)]
    EditManager(#[from] EditManagerError),
    #[error(transparent)]
    Resubmit(#[from] ResubmitError),
    #[error(transparent)]
    Codec(#[from] CodecMismatch),
}
