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

//! The change algebra: [`ChangeRebaser`], the capability-bearing trait the
//! rest of the core is polymorphic over.
//!
//! The core never dispatches dynamically on the changeset type `C` itself;
//! only the rebaser implementation is provided as a capability object
//! (commonly `Arc<dyn ChangeRebaser<C>>` or a generic type parameter),
//! mirroring how this codebase dispatches over its `Backend` trait rather
//! than over tree-value types directly.

use std::any::Any;

use crate::error::RebaseError;
use crate::revision::{RevisionTag, TaggedChange};

/// Supplies the four primitive operations of the rebase algebra for an
/// opaque changeset type `C`.
///
/// Implementations must satisfy the axioms in spec §4.1 / §8 for all
/// well-formed inputs. The axiom suite is exercised, for two small test
/// changeset kinds, by the property tests under `tests/`.
pub trait ChangeRebaser<C> {
    /// Left-to-right sequential composition.
    ///
    /// `ε` (see [`Self::empty`]) is a two-sided identity; composing zero
    /// changes must return `Ok(self.empty())`.
    fn compose(
        &self,
        changes: &[TaggedChange<&C>],
        metadata: &dyn RevisionMetadataProvider,
    ) -> Result<C, RebaseError>;

    /// The semantic inverse of `change`.
    ///
    /// When `is_rollback` is `true` the produced change undoes an edit the
    /// rest of the document never observed (the sandwich-rebase rollback
    /// half); when `false` it is a user-undoable inverse that itself
    /// becomes a regular, separately-versioned edit.
    fn invert(
        &self,
        change: TaggedChange<&C>,
        is_rollback: bool,
        revision: RevisionTag,
        metadata: &dyn RevisionMetadataProvider,
    ) -> Result<C, RebaseError>;

    /// Transports `change` across `over` so the result, applied after
    /// `over`, produces the effect `change` intended relative to the state
    /// before `over`.
    fn rebase(
        &self,
        change: TaggedChange<&C>,
        over: TaggedChange<&C>,
        metadata: &dyn RevisionMetadataProvider,
    ) -> Result<C, RebaseError>;

    /// Updates external anchors across a rebase. Anchor sets are entirely a
    /// host concern; the default implementation does nothing.
    fn rebase_anchors(&self, _anchors: &mut dyn Any, _over: TaggedChange<&C>) {}

    /// Inlines a revision tag (and, for sandwich rollbacks, the tag being
    /// inverted) into a change already carrying placeholder identity.
    fn change_revision(&self, change: C, new_revision: RevisionTag, rollback_of: Option<RevisionTag>) -> C;

    /// Whether `change` has no observable effect (the empty change, or
    /// something behaviourally equivalent to it, such as `A ∘ A⁻¹`).
    fn is_empty(&self, change: &C) -> bool;

    /// The two-sided identity of [`Self::compose`].
    fn empty(&self) -> C;

    /// Behavioural equivalence, used by the axiom test suite in place of
    /// structural equality when a changeset kind has multiple
    /// representations of the same edit. Defaults to `None`, signalling
    /// "fall back to structural equality" to callers that have it.
    fn assert_changesets_equivalent(&self, _a: &C, _b: &C) -> Option<bool> {
        None
    }
}

/// Object-safe alias so trait objects (`&dyn RevisionMetadataProvider`) can
/// be passed across the `ChangeRebaser` boundary without generic metadata
/// parameters infecting every call site.
pub trait RevisionMetadataProvider {
    fn rollback_of(&self, revision: RevisionTag) -> Option<RevisionTag>;
    fn base_index(&self, revision: RevisionTag) -> Option<usize>;
}

impl<M: crate::revision::RevisionMetadata> RevisionMetadataProvider for M {
    fn rollback_of(&self, revision: RevisionTag) -> Option<RevisionTag> {
        crate::revision::RevisionMetadata::rollback_of(self, revision)
    }

    fn base_index(&self, revision: RevisionTag) -> Option<usize> {
        crate::revision::RevisionMetadata::base_index(self, revision)
    }
}

/// An empty metadata view, valid whenever a call site has no revision path
/// to report (e.g. rebasing a single change over the empty change).
pub struct NoRevisionMetadata;

impl RevisionMetadataProvider for NoRevisionMetadata {
    fn rollback_of(&self, _revision: RevisionTag) -> Option<RevisionTag> {
        None
    }

    fn base_index(&self, _revision: RevisionTag) -> Option<usize> {
        None
    }
}
