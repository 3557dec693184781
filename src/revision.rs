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

//! Revision identity: [`RevisionTag`] and [`TaggedChange`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a commit.
///
/// Construction from a session id / local counter pair is a host concern
/// (identifier compression is out of scope for this core); the core only
/// relies on `Eq + Hash + Ord + Copy`. [`RevisionTag::ROOT`] is the
/// well-known sentinel every document's root commit carries, and it always
/// encodes/decodes to itself regardless of originator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevisionTag(u128);

impl RevisionTag {
    /// The sentinel tag of the root commit of a freshly created document.
    pub const ROOT: RevisionTag = RevisionTag(0);

    /// Wraps an opaque 128-bit value minted by the host (e.g. a compressed
    /// session id combined with a local counter).
    pub const fn from_raw(value: u128) -> Self {
        RevisionTag(value)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }
}

impl fmt::Debug for RevisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "RevisionTag(root)")
        } else {
            write!(f, "RevisionTag({:#x})", self.0)
        }
    }
}

/// A changeset paired with its identity.
///
/// `rollback_of` is set when `change` is the inverse generated during a
/// sandwich rebase (see [`crate::rebase_branch`]); such changes are never
/// themselves versioned as user intentions, and must stay distinguishable
/// from a user-authored change that happens to have the same semantic
/// effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedChange<T> {
    pub revision: Option<RevisionTag>,
    pub change: T,
    pub rollback_of: Option<RevisionTag>,
}

impl<T> TaggedChange<T> {
    pub fn new(revision: RevisionTag, change: T) -> Self {
        TaggedChange {
            revision: Some(revision),
            change,
            rollback_of: None,
        }
    }

    pub fn rollback(revision: RevisionTag, rollback_of: RevisionTag, change: T) -> Self {
        TaggedChange {
            revision: Some(revision),
            change,
            rollback_of: Some(rollback_of),
        }
    }

    /// An untagged change, e.g. the empty change used as a rebase base when
    /// there is nothing to compose.
    pub fn untagged(change: T) -> Self {
        TaggedChange {
            revision: None,
            change,
            rollback_of: None,
        }
    }

    pub fn is_rollback(&self) -> bool {
        self.rollback_of.is_some()
    }

    pub fn as_ref(&self) -> TaggedChange<&T> {
        TaggedChange {
            revision: self.revision,
            change: &self.change,
            rollback_of: self.rollback_of,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TaggedChange<U> {
        TaggedChange {
            revision: self.revision,
            change: f(self.change),
            rollback_of: self.rollback_of,
        }
    }
}

/// Read-only view over the revisions relevant to a single rebase or compose
/// call: for each revision mentioned in the incoming change or the rebase
/// path, its rollback-of relationship (if any) and its ordinal position in
/// the composed base.
pub trait RevisionMetadata {
    fn rollback_of(&self, revision: RevisionTag) -> Option<RevisionTag>;
    fn base_index(&self, revision: RevisionTag) -> Option<usize>;
}

/// A [`RevisionMetadata`] derived from the list of tagged changes making up
/// a rebase path, in composed order, plus (optionally) the incoming change
/// being rebased across that path.
#[derive(Debug, Default)]
pub struct PathRevisionMetadata {
    rollback_of: std::collections::HashMap<RevisionTag, RevisionTag>,
    base_index: std::collections::HashMap<RevisionTag, usize>,
}

impl PathRevisionMetadata {
    pub fn build<'a, T>(
        path: impl IntoIterator<Item = &'a TaggedChange<T>>,
        incoming: Option<&TaggedChange<T>>,
    ) -> Self
    where
        T: 'a,
    {
        let mut rollback_of = std::collections::HashMap::new();
        let mut base_index = std::collections::HashMap::new();
        for (index, tagged) in path.into_iter().enumerate() {
            if let Some(revision) = tagged.revision {
                base_index.insert(revision, index);
                if let Some(inverted) = tagged.rollback_of {
                    rollback_of.insert(revision, inverted);
                }
            }
        }
        if let Some(tagged) = incoming {
            if let (Some(revision), Some(inverted)) = (tagged.revision, tagged.rollback_of) {
                rollback_of.insert(revision, inverted);
            }
        }
        PathRevisionMetadata {
            rollback_of,
            base_index,
        }
    }
}

impl RevisionMetadata for PathRevisionMetadata {
    fn rollback_of(&self, revision: RevisionTag) -> Option<RevisionTag> {
        self.rollback_of.get(&revision).copied()
    }

    fn base_index(&self, revision: RevisionTag) -> Option<usize> {
        self.base_index.get(&revision).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_stable_across_construction() {
        assert_eq!(RevisionTag::ROOT, RevisionTag::from_raw(0));
        assert!(RevisionTag::ROOT.is_root());
    }

    #[test]
    fn metadata_tracks_rollback_and_index() {
        let a = TaggedChange::new(RevisionTag::from_raw(1), 'a');
        let b = TaggedChange::rollback(RevisionTag::from_raw(2), RevisionTag::from_raw(1), 'b');
        let metadata = PathRevisionMetadata::build([&a, &b], None);
        assert_eq!(metadata.base_index(RevisionTag::from_raw(1)), Some(0));
        assert_eq!(metadata.base_index(RevisionTag::from_raw(2)), Some(1));
        assert_eq!(
            metadata.rollback_of(RevisionTag::from_raw(2)),
            Some(RevisionTag::from_raw(1))
        );
        assert_eq!(metadata.rollback_of(RevisionTag::from_raw(1)), None);
    }
}
