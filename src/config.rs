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

//! Runtime configuration for the collaborative editing core.

/// What happens to trunk history older than `minimum_sequence_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrunkEvictionPolicy {
    /// Keep every trunk commit for the lifetime of the document.
    #[default]
    Retain,
    /// Drop trunk commits strictly before `minimum_sequence_number` once no
    /// live peer branch or anchor still references them.
    Compact,
}

/// Process-wide knobs the spec leaves as open questions.
///
/// `enforce_unrelated_branches_check` defaults to `true`: `rebase_branch`
/// (reached through [`crate::edit_manager::EditManager`]'s and
/// [`crate::branch::SharedTreeBranch`]'s own rebase calls) fails closed with
/// [`crate::error::RebaseError::UnrelatedBranches`] when the source and
/// target share no common ancestor. Setting it to `false` is for a host that
/// has already proven the precondition holds some other way (e.g. a single
/// shared root per document, checked once at load time): the common-ancestor
/// walk still runs, but a violation no longer returns `Err` — it trips a
/// `debug_assert!` in development and degrades to a no-op in release,
/// instead of the caller paying for the error path on every rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    pub enforce_unrelated_branches_check: bool,
    pub trunk_eviction: TrunkEvictionPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            enforce_unrelated_branches_check: true,
            trunk_eviction: TrunkEvictionPolicy::default(),
        }
    }
}
