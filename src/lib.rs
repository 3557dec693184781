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

//! The collaborative editing core: a change algebra, a commit graph,
//! branch rebase with commit reuse, an edit manager running the
//! trunk/local/peer sandwich-rebase protocol, lazy commit enrichment, and
//! minimal resubmit after reconnect.
//!
//! The core is polymorphic over an opaque changeset type `C`; a host
//! supplies the algebra ([`rebaser::ChangeRebaser`]) and a wire codec
//! ([`codec::Codec`]). Nothing in this crate knows what a changeset
//! actually edits.

pub mod branch;
pub mod codec;
pub mod commit;
pub mod config;
pub mod dag_walk;
pub mod edit_manager;
pub mod enricher;
pub mod error;
pub mod rebase_branch;
pub mod rebaser;
pub mod resubmit;
pub mod revision;

pub use branch::{SharedTreeBranch, SharedTreeBranchChange};
pub use codec::{Codec, CodecContext};
pub use commit::GraphCommit;
pub use config::{CoreConfig, TrunkEvictionPolicy};
pub use edit_manager::{EditManager, PeerId};
pub use enricher::BranchCommitEnricher;
pub use error::{BranchError, CodecMismatch, CoreError, EditManagerError, RebaseError, ResubmitError};
pub use dag_walk::{find_ancestor, find_common_ancestor};
pub use rebase_branch::{rebase_branch, RebaseBranchCommits, RebaseBranchResult, RebaseBranchTelemetry};
pub use rebaser::ChangeRebaser;
pub use resubmit::ResubmitMachine;
pub use revision::{RevisionTag, TaggedChange};
