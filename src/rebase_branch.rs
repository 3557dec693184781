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

//! [`rebase_branch`]: branch rebase with commit reuse.

use crate::commit::GraphCommit;
use crate::dag_walk::find_common_ancestor;
use crate::error::RebaseError;
use crate::rebaser::ChangeRebaser;
use crate::revision::{PathRevisionMetadata, RevisionTag, TaggedChange};

/// The commits touched by a [`rebase_branch`] call, for callers that need to
/// update their own bookkeeping (e.g. anchor sets, listeners).
#[derive(Debug, Clone)]
pub struct RebaseBranchCommits<C> {
    pub source_commits: Vec<GraphCommit<C>>,
    pub target_commits: Vec<GraphCommit<C>>,
    pub deleted_source_commits: Vec<GraphCommit<C>>,
}

/// Complexity counters surfaced alongside a [`rebase_branch`] result;
/// informational only, never consulted for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebaseBranchTelemetry {
    pub source_branch_length: usize,
    pub rebase_distance: usize,
    pub count_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct RebaseBranchResult<C> {
    pub new_source_head: GraphCommit<C>,
    pub source_change: Option<C>,
    pub commits: RebaseBranchCommits<C>,
    pub telemetry: RebaseBranchTelemetry,
}

/// Rebases `source_head`'s branch onto `new_base`, optionally limited to
/// `target_head` (a descendant of, or equal to, `new_base`; defaults to
/// `new_base` itself).
///
/// Commits already present on the target chain (matched by revision tag)
/// are dropped from the source rather than re-applied. Once the scan has
/// passed `new_base` the destination keeps leaping forward for as long as
/// further source commits keep matching, so a branch that is already fully
/// represented upstream collapses to a fast-forward with no rebased commits
/// at all.
///
/// `enforce_unrelated_branches_check` controls what happens when
/// `source_head` and `new_base` share no common ancestor: when `true` (the
/// default, see [`crate::config::CoreConfig`]), the precondition violation
/// fails closed with [`RebaseError::UnrelatedBranches`]; when `false`, a
/// host that can prove the precondition holds skips the hard error in
/// release builds (a `debug_assert!` still catches a violation during
/// development) and the call degrades to a no-op.
///
/// `new_revision` mints a fresh, never-before-used [`RevisionTag`] for each
/// commit the rebase produces; tag construction from a session id / local
/// counter is a host concern the core has no opinion about.
#[tracing::instrument(skip(rebaser, source_head, new_base, target_head, new_revision))]
pub fn rebase_branch<C, R: ChangeRebaser<C>>(
    rebaser: &R,
    source_head: &GraphCommit<C>,
    new_base: &GraphCommit<C>,
    target_head: Option<&GraphCommit<C>>,
    enforce_unrelated_branches_check: bool,
    new_revision: &mut impl FnMut() -> RevisionTag,
) -> Result<RebaseBranchResult<C>, RebaseError> {
    tracing::debug!(
        source = ?source_head.revision(),
        new_base = ?new_base.revision(),
        target = ?target_head.map(|c| c.revision()),
        "rebase_branch starting"
    );
    let target_head = target_head.unwrap_or(new_base).clone();

    let mut target_commits = Vec::new();
    let mut source_commits = Vec::new();
    let found_ancestor = find_common_ancestor(
        source_head,
        &target_head,
        Some((&mut source_commits, &mut target_commits)),
    );
    let common_ancestor = match found_ancestor {
        Some(common_ancestor) => common_ancestor,
        None if enforce_unrelated_branches_check => {
            tracing::warn!(
                source = ?source_head.revision(),
                target = ?target_head.revision(),
                "rebase_branch found no common ancestor"
            );
            return Err(RebaseError::UnrelatedBranches);
        }
        None => {
            debug_assert!(
                false,
                "rebase_branch: source {:?} and target {:?} share no common ancestor, but \
                 enforce_unrelated_branches_check is disabled",
                source_head.revision(),
                target_head.revision()
            );
            tracing::warn!(
                source = ?source_head.revision(),
                target = ?target_head.revision(),
                "rebase_branch found no common ancestor; enforcement disabled, treating as a no-op"
            );
            return Ok(RebaseBranchResult {
                new_source_head: source_head.clone(),
                source_change: None,
                commits: RebaseBranchCommits {
                    source_commits: Vec::new(),
                    target_commits: Vec::new(),
                    deleted_source_commits: Vec::new(),
                },
                telemetry: RebaseBranchTelemetry {
                    source_branch_length: 0,
                    rebase_distance: 0,
                    count_dropped: 0,
                },
            });
        }
    };

    let source_branch_length = source_commits.len();
    tracing::debug!(source_branch_length, "rebase_branch located common ancestor");

    // The source contributes nothing on top of the common ancestor, i.e. it
    // already sits at or below `new_base` on the same chain: a pure no-op
    // regardless of how far `target_commits` extends.
    if source_commits.is_empty() {
        return Ok(RebaseBranchResult {
            new_source_head: source_head.clone(),
            source_change: None,
            commits: RebaseBranchCommits {
                source_commits: Vec::new(),
                target_commits,
                deleted_source_commits: Vec::new(),
            },
            telemetry: RebaseBranchTelemetry {
                source_branch_length,
                rebase_distance: 0,
                count_dropped: 0,
            },
        });
    }

    // `new_base`'s position within `target_commits`; `None` means `new_base`
    // is the common ancestor itself, so nothing is mandatory.
    let base_idx = target_commits
        .iter()
        .position(|c| c.revision() == new_base.revision());

    let mut destination_idx: Option<usize> = None;
    let mut pending: Vec<GraphCommit<C>> = Vec::new();
    let mut src_iter_idx = 0usize;
    let mut deleted_source_commits = Vec::new();
    let mut count_dropped = 0usize;

    for (j, target_commit) in target_commits.iter().enumerate() {
        let matches_next_source = src_iter_idx < source_commits.len()
            && source_commits[src_iter_idx].revision() == target_commit.revision();

        if matches_next_source {
            deleted_source_commits.push(source_commits[src_iter_idx].clone());
            src_iter_idx += 1;
            count_dropped += 1;
            destination_idx = Some(j);
            // The reused commit already carries the effect of everything
            // skipped before it; nothing earlier needs to be composed in.
            pending.clear();
            continue;
        }

        let mandatory = matches!(base_idx, Some(base) if j <= base);
        if mandatory {
            pending.push(target_commit.clone());
        }

        let source_exhausted = src_iter_idx >= source_commits.len();
        if source_exhausted && matches!(base_idx, Some(base) if j >= base) {
            break;
        }
    }

    // The mandatory minimum (reaching `new_base`) is always met even if the
    // commit-reuse scan never found a match at or after it.
    if let Some(base) = base_idx {
        let needs_fast_forward = match destination_idx {
            Some(d) => d < base,
            None => true,
        };
        if needs_fast_forward {
            destination_idx = Some(base);
        }
    }

    let rebase_distance = destination_idx.map_or(0, |d| d + 1);
    let new_parent = match destination_idx {
        Some(idx) => target_commits[idx].clone(),
        None => common_ancestor,
    };

    let remaining_source = &source_commits[src_iter_idx..];

    if remaining_source.is_empty() {
        return Ok(RebaseBranchResult {
            new_source_head: new_parent,
            source_change: None,
            commits: RebaseBranchCommits {
                source_commits: Vec::new(),
                target_commits,
                deleted_source_commits,
            },
            telemetry: RebaseBranchTelemetry {
                source_branch_length,
                rebase_distance,
                count_dropped,
            },
        });
    }

    let tagged_pending: Vec<TaggedChange<&C>> = pending.iter().map(|c| c.tagged()).collect();
    let metadata = PathRevisionMetadata::build(tagged_pending.iter(), None);
    let mut base: Option<C> = if tagged_pending.is_empty() {
        None
    } else {
        Some(rebaser.compose(&tagged_pending, &metadata)?)
    };

    let mut new_parent = new_parent;
    let mut new_source_commits = Vec::with_capacity(remaining_source.len());

    for old_commit in remaining_source {
        let old_tagged = old_commit.tagged();
        let commit_revision = new_revision();

        let empty = rebaser.empty();
        let over = base.as_ref().unwrap_or(&empty);
        let rebased = rebaser.rebase(old_tagged.clone(), TaggedChange::untagged(over), &metadata)?;
        let rebased = rebaser.change_revision(rebased, commit_revision, None);

        let new_commit = GraphCommit::new(rebased, commit_revision, new_parent.clone());

        let inv_revision = new_revision();
        let inverted = rebaser.invert(old_tagged, true, inv_revision, &metadata)?;
        let parts = [
            TaggedChange::rollback(inv_revision, old_commit.revision(), &inverted),
            TaggedChange::untagged(over),
            TaggedChange::untagged(new_commit.change()),
        ];
        let composed = rebaser.compose(&parts, &metadata)?;

        deleted_source_commits.push(old_commit.clone());
        new_parent = new_commit.clone();
        new_source_commits.push(new_commit);
        base = Some(composed);
    }

    let tagged_new: Vec<TaggedChange<&C>> = new_source_commits.iter().map(|c| c.tagged()).collect();
    let source_change = Some(rebaser.compose(&tagged_new, &metadata)?);

    tracing::trace!(
        rebased = new_source_commits.len(),
        count_dropped,
        rebase_distance,
        "rebase_branch rewrote remaining source commits"
    );

    Ok(RebaseBranchResult {
        new_source_head: new_parent,
        source_change,
        commits: RebaseBranchCommits {
            source_commits: new_source_commits,
            target_commits,
            deleted_source_commits,
        },
        telemetry: RebaseBranchTelemetry {
            source_branch_length,
            rebase_distance,
            count_dropped,
        },
    })
}
