// Copyright 2021 The Jujutsu Authors
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

//! Ancestor walks over the commit DAG: [`find_ancestor`] and
//! [`find_common_ancestor`].

use crate::commit::GraphCommit;

/// Walks `parent` links from `start`, returning the nearest ancestor for
/// which `predicate` holds. If `path` is supplied, it is populated with the
/// strictly descendant commits walked over (exclusive of both `start`...
/// no, inclusive of `start`, exclusive of the returned ancestor), in
/// root-to-`start` order.
pub fn find_ancestor<C>(
    start: &GraphCommit<C>,
    mut predicate: impl FnMut(&GraphCommit<C>) -> bool,
    mut path: Option<&mut Vec<GraphCommit<C>>>,
) -> Option<GraphCommit<C>> {
    let mut walked = Vec::new();
    let mut current = start.clone();
    loop {
        if predicate(&current) {
            if let Some(path) = path.as_mut() {
                walked.reverse();
                path.extend(walked);
            }
            return Some(current);
        }
        walked.push(current.clone());
        current = current.parent()?.clone();
    }
}

/// Returns the nearest commit that is an ancestor of (or equal to) both `a`
/// and `b`, or `None` if their histories are disjoint.
///
/// Runs in `O(depth(a) + depth(b))`: each chain's depth is computed once,
/// the deeper chain is advanced to match the shallower one, then both
/// chains are walked up in lock-step. No set of visited commits is built.
///
/// When `paths` is supplied, `paths.0` and `paths.1` are populated with the
/// commits strictly between the common ancestor and `a` and `b`
/// respectively, in root-to-leaf order (i.e. nearest the common ancestor
/// first, `a`/`b` themselves last).
pub fn find_common_ancestor<C>(
    a: &GraphCommit<C>,
    b: &GraphCommit<C>,
    mut paths: Option<(&mut Vec<GraphCommit<C>>, &mut Vec<GraphCommit<C>>)>,
) -> Option<GraphCommit<C>> {
    let depth_a = a.depth();
    let depth_b = b.depth();

    let mut walked_a = Vec::new();
    let mut walked_b = Vec::new();
    let mut current_a = a.clone();
    let mut current_b = b.clone();

    for _ in 0..depth_a.saturating_sub(depth_b) {
        walked_a.push(current_a.clone());
        current_a = current_a.parent()?.clone();
    }
    for _ in 0..depth_b.saturating_sub(depth_a) {
        walked_b.push(current_b.clone());
        current_b = current_b.parent()?.clone();
    }

    while !current_a.is_same_commit(&current_b) {
        walked_a.push(current_a.clone());
        walked_b.push(current_b.clone());
        current_a = current_a.parent()?.clone();
        current_b = current_b.parent()?.clone();
    }

    if let Some((path_a, path_b)) = paths.as_mut() {
        walked_a.reverse();
        walked_b.reverse();
        path_a.extend(walked_a);
        path_b.extend(walked_b);
    }

    Some(current_a)
}
