// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Visited-set guarded graph walks shared by group flattening, edge chain resolution and link
//! propagation. Every walk terminates even when the underlying graph is cyclic.

use std::collections::BTreeSet;

/// Depth-first preorder from `roots`; each item is yielded at most once.
///
/// `expand` pushes the successors of an item, in the order they should be visited.
pub(crate) fn depth_first<T, F>(roots: impl IntoIterator<Item = T>, mut expand: F) -> Vec<T>
where
    T: Ord + Clone,
    F: FnMut(&T, &mut Vec<T>),
{
    let mut visited = BTreeSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<T> = roots.into_iter().collect();
    stack.reverse();
    let mut successors = Vec::new();

    while let Some(item) = stack.pop() {
        if !visited.insert(item.clone()) {
            continue;
        }
        successors.clear();
        expand(&item, &mut successors);
        stack.extend(successors.drain(..).rev());
        order.push(item);
    }

    order
}

/// Outcome of following a single-successor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChainEnd<T> {
    /// The last item, which has no successor.
    Terminal(T),
    /// The first item reached twice.
    Cycle(T),
}

/// Follows `next` from `start` until it yields `None` or revisits an item.
pub(crate) fn follow<T, F>(start: T, mut next: F) -> ChainEnd<T>
where
    T: Ord + Clone,
    F: FnMut(&T) -> Option<T>,
{
    let mut visited = BTreeSet::new();
    let mut current = start;
    loop {
        if !visited.insert(current.clone()) {
            return ChainEnd::Cycle(current);
        }
        match next(&current) {
            Some(successor) => current = successor,
            None => return ChainEnd::Terminal(current),
        }
    }
}
