// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The four synchronous error kinds raised by the tree algebra and facades.

use crate::types::{Box3, Point3};

/// Errors raised by point/blob octree operations.
///
/// These are programmer errors: the tree algebra never retries, rolls back,
/// or logs on failure. Facade state is never mutated when an operation
/// returns `Err` — a new root is only published after the algebra returns
/// `Ok`.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum OctreeError {
    /// A point argument lies outside the facade's bounding box.
    #[error("point {point:?} lies outside the tree's bounds")]
    OutOfBounds {
        /// The offending point.
        point: Point3,
    },
    /// `insert` was called with a coordinate already present in the tree.
    #[error("coordinate {point:?} is already present")]
    DuplicateKey {
        /// The colliding coordinate.
        point: Point3,
    },
    /// `remove` (or an analogous lookup) was called on an absent coordinate.
    #[error("coordinate {point:?} is not present")]
    MissingKey {
        /// The coordinate that was not found.
        point: Point3,
    },
    /// `simple_union` was called on two facades with different bounds.
    #[error("bounds mismatch: {left:?} vs {right:?}")]
    BoundsMismatch {
        /// Bounds of the left-hand facade.
        left: Box3,
        /// Bounds of the right-hand facade.
        right: Box3,
    },
}
