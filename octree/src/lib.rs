// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Octree: mutable facades over the persistent tree algebra in
//! [`octree_core`].
//!
//! [`Octree<D>`] maps distinct 3D points to payloads; [`BlobOctree<D>`] maps
//! distinct 3D reference points to `(extent box, payload)` pairs for
//! spatially extended objects. Both own a bounding box and a persistent root,
//! replacing the root atomically on each successful mutation — the
//! underlying tree itself never changes in place, so a reference to an old
//! root (kept alive elsewhere, e.g. via [`BlobOctree::copy`]) remains valid.
//!
//! # Example
//!
//! ```rust
//! use octree::Octree;
//! use octree_core::types::{Box3, Point3};
//!
//! let bounds = Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0));
//! let mut t = Octree::<&str>::new(bounds);
//! t.insert(Point3::new(0.33, 0.66, 0.99), "A").unwrap();
//! t.insert(Point3::new(0.12, 0.34, 0.56), "B").unwrap();
//! assert_eq!(t.len(), 2);
//!
//! let nearest = t.nearest_to_point(Point3::new(0.1, 0.3, 0.5)).unwrap();
//! assert_eq!(nearest.2, &"B");
//! ```
//!
//! ## Diagnostics
//!
//! With the `tracing` feature enabled, `insert`/`update`/`remove`/
//! `simple_union`/`general_union`/`rebound` each emit a span, and the
//! underlying [`octree_core`] tree's `smartnode` collapses are visible via
//! `trace`-level events raised at the facade boundary (never from inside
//! the pure algebra — see [`octree_core`]'s docs on why the kernel stays
//! tracing-free).
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod blob_octree;
mod point_octree;

pub use blob_octree::BlobOctree;
pub use point_octree::Octree;

pub use octree_core;
