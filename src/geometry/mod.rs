// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and the intersect / split /
//! classify / integrate pipeline

mod bbox;
pub mod bvh;
pub mod classify;
pub mod dedup;
pub mod integrate;
pub mod intersect;
pub mod mass;
mod mesh;
mod primitives;
pub mod repair;
pub mod robust_predicates;
pub mod slice;
pub mod split;
pub mod triangle_intersection;

pub use bbox::BoundingBox;
pub use classify::{ClassifyStats, ClassifyTolerance};
pub use dedup::{build_indexed_mesh, IndexedMesh};
pub use integrate::{Apportionment, CompGeomResults, ComponentResult, TagResult};
pub use intersect::{CancelToken, IntersectStats};
pub use mass::{ComponentMass, FillStation, MassProperties, MassResults, PointMass};
pub use mesh::{
    Axis, ComponentInfo, ComponentKind, Facet, FacetState, IntersectionEdge, Mesh, PieceRef,
    SurfaceTag,
};
pub use primitives::Primitive;
pub use repair::RepairReport;
pub use slice::{SliceResults, SliceStation, SliceTolerance, WaveDragResults, WaveRotation};
pub use triangle_intersection::IntersectTolerance;
