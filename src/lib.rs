// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CompGeom
//!
//! Triangle-mesh intersection engine for assembled vehicle geometry.
//! Independently meshed parts are intersected pairwise, re-triangulated
//! along the intersection curves, classified as interior or exterior to the
//! assembly and integrated into wetted area, wetted volume and mass
//! properties. Planar and wave-drag slicing reuse the same pipeline.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod io;

pub use config::CompGeomConfig;
pub use engine::{
    check_meshes, run_area_slice, run_comp_geom, run_mass_properties, run_wave_drag, Assembly,
    CancelToken, CheckReport, CompGeomOutcome, Diagnostics, Outcome, PartInput,
};
pub use error::{CompGeomError, CompGeomResult};
pub use geometry::{
    Axis, CompGeomResults, ComponentKind, IndexedMesh, MassResults, Mesh, Primitive, SliceResults,
    WaveDragResults,
};
