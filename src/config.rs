// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CompGeom configuration system
//!
//! Settings load from `compgeom.toml` (when present) and are then overridden by
//! `COMPGEOM_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CompGeomError, CompGeomResult};
use crate::geometry::{Axis, PointMass};
use crate::io::ExportFormat;

/// Default configuration file looked up by [`CompGeomConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "compgeom.toml";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompGeomConfig {
    pub engine: EngineConfig,
    pub slicing: SliceConfig,
    pub mass: MassConfig,
    pub output: OutputConfig,
}

/// Tolerances and switches for the intersect / split / classify pipeline.
///
/// Lengths are in normalized model units: the assembly is scaled so that its
/// largest bounding-box dimension equals `normalized_size` before intersecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Target size of the largest model dimension, `0` keeps caller units
    pub normalized_size: f64,
    /// Vertex-to-plane distances below this snap to zero
    pub plane_tolerance: f64,
    /// Intersection segments shorter than this are discarded
    pub min_segment_length: f64,
    /// Facets with an edge or height below this are removed by repair
    pub degenerate_tolerance: f64,
    /// Distance under which open-edge endpoints of two meshes coincide
    pub merge_tolerance: f64,
    /// Primary ray direction for inside/outside tests
    pub ray_direction: [f64; 3],
    /// Ray hits closer than this along the ray count once
    pub ray_dedup_tolerance: f64,
    /// Directions tried before accepting an ambiguous ray
    pub max_ray_attempts: usize,
    /// Upper bound on wetted-volume apportionment passes
    pub apportion_iterations: usize,
    /// Apportionment stops once the leftover volume drops below this
    pub apportion_tolerance: f64,
    /// Export weld tolerance as a fraction of the model diagonal
    pub weld_tolerance_factor: f64,
    /// Cut the assembly at y = 0 and keep the y > 0 half
    pub half_mesh: bool,
    /// Run the mesh-pair sweep on the rayon pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normalized_size: 1000.0,
            plane_tolerance: 1e-9,
            min_segment_length: 1e-6,
            degenerate_tolerance: 1e-6,
            merge_tolerance: 1e-5,
            ray_direction: [1.0, 0.0, 0.0],
            ray_dedup_tolerance: 1e-7,
            max_ray_attempts: 4,
            apportion_iterations: 20,
            apportion_tolerance: 1e-5,
            weld_tolerance_factor: 1e-7,
            half_mesh: false,
            parallel: false,
        }
    }
}

/// Planar and wave-drag slicing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SliceConfig {
    pub axis: Axis,
    pub count: usize,
    /// Use the model bounding box for the first and last station
    pub auto_bounds: bool,
    pub start: f64,
    pub end: f64,
    /// Quads per side of every planar slice mesh
    pub tessellation: usize,
    /// Free-stream Mach number for wave-drag slicing
    pub mach: f64,
    /// Roll angles per wave-drag station
    pub rotations: usize,
    /// Sweep roll angles over [0, pi] only (model symmetric about y = 0)
    pub symmetric: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            axis: Axis::X,
            count: 10,
            auto_bounds: true,
            start: 0.0,
            end: 0.0,
            tessellation: 10,
            mach: 1.4,
            rotations: 4,
            symmetric: false,
        }
    }
}

/// Slice-based mass properties settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MassConfig {
    /// Number of slabs (at least 3)
    pub slices: usize,
    /// Slab normal
    pub axis: Axis,
    /// Density used for parts that do not specify one
    pub default_density: f64,
    pub point_masses: Vec<PointMass>,
}

impl Default for MassConfig {
    fn default() -> Self {
        Self {
            slices: 20,
            axis: Axis::X,
            default_density: 1.0,
            point_masses: Vec::new(),
        }
    }
}

/// Where and what to write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub formats: Vec<ExportFormat>,
    /// Also write the key/value CSV next to the text report
    pub csv: bool,
    /// Also write the results as JSON
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("compgeom_out"),
            formats: vec![ExportFormat::StlAscii],
            csv: true,
            json: false,
        }
    }
}

impl CompGeomConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: CompGeomConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `COMPGEOM_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_parse::<f64>("COMPGEOM_NORMALIZED_SIZE") {
            self.engine.normalized_size = value;
        }
        if let Some(value) = env_parse::<f64>("COMPGEOM_MIN_SEGMENT") {
            self.engine.min_segment_length = value;
        }
        if let Some(value) = env_parse::<bool>("COMPGEOM_PARALLEL") {
            self.engine.parallel = value;
        }
        if let Some(value) = env_parse::<bool>("COMPGEOM_HALF_MESH") {
            self.engine.half_mesh = value;
        }
        if let Some(value) = env_parse::<usize>("COMPGEOM_SLICES") {
            self.slicing.count = value;
        }
        if let Some(value) = env_parse::<usize>("COMPGEOM_MASS_SLICES") {
            self.mass.slices = value;
        }
        if let Some(value) = env_parse::<Axis>("COMPGEOM_MASS_AXIS") {
            self.mass.axis = value;
        }
        if let Ok(dir) = std::env::var("COMPGEOM_OUTPUT_DIR") {
            self.output.directory = PathBuf::from(dir);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> CompGeomResult<()> {
        let e = &self.engine;
        let positive = [
            ("engine.plane_tolerance", e.plane_tolerance),
            ("engine.min_segment_length", e.min_segment_length),
            ("engine.degenerate_tolerance", e.degenerate_tolerance),
            ("engine.merge_tolerance", e.merge_tolerance),
            ("engine.ray_dedup_tolerance", e.ray_dedup_tolerance),
            ("engine.apportion_tolerance", e.apportion_tolerance),
            ("engine.weld_tolerance_factor", e.weld_tolerance_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CompGeomError::config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !e.normalized_size.is_finite() || e.normalized_size < 0.0 {
            return Err(CompGeomError::config("engine.normalized_size must be >= 0"));
        }
        let dir = e.ray_direction;
        let len = (dir[0] * dir[0] + dir[1] * dir[1] + dir[2] * dir[2]).sqrt();
        if !len.is_finite() || len < 1e-12 {
            return Err(CompGeomError::config("engine.ray_direction must be non-zero"));
        }
        if e.max_ray_attempts == 0 {
            return Err(CompGeomError::config("engine.max_ray_attempts must be >= 1"));
        }
        if self.slicing.count == 0 {
            return Err(CompGeomError::config("slicing.count must be >= 1"));
        }
        if self.slicing.tessellation == 0 {
            return Err(CompGeomError::config("slicing.tessellation must be >= 1"));
        }
        if !(self.slicing.mach > 1.0) {
            return Err(CompGeomError::config(format!(
                "slicing.mach must be supersonic, got {}",
                self.slicing.mach
            )));
        }
        if self.slicing.rotations == 0 || (self.slicing.symmetric && self.slicing.rotations < 2) {
            return Err(CompGeomError::config(
                "slicing.rotations must be >= 1 (>= 2 when symmetric)",
            ));
        }
        if !self.slicing.auto_bounds && !(self.slicing.end >= self.slicing.start) {
            return Err(CompGeomError::config("slicing.end must not precede slicing.start"));
        }
        if self.mass.slices < 3 {
            return Err(CompGeomError::config("mass.slices must be >= 3"));
        }
        for point in &self.mass.point_masses {
            let finite = point.cg.iter().all(|v| v.is_finite());
            if !(point.mass.is_finite() && point.mass >= 0.0) || !finite {
                return Err(CompGeomError::config(format!(
                    "mass.point_masses: '{}' needs a finite mass >= 0 and a finite cg",
                    point.name
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.trim().parse().ok())
}
