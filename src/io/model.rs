// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Model manifests: which STL files make up an assembly and how to treat them

use super::stl::import_stl;
use crate::engine::PartInput;
use crate::geometry::ComponentKind;
use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One part of a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEntry {
    pub name: Option<String>,
    pub id: Option<String>,
    /// STL path, relative to the manifest
    pub file: PathBuf,
    #[serde(default)]
    pub kind: ComponentKind,
    pub density: Option<f64>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tags: Vec<TagEntry>,
}

/// Sub-surface of a part: every triangle whose centroid lies in the box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl TagEntry {
    fn contains(&self, triangle: &[Point3<f64>; 3]) -> bool {
        let c = (triangle[0].coords + triangle[1].coords + triangle[2].coords) / 3.0;
        (0..3).all(|k| c[k] >= self.min[k] && c[k] <= self.max[k])
    }
}

/// `model.toml` listing the parts of an assembly
///
/// ```toml
/// [[parts]]
/// name = "fuselage"
/// file = "fuselage.stl"
/// density = 2.7
///
/// [[parts.tags]]
/// name = "tail_cone"
/// min = [9.0, -1.0, -1.0]
/// max = [10.0, 1.0, 1.0]
///
/// [[parts]]
/// file = "skin.stl"
/// kind = "shell"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default)]
    pub parts: Vec<PartEntry>,
}

impl ModelManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model manifest: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse model manifest: {:?}", path))
    }

    /// Read every listed file; relative paths resolve against `base`
    pub fn load_parts(&self, base: &Path, default_density: f64) -> Result<Vec<PartInput>> {
        if self.parts.is_empty() {
            bail!("model manifest lists no parts");
        }
        self.parts
            .iter()
            .map(|entry| {
                let path = if entry.file.is_absolute() {
                    entry.file.clone()
                } else {
                    base.join(&entry.file)
                };
                let mut part = import_stl(&path, entry.kind)?;
                if let Some(name) = &entry.name {
                    part.name = name.clone();
                }
                part.id = entry.id.clone().unwrap_or_else(|| part.name.clone());
                part.density = entry.density.unwrap_or(default_density);
                part.priority = entry.priority;
                for tag in &entry.tags {
                    let selected: Vec<usize> = part
                        .triangles
                        .iter()
                        .enumerate()
                        .filter(|(_, t)| tag.contains(t))
                        .map(|(i, _)| i)
                        .collect();
                    debug!(part = %part.name, tag = %tag.name, triangles = selected.len(), "tagged sub-surface");
                    part = part.with_tag(tag.name.clone(), selected);
                }
                debug!(part = %part.name, triangles = part.triangles.len(), "loaded part");
                Ok(part)
            })
            .collect()
    }
}

/// Every `.stl` under `dir` as a solid part, in path order
pub fn load_directory(dir: &Path, default_density: f64) -> Result<Vec<PartInput>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("stl"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no STL files found in {:?}", dir);
    }

    files
        .iter()
        .map(|path| import_stl(path, ComponentKind::Solid).map(|part| part.with_density(default_density)))
        .collect()
}
