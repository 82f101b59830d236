// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL reader and writers

use crate::engine::PartInput;
use crate::geometry::{ComponentKind, IndexedMesh};
use anyhow::{Context, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Read an ASCII or binary STL file as one part named after the file stem
pub fn import_stl(path: &Path, kind: ComponentKind) -> Result<PartInput> {
    let mut file = File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let stl = stl_io::read_stl(&mut file).with_context(|| format!("Failed to read STL file: {:?}", path))?;

    let point = |index: usize| {
        let v = &stl.vertices[index];
        Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)
    };
    let triangles = stl
        .faces
        .iter()
        .map(|face| face.vertices.map(point))
        .collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "part".to_string());
    Ok(PartInput::new(name, kind, triangles))
}

pub fn export_stl_binary(mesh: &IndexedMesh, path: &Path) -> Result<()> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let vertex = |p: &Point3<f64>| StlVertex::new([p.x as f32, p.y as f32, p.z as f32]);
    let triangles: Vec<StlTriangle> = (0..mesh.triangle_count())
        .map(|t| {
            let n = mesh.normal(t);
            let [a, b, c] = mesh.corners(t);
            StlTriangle {
                normal: Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(&a), vertex(&b), vertex(&c)],
            }
        })
        .collect();

    let mut file = BufWriter::new(File::create(path).context("Failed to create STL file")?);
    stl_io::write_stl(&mut file, triangles.iter()).context("Failed to write STL file")?;
    Ok(())
}

/// One `solid` block per component
pub fn export_stl_ascii(mesh: &IndexedMesh, path: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(path).context("Failed to create STL file")?);

    let mut components: Vec<usize> = mesh.components.clone();
    components.sort_unstable();
    components.dedup();

    for component in components {
        let name = mesh
            .component_names
            .get(component)
            .map(String::as_str)
            .unwrap_or("mesh");
        writeln!(file, "solid {}", name)?;
        for t in (0..mesh.triangle_count()).filter(|&t| mesh.components[t] == component) {
            let n = mesh.normal(t);
            writeln!(file, "  facet normal {} {} {}", n.x, n.y, n.z)?;
            writeln!(file, "    outer loop")?;
            for p in mesh.corners(t) {
                writeln!(file, "      vertex {} {} {}", p.x, p.y, p.z)?;
            }
            writeln!(file, "    endloop")?;
            writeln!(file, "  endfacet")?;
        }
        writeln!(file, "endsolid {}", name)?;
    }
    file.flush()?;
    Ok(())
}
