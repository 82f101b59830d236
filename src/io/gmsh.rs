// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GMSH `.msh` version 2.2 ASCII writer

use crate::geometry::IndexedMesh;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Triangles are element type 2 with one tag, the 1-based component
pub fn export_gmsh(mesh: &IndexedMesh, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create GMSH file: {:?}", path))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "$MeshFormat")?;
    writeln!(out, "2.2 0 {}", std::mem::size_of::<f64>())?;
    writeln!(out, "$EndMeshFormat")?;

    writeln!(out, "$Nodes")?;
    writeln!(out, "{}", mesh.vertex_count())?;
    for (i, p) in mesh.vertices.iter().enumerate() {
        writeln!(out, "{} {:16.10} {:16.10} {:16.10}", i + 1, p.x, p.y, p.z)?;
    }
    writeln!(out, "$EndNodes")?;

    writeln!(out, "$Elements")?;
    writeln!(out, "{}", mesh.triangle_count())?;
    for (t, ([a, b, c], component)) in mesh.triangles.iter().zip(&mesh.components).enumerate() {
        writeln!(out, "{} 2 1 {} {} {} {}", t + 1, component + 1, a + 1, c + 1, b + 1)?;
    }
    writeln!(out, "$EndElements")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{build_indexed_mesh, ComponentKind, Primitive};
    use nalgebra::Vector3;
    use tempfile::tempdir;

    #[test]
    fn test_gmsh_sections() -> Result<()> {
        let cube = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh("c", ComponentKind::Solid);
        let mesh = build_indexed_mesh(&[cube], &["c".to_string()], 1e-7);

        let dir = tempdir()?;
        let path = dir.path().join("cube.msh");
        export_gmsh(&mesh, &path)?;
        let text = std::fs::read_to_string(&path)?;

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "2.2 0 8");
        assert_eq!(lines[4], "8");
        let elements = lines.iter().position(|l| *l == "$Elements").unwrap();
        assert_eq!(lines[elements + 1], "12");
        let first: Vec<usize> = lines[elements + 2]
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(&first[..4], &[1, 2, 1, 1]);
        assert!(first[4..].iter().all(|&n| (1..=8).contains(&n)));
        Ok(())
    }
}
