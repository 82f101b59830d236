// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Cart3D `.tri` and NASCART `.dat` writers
//!
//! Both start with `num_nodes num_tris` and use 1-based node indices.
//! NASCART swaps to its own axes `(x, z, -y)` and flips the winding to match.

use crate::geometry::IndexedMesh;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn export_cart3d(mesh: &IndexedMesh, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create Cart3D file: {:?}", path))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{} {}", mesh.vertex_count(), mesh.triangle_count())?;
    for p in &mesh.vertices {
        writeln!(out, "{:16.10} {:16.10} {:16.10}", p.x, p.y, p.z)?;
    }
    for [a, b, c] in &mesh.triangles {
        writeln!(out, "{} {} {}", a + 1, b + 1, c + 1)?;
    }
    for component in &mesh.components {
        writeln!(out, "{}", component + 1)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the `.dat` file plus a `.key` file naming every component tag
pub fn export_nascart(mesh: &IndexedMesh, path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::create(path).with_context(|| format!("Failed to create NASCART file: {:?}", path))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{} {}", mesh.vertex_count(), mesh.triangle_count())?;
    for p in &mesh.vertices {
        writeln!(out, "{:16.10} {:16.10} {:16.10}", p.x, p.z, -p.y)?;
    }
    for ([a, b, c], component) in mesh.triangles.iter().zip(&mesh.components) {
        writeln!(out, "{} {} {} {}.0", a + 1, c + 1, b + 1, component + 1)?;
    }
    out.flush()?;

    let key_path = path.with_extension("key");
    let key = File::create(&key_path).with_context(|| format!("Failed to create key file: {:?}", key_path))?;
    let mut key = BufWriter::new(key);
    writeln!(key, "Color Name            BCType")?;
    writeln!(key, "{}", mesh.component_names.len())?;
    for (index, name) in mesh.component_names.iter().enumerate() {
        writeln!(key, "{}.0  {}  0", index + 1, name)?;
    }
    key.flush()?;

    Ok(vec![path.to_path_buf(), key_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn single_triangle() -> IndexedMesh {
        IndexedMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            triangles: vec![[0, 1, 2]],
            components: vec![0],
            component_names: vec!["wing".to_string()],
            collapsed: 0,
        }
    }

    #[test]
    fn test_cart3d_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("model.tri");
        export_cart3d(&single_triangle(), &path)?;

        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "3 1");
        assert_eq!(lines[4], "1 2 3");
        assert_eq!(lines[5], "1");
        Ok(())
    }

    #[test]
    fn test_nascart_remaps_axes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("model.dat");
        let files = export_nascart(&single_triangle(), &path)?;
        assert_eq!(files.len(), 2);

        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        let third: Vec<f64> = lines[3]
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        // (0, 2, 0) becomes (0, 0, -2)
        assert_eq!(third, vec![0.0, 0.0, -2.0]);
        assert_eq!(lines[4], "1 3 2 1.0");

        let key = std::fs::read_to_string(dir.path().join("model.key"))?;
        assert!(key.contains("1.0  wing  0"));
        Ok(())
    }
}
