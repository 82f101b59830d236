// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Export of the trimmed skin in every supported format

use anyhow::Result;
use compgeom::io::{self, ExportFormat};
use compgeom::{run_comp_geom, CompGeomConfig, ComponentKind, PartInput, Primitive};
use nalgebra::{Point3, Vector3};
use tempfile::{tempdir, NamedTempFile};

fn two_part_outcome() -> Result<compgeom::CompGeomOutcome> {
    let parts = [
        PartInput::solid("body", &Primitive::cube(Vector3::new(2.0, 1.0, 1.0), false)),
        PartInput::solid(
            "fin",
            &Primitive::boxed(Point3::new(0.5, 0.25, 0.5), Point3::new(1.0, 0.75, 2.0)),
        ),
    ];
    Ok(run_comp_geom(&parts, &CompGeomConfig::default(), None)?)
}

#[test]
fn test_every_format_writes_files() -> Result<()> {
    let outcome = two_part_outcome()?;
    let mesh = &outcome.mesh;
    let dir = tempdir()?;

    println!(
        "Trimmed skin: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    for format in ExportFormat::ALL {
        let path = dir.path().join(format.file_name("assembly"));
        let written = format.export(mesh, &path)?;
        for file in &written {
            let size = std::fs::metadata(file)?.len();
            println!("  {}: {:?} ({} bytes)", format, file.file_name(), size);
            assert!(size > 0, "{} wrote an empty file", format);
        }
        let expected = if format == ExportFormat::Nascart { 2 } else { 1 };
        assert_eq!(written.len(), expected, "{} file count", format);
    }
    Ok(())
}

#[test]
fn test_cart3d_layout() -> Result<()> {
    let outcome = two_part_outcome()?;
    let mesh = &outcome.mesh;
    let file = NamedTempFile::with_suffix(".tri")?;
    io::export_cart3d(mesh, file.path())?;

    let text = std::fs::read_to_string(file.path())?;
    let lines: Vec<&str> = text.lines().collect();
    let counts: Vec<usize> = lines[0]
        .split_whitespace()
        .map(|v| v.parse())
        .collect::<Result<_, _>>()?;
    assert_eq!(counts, vec![mesh.vertex_count(), mesh.triangle_count()]);

    // Header, nodes, triangles, then one component tag per triangle
    assert_eq!(lines.len(), 1 + mesh.vertex_count() + 2 * mesh.triangle_count());
    let tags: Vec<usize> = lines[lines.len() - mesh.triangle_count()..]
        .iter()
        .map(|l| l.trim().parse())
        .collect::<Result<_, _>>()?;
    assert!(tags.contains(&1) && tags.contains(&2), "both components tagged");
    assert!(tags.iter().all(|&t| t == 1 || t == 2));
    Ok(())
}

#[test]
fn test_binary_stl_preserves_area() -> Result<()> {
    let outcome = two_part_outcome()?;
    let file = NamedTempFile::with_suffix(".stl")?;
    io::export_stl_binary(&outcome.mesh, file.path())?;

    let part = io::import_stl(file.path(), ComponentKind::Solid)?;
    let area: f64 = part
        .triangles
        .iter()
        .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() * 0.5)
        .sum();

    println!("Wetted area {:.6}, re-imported {:.6}", outcome.results.total_wet_area, area);
    assert_eq!(part.triangles.len(), outcome.mesh.triangle_count());
    assert!((area - outcome.results.total_wet_area).abs() < 1e-4);
    Ok(())
}
