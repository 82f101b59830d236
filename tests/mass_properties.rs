// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mass property verification against closed-form results

use anyhow::Result;
use approx::assert_relative_eq;
use compgeom::geometry::PointMass;
use compgeom::{
    run_comp_geom, run_mass_properties, Axis, CompGeomConfig, ComponentKind, PartInput, Primitive,
};
use nalgebra::{Point3, Vector3};

fn config(slices: usize) -> CompGeomConfig {
    let mut config = CompGeomConfig::default();
    config.mass.slices = slices;
    config
}

#[test]
fn test_solid_cube_inertia() -> Result<()> {
    let density = 2.5;
    let part = PartInput::solid("block", &Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false))
        .with_density(density);
    let outcome = run_mass_properties(&[part], &config(10), None)?;
    let total = &outcome.results.total;

    println!("Unit cube, density {}:", density);
    println!("  Mass: {:.6} (expected: {:.6})", total.mass, density);
    println!("  CG: {:.6} {:.6} {:.6}", total.cg.x, total.cg.y, total.cg.z);
    println!("  Ixx/Iyy/Izz: {:.6} {:.6} {:.6}", total.ixx, total.iyy, total.izz);

    // Slabs of a box are exact prisms, so the slicing error vanishes
    let expected = density / 6.0;
    assert_relative_eq!(total.mass, density, max_relative = 1e-9);
    assert_relative_eq!(outcome.results.solid_volume, 1.0, max_relative = 1e-9);
    assert_relative_eq!(total.cg, Point3::new(0.5, 0.5, 0.5), epsilon = 1e-9);
    assert_relative_eq!(total.ixx, expected, max_relative = 1e-9);
    assert_relative_eq!(total.iyy, expected, max_relative = 1e-9);
    assert_relative_eq!(total.izz, expected, max_relative = 1e-9);
    assert!(total.ixy.abs() < 1e-9 && total.ixz.abs() < 1e-9 && total.iyz.abs() < 1e-9);
    assert_relative_eq!(outcome.results.slice_width, 0.1, max_relative = 1e-12);
    Ok(())
}

#[test]
fn test_brick_inertia_about_cg() -> Result<()> {
    // a × b × c brick: Ixx = m(b² + c²)/12
    let (a, b, c) = (4.0, 2.0, 1.0);
    let part = PartInput::solid(
        "brick",
        &Primitive::boxed(Point3::new(1.0, -3.0, 2.0), Point3::new(1.0 + a, -3.0 + b, 2.0 + c)),
    );
    let outcome = run_mass_properties(&[part], &config(8), None)?;
    let total = &outcome.results.total;
    let mass = a * b * c;

    assert_relative_eq!(total.mass, mass, max_relative = 1e-9);
    assert_relative_eq!(total.cg, Point3::new(3.0, -2.0, 2.5), epsilon = 1e-9);
    assert_relative_eq!(total.ixx, mass * (b * b + c * c) / 12.0, max_relative = 1e-9);
    assert_relative_eq!(total.iyy, mass * (a * a + c * c) / 12.0, max_relative = 1e-9);
    assert_relative_eq!(total.izz, mass * (a * a + b * b) / 12.0, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_sphere_mass_converges() -> Result<()> {
    let r = 1.0;
    let part = PartInput::solid("ball", &Primitive::sphere(Point3::origin(), r, 48, 24));
    let parts = std::slice::from_ref(&part);

    // The faceted sphere is the reference, not the analytic one
    let faceted = run_comp_geom(parts, &CompGeomConfig::default(), None)?;
    let exact_mass = faceted.results.total_theo_vol;
    let exact_i = 0.4 * exact_mass * r * r;

    let coarse = run_mass_properties(parts, &config(8), None)?;
    let fine = run_mass_properties(parts, &config(32), None)?;
    let coarse_err = (coarse.results.total.mass - exact_mass).abs();
    let fine_err = (fine.results.total.mass - exact_mass).abs();

    println!(
        "Sphere mass: coarse {:.6}, fine {:.6}, faceted volume {:.6}",
        coarse.results.total.mass, fine.results.total.mass, exact_mass
    );

    assert!(fine_err < coarse_err, "more slices did not reduce the error");
    assert_relative_eq!(fine.results.total.mass, exact_mass, max_relative = 2e-3);
    assert_relative_eq!(fine.results.total.ixx, exact_i, max_relative = 0.03);
    assert!(fine.results.total.cg.coords.norm() < 1e-3);
    Ok(())
}

#[test]
fn test_shell_cube_inertia() -> Result<()> {
    let sigma = 0.5;
    let triangles = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), true).to_triangles();
    let part = PartInput::new("skin", ComponentKind::Shell, triangles).with_density(sigma);
    let outcome = run_mass_properties(&[part], &config(4), None)?;
    let total = &outcome.results.total;

    // Six faces of mass σ: 2 × σ/6 + 4 × (σ/12 + σ/4)
    let expected = 5.0 * sigma / 3.0;
    assert_relative_eq!(total.mass, 6.0 * sigma, max_relative = 1e-9);
    assert_relative_eq!(outcome.results.solid_volume, 0.0);
    assert!(total.cg.coords.norm() < 1e-9);
    assert_relative_eq!(total.ixx, expected, max_relative = 1e-9);
    assert_relative_eq!(total.iyy, expected, max_relative = 1e-9);
    assert_relative_eq!(total.izz, expected, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_overlap_goes_to_higher_priority() -> Result<()> {
    let light = PartInput::solid("light", &Primitive::cube(Vector3::new(2.0, 1.0, 1.0), false))
        .with_density(1.0);
    let heavy = PartInput::solid(
        "heavy",
        &Primitive::boxed(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0)),
    )
    .with_density(10.0)
    .with_priority(1);

    let outcome = run_mass_properties(&[light, heavy], &config(12), None)?;
    let results = &outcome.results;
    let mass_of = |name: &str| {
        results
            .components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.properties.mass)
            .unwrap_or(0.0)
    };

    println!("light {:.6}, heavy {:.6}", mass_of("light"), mass_of("heavy"));

    // The shared unit of volume is counted once, with the heavy density
    assert_relative_eq!(results.solid_volume, 3.0, max_relative = 1e-9);
    assert_relative_eq!(mass_of("light"), 1.0, max_relative = 1e-9);
    assert_relative_eq!(mass_of("heavy"), 20.0, max_relative = 1e-9);
    assert_relative_eq!(results.total.mass, 21.0, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_open_part_keeps_its_mass() -> Result<()> {
    // Hole in the -x cap: slabs never cut it and the +x rays never reach it
    let mut triangles = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_triangles();
    triangles.remove(6);
    let part = PartInput::new("open", ComponentKind::Solid, triangles);
    let outcome = run_mass_properties(&[part], &config(10), None)?;
    let repair = &outcome.diagnostics.repair;

    println!(
        "removed {:?} kept {:?} mass {:.6}",
        repair.removed_names, repair.open_meshes_kept, outcome.results.total.mass
    );

    assert_eq!(repair.open_meshes_removed, 0);
    assert_eq!(repair.open_meshes_kept, vec!["open".to_string()]);
    assert_relative_eq!(outcome.results.total.mass, 1.0, max_relative = 1e-9);
    assert_eq!(outcome.results.components.len(), 1);
    Ok(())
}

#[test]
fn test_slab_axis_does_not_change_brick() -> Result<()> {
    let (a, b, c) = (4.0, 2.0, 1.0);
    let part = PartInput::solid(
        "brick",
        &Primitive::boxed(Point3::new(1.0, -3.0, 2.0), Point3::new(1.0 + a, -3.0 + b, 2.0 + c)),
    );
    let parts = std::slice::from_ref(&part);
    let along_x = run_mass_properties(parts, &config(8), None)?.results;

    for axis in [Axis::Y, Axis::Z] {
        let mut cfg = config(8);
        cfg.mass.axis = axis;
        let results = run_mass_properties(parts, &cfg, None)?.results;
        let extent = [a, b, c][axis.index()];

        println!("axis {}: mass {:.6}, width {:.6}", axis, results.total.mass, results.slice_width);

        assert_eq!(results.axis, axis);
        assert_relative_eq!(results.slice_width, extent / 8.0, max_relative = 1e-12);
        assert_relative_eq!(results.total.mass, along_x.total.mass, max_relative = 1e-9);
        assert_relative_eq!(results.total.cg, along_x.total.cg, epsilon = 1e-9);
        assert_relative_eq!(results.total.ixx, along_x.total.ixx, max_relative = 1e-9);
        assert_relative_eq!(results.total.iyy, along_x.total.iyy, max_relative = 1e-9);
        assert_relative_eq!(results.total.izz, along_x.total.izz, max_relative = 1e-9);
    }
    Ok(())
}

#[test]
fn test_point_mass_joins_totals() -> Result<()> {
    let part = PartInput::solid("block", &Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false));
    let mut cfg = config(10);
    cfg.mass
        .point_masses
        .push(PointMass::new("ballast", 1.0, Point3::new(3.0, 0.5, 0.5)));
    let results = run_mass_properties(&[part], &cfg, None)?.results;
    let total = &results.total;

    println!("mass {:.6}, cg {:.6} {:.6} {:.6}", total.mass, total.cg.x, total.cg.y, total.cg.z);

    // Two unit masses 2.5 apart, each 1.25 from the common centroid
    let shift = 2.0 * 1.25 * 1.25;
    assert_relative_eq!(total.mass, 2.0, max_relative = 1e-9);
    assert_relative_eq!(total.cg, Point3::new(1.75, 0.5, 0.5), epsilon = 1e-9);
    assert_relative_eq!(total.ixx, 1.0 / 6.0, max_relative = 1e-9);
    assert_relative_eq!(total.iyy, 1.0 / 6.0 + shift, max_relative = 1e-9);
    assert_relative_eq!(total.izz, 1.0 / 6.0 + shift, max_relative = 1e-9);
    assert_relative_eq!(results.solid_volume, 1.0, max_relative = 1e-9);

    assert_eq!(results.components.len(), 1);
    assert_eq!(results.point_masses.len(), 1);
    assert_eq!(results.point_masses[0].name, "ballast");
    assert_relative_eq!(results.point_masses[0].properties.mass, 1.0);

    // The fill holds solids only
    let last = results.fills.last().map(|f| f.properties.mass).unwrap_or(0.0);
    assert_relative_eq!(last, 1.0, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_fill_tracks_solid_mass() -> Result<()> {
    let n = 4;
    let density = 3.0;
    let part = PartInput::solid("block", &Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false))
        .with_density(density);
    let results = run_mass_properties(&[part], &config(n), None)?.results;
    assert_eq!(results.fills.len(), n);

    for (k, fill) in results.fills.iter().enumerate() {
        let filled = (k + 1) as f64 / n as f64;
        let p = &fill.properties;
        println!("fill {:.3}: mass {:.6} cgX {:.6}", fill.location, p.mass, p.cg.x);

        assert_relative_eq!(fill.location, filled, max_relative = 1e-9);
        assert_relative_eq!(p.volume, filled, max_relative = 1e-9);
        assert_relative_eq!(p.mass, density * filled, max_relative = 1e-9);
        assert_relative_eq!(p.cg, Point3::new(0.5 * filled, 0.5, 0.5), epsilon = 1e-9);
        // filled x 1 x 1 block about its centroid
        assert_relative_eq!(p.iyy, p.mass * (filled * filled + 1.0) / 12.0, max_relative = 1e-9);
    }

    let last = &results.fills[n - 1].properties;
    assert_relative_eq!(last.mass, results.total.mass, max_relative = 1e-12);
    assert_relative_eq!(last.ixx, results.total.ixx, max_relative = 1e-9);
    assert_relative_eq!(last.izz, results.total.izz, max_relative = 1e-9);
    Ok(())
}
