// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use compgeom::geometry::intersect::{facet_tree, intersect_pair};
use compgeom::geometry::IntersectTolerance;
use compgeom::{
    run_area_slice, run_comp_geom, run_mass_properties, CompGeomConfig, ComponentKind, PartInput,
    Primitive,
};
use nalgebra::{Point3, Vector3};

fn sphere(name: &str, center: Point3<f64>, r: f64, segments: u32) -> PartInput {
    PartInput::solid(name, &Primitive::sphere(center, r, segments, segments / 2))
}

fn sphere_and_box(segments: u32) -> Vec<PartInput> {
    vec![
        sphere("ball", Point3::origin(), 1.0, segments),
        PartInput::solid("block", &Primitive::cube(Vector3::new(1.5, 1.5, 1.5), false)),
    ]
}

fn bench_facet_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("facet_tree");

    for segments in [32u32, 64, 128] {
        let mesh = Primitive::sphere(Point3::origin(), 10.0, segments, segments / 2)
            .to_mesh("ball", ComponentKind::Solid);
        group.bench_with_input(BenchmarkId::new("sphere", segments), &mesh, |b, mesh| {
            b.iter(|| facet_tree(black_box(mesh), 1e-6));
        });
    }

    group.finish();
}

fn bench_intersect_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect_pair");
    let tol = IntersectTolerance::default();

    for segments in [32u32, 64] {
        let a = Primitive::sphere(Point3::origin(), 10.0, segments, segments / 2)
            .to_mesh("a", ComponentKind::Solid);
        let b = Primitive::sphere(Point3::new(7.0, 0.0, 0.0), 10.0, segments, segments / 2)
            .to_mesh("b", ComponentKind::Solid);
        let tree = facet_tree(&b, 1e-6);
        group.bench_with_input(BenchmarkId::new("spheres", segments), &segments, |bench, _| {
            bench.iter(|| intersect_pair(black_box(&a), black_box(&b), &tree, &tol));
        });
    }

    group.finish();
}

fn bench_comp_geom(c: &mut Criterion) {
    let mut group = c.benchmark_group("comp_geom");
    group.sample_size(10);

    for parallel in [false, true] {
        let mut config = CompGeomConfig::default();
        config.engine.parallel = parallel;
        let parts = sphere_and_box(48);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::new("sphere_box", label), &parts, |b, parts| {
            b.iter(|| run_comp_geom(black_box(parts), &config, None).unwrap());
        });
    }

    group.finish();
}

fn bench_slicing(c: &mut Criterion) {
    let mut group = c.benchmark_group("slicing");
    group.sample_size(10);
    let parts = sphere_and_box(32);

    let mut config = CompGeomConfig::default();
    config.slicing.count = 10;
    group.bench_function("area_10", |b| {
        b.iter(|| run_area_slice(black_box(&parts), &config, None).unwrap());
    });

    config.mass.slices = 10;
    group.bench_function("mass_10", |b| {
        b.iter(|| run_mass_properties(black_box(&parts), &config, None).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_facet_tree,
    bench_intersect_pair,
    bench_comp_geom,
    bench_slicing
);
criterion_main!(benches);
