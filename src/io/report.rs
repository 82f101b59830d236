// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Text, CSV and JSON result reports

use crate::engine::Diagnostics;
use crate::geometry::{CompGeomResults, MassProperties, MassResults, SliceResults, WaveDragResults};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

const RULE: &str = "-------------------------------------------------";

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "...{}...", title);
    let _ = writeln!(out, "Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
}

/// Whitespace-aligned table of areas and volumes followed by warnings
///
/// Per-component `Wet_Vol` is apportioned by wetted-area ratio (see
/// [`crate::geometry::integrate::apportion_volume`]), so two equal parts
/// overlapping by half report 0.9375 / 0.5625 rather than an even split.
pub fn comp_geom_report(results: &CompGeomResults, diagnostics: &Diagnostics, triangles: usize) -> String {
    let mut out = String::new();
    header(&mut out, "Comp Geom");
    let _ = writeln!(out, "{} Num Comps", results.components.len());
    let _ = writeln!(out, "{} Total Num Tris", triangles);
    let _ = writeln!(out);
    let _ = writeln!(out, "Theo_Area   Wet_Area   Theo_Vol    Wet_Vol  Name");
    for c in &results.components {
        let _ = writeln!(
            out,
            "{:9.3}  {:9.3}  {:9.3}  {:9.3}  {:<15}",
            c.theo_area, c.wet_area, c.theo_vol, c.wet_vol, c.name
        );
    }
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "{:9.3}  {:9.3}  {:9.3}  {:9.3}  {:<15}",
        results.total_theo_area,
        results.total_wet_area,
        results.total_theo_vol,
        results.total_wet_vol,
        "Totals"
    );
    let c = results.area_center;
    let _ = writeln!(out, "Wetted area center: {:.4} {:.4} {:.4}", c.x, c.y, c.z);

    if !results.tags.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} Num Tags", results.tags.len());
        let _ = writeln!(out, "Tag_Theo_Area  Tag_Wet_Area  Name");
        for t in &results.tags {
            let _ = writeln!(
                out,
                "{:13.3}  {:12.3}  {}_{}",
                t.theo_area, t.wet_area, t.component, t.name
            );
        }
    }

    let repair = &diagnostics.repair;
    if repair.degenerate_removed > 0 {
        let _ = writeln!(out, "WARNING: {} degenerate triangle removed", repair.degenerate_removed);
    }
    if repair.open_meshes_removed > 0 {
        let _ = writeln!(out, "WARNING: {} open meshes removed", repair.open_meshes_removed);
        for name in &repair.removed_names {
            let _ = writeln!(out, "     Removed: {}", name);
        }
    }
    if repair.open_meshes_merged > 0 {
        let _ = writeln!(out, "WARNING: {} open meshes merged", repair.open_meshes_merged);
        for name in &repair.merged_names {
            let _ = writeln!(out, "     Merged: {}", name);
        }
    }
    if diagnostics.classify.unresolved > 0 {
        let _ = writeln!(out, "WARNING: {} ambiguous rays", diagnostics.classify.unresolved);
    }
    if diagnostics.collapsed_triangles > 0 {
        let _ = writeln!(
            out,
            "WARNING: {} collapsed triangles dropped",
            diagnostics.collapsed_triangles
        );
    }
    out
}

/// Component table followed by `key,value` lines for totals and repair counters
pub fn comp_geom_csv(results: &CompGeomResults, diagnostics: &Diagnostics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name, Theo_Area, Wet_Area, Theo_Vol, Wet_Vol");
    for c in &results.components {
        let _ = writeln!(
            out,
            "{},{:.6},{:.6},{:.6},{:.6}",
            c.name, c.theo_area, c.wet_area, c.theo_vol, c.wet_vol
        );
    }
    let _ = writeln!(
        out,
        "Totals,{:.6},{:.6},{:.6},{:.6}",
        results.total_theo_area, results.total_wet_area, results.total_theo_vol, results.total_wet_vol
    );

    let repair = &diagnostics.repair;
    let _ = writeln!(out);
    let _ = writeln!(out, "Total_Theo_Area,{:.6}", results.total_theo_area);
    let _ = writeln!(out, "Total_Wet_Area,{:.6}", results.total_wet_area);
    let _ = writeln!(out, "Total_Theo_Vol,{:.6}", results.total_theo_vol);
    let _ = writeln!(out, "Total_Wet_Vol,{:.6}", results.total_wet_vol);
    let _ = writeln!(out, "Num_Degen_Tris_Removed,{}", repair.degenerate_removed);
    let _ = writeln!(out, "Num_Open_Meshes_Removed,{}", repair.open_meshes_removed);
    let _ = writeln!(out, "Num_Open_Meshes_Merged,{}", repair.open_meshes_merged);
    let _ = writeln!(out, "Meshes_Removed_Names,{}", repair.removed_names.join(";"));
    let _ = writeln!(out, "Meshes_Merged_Names,{}", repair.merged_names.join(";"));
    let _ = writeln!(out, "Num_Collapsed_Tris,{}", diagnostics.collapsed_triangles);

    if !results.tags.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Tag_Name, Tag_Theo_Area, Tag_Wet_Area");
        for t in &results.tags {
            let _ = writeln!(out, "{}_{},{:.6},{:.6}", t.component, t.name, t.theo_area, t.wet_area);
        }
    }
    out
}

fn mass_row(out: &mut String, name: &str, p: &MassProperties) {
    let _ = writeln!(
        out,
        "{:<15} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5}",
        name, p.mass, p.cg.x, p.cg.y, p.cg.z, p.ixx, p.iyy, p.izz, p.ixy, p.ixz, p.iyz
    );
}

pub fn mass_report(results: &MassResults) -> String {
    let mut out = String::new();
    header(&mut out, "Mass Properties");
    let _ = writeln!(out, "{} Num Slices", results.num_slices);
    let _ = writeln!(out, "{:.6} Slice Width", results.slice_width);
    let _ = writeln!(out, "Slice axis: {}", results.axis);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<15} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Name", "Mass", "cgX", "cgY", "cgZ", "Ixx", "Iyy", "Izz", "Ixy", "Ixz", "Iyz"
    );
    for c in results.components.iter().chain(&results.point_masses) {
        mass_row(&mut out, &c.name, &c.properties);
    }
    let _ = writeln!(out, "{}", RULE);
    mass_row(&mut out, "Totals", &results.total);
    let _ = writeln!(out, "{:.6} Solid Volume", results.solid_volume);
    if !results.point_masses.is_empty() {
        let _ = writeln!(out, "{} Num Point Masses", results.point_masses.len());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{} Num Fill Slices", results.fills.len());
    let _ = writeln!(
        out,
        "{:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Fill_Loc", "Vol", "Mass", "cgX", "cgY", "cgZ", "Ixx", "Iyy", "Izz", "Ixy", "Ixz", "Iyz"
    );
    for f in &results.fills {
        let p = &f.properties;
        let _ = writeln!(
            out,
            "{:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5} {:12.5}",
            f.location, p.volume, p.mass, p.cg.x, p.cg.y, p.cg.z, p.ixx, p.iyy, p.izz, p.ixy, p.ixz, p.iyz
        );
    }
    out
}

pub fn slice_report(results: &SliceResults) -> String {
    let mut out = String::new();
    header(&mut out, "Slice");
    let _ = writeln!(out, "{} Num Slices", results.stations.len());
    let _ = writeln!(out, "Slice axis: {}", results.axis);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>12} {:>12} {:>12} {:>12} {:>12}", "Loc", "Area", "cgX", "cgY", "cgZ");
    for s in &results.stations {
        let c = s.area_center;
        let _ = writeln!(
            out,
            "{:12.5} {:12.5} {:12.5} {:12.5} {:12.5}",
            s.location, s.area, c.x, c.y, c.z
        );
    }
    out
}

pub fn wave_drag_report(results: &WaveDragResults) -> String {
    let mut out = String::new();
    header(&mut out, "Wave Drag Slice");
    let _ = writeln!(out, "{:.4} Mach", results.mach);
    let _ = writeln!(out, "{:.4} Cut Angle (deg)", results.cut_angle);
    let _ = writeln!(out, "{} Num Rotations", results.rotations.len());
    let _ = writeln!(out);

    let mut title = format!("{:>8} {:>12}", "X_Norm", "Mean_Area");
    for r in &results.rotations {
        let _ = write!(title, " {:>12}", format!("Theta_{:.1}", r.theta.to_degrees()));
    }
    let _ = writeln!(out, "{}", title);
    for (i, x) in results.x_norm.iter().enumerate() {
        let mut row = format!("{:8.4} {:12.5}", x, results.mean_areas[i]);
        for r in &results.rotations {
            let _ = write!(row, " {:12.5}", r.areas[i]);
        }
        let _ = writeln!(out, "{}", row);
    }
    out
}

pub fn write_report(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write report: {:?}", path))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write JSON: {:?}", path))
}
