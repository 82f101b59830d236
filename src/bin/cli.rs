// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CompGeom CLI

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use compgeom::config::DEFAULT_CONFIG_FILE;
use compgeom::geometry::{Axis, ComponentKind, Primitive};
use compgeom::io::{self, ExportFormat, ModelManifest};
use compgeom::{
    check_meshes, run_area_slice, run_comp_geom, run_mass_properties, run_wave_drag, CompGeomConfig,
    PartInput,
};
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::Point3;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compgeom")]
#[command(about = "CompGeom - wetted area, volume, slicing and mass properties of mesh assemblies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./compgeom.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where the parts come from
#[derive(Args)]
struct InputArgs {
    /// STL files, each one solid part
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Model manifest listing parts, kinds and densities
    #[arg(short, long, value_name = "TOML")]
    model: Option<PathBuf>,

    /// Use every STL file under this directory
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Use the built-in demo aircraft
    #[arg(long)]
    demo: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Intersect the assembly and report wetted area and volume
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Keep only the y > 0 half of the model
        #[arg(long)]
        half: bool,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Export formats (stl, stl-binary, cart3d, nascart, gmsh)
        #[arg(short, long, value_delimiter = ',')]
        format: Vec<ExportFormat>,
    },

    /// Cross-sectional area at stations along an axis
    Slice {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long)]
        axis: Option<Axis>,

        /// Number of stations
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// First station (disables automatic bounds)
        #[arg(long, requires = "end")]
        start: Option<f64>,

        /// Last station
        #[arg(long, requires = "start")]
        end: Option<f64>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Mach-angle area distribution for wave drag
    WaveDrag {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        mach: Option<f64>,

        /// Number of stations
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Roll angles per station
        #[arg(short, long)]
        rotations: Option<usize>,

        /// Model is symmetric about y = 0
        #[arg(long)]
        symmetric: bool,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Mass, center of gravity and inertia
    Mass {
        #[command(flatten)]
        input: InputArgs,

        /// Number of slabs
        #[arg(short = 'n', long)]
        slices: Option<usize>,

        /// Slab normal: x, y or z
        #[arg(short, long)]
        axis: Option<Axis>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Report degenerate facets and open meshes without intersecting
    Check {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Write the trimmed skin in every requested format
    Export {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long, value_delimiter = ',', required = true)]
        format: Vec<ExportFormat>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the default configuration
    Config {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Config { output } => {
            CompGeomConfig::default().save(output)?;
            println!("{} {}", "Wrote".green(), output.display());
            return Ok(());
        }
        Commands::Version => {
            println!("CompGeom v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let mut config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Run {
            input,
            half,
            out,
            format,
        } => {
            config.engine.half_mesh |= half;
            apply_output(&mut config, out, format);
            run_command(&input, &config, true)
        }
        Commands::Export { input, format, out } => {
            apply_output(&mut config, out, format);
            run_command(&input, &config, false)
        }
        Commands::Slice {
            input,
            axis,
            count,
            start,
            end,
            out,
        } => {
            if let Some(axis) = axis {
                config.slicing.axis = axis;
            }
            if let Some(count) = count {
                config.slicing.count = count;
            }
            if let (Some(start), Some(end)) = (start, end) {
                config.slicing.auto_bounds = false;
                config.slicing.start = start;
                config.slicing.end = end;
            }
            apply_output(&mut config, out, Vec::new());
            slice_command(&input, &config)
        }
        Commands::WaveDrag {
            input,
            mach,
            count,
            rotations,
            symmetric,
            out,
        } => {
            if let Some(mach) = mach {
                config.slicing.mach = mach;
            }
            if let Some(count) = count {
                config.slicing.count = count;
            }
            if let Some(rotations) = rotations {
                config.slicing.rotations = rotations;
            }
            config.slicing.symmetric |= symmetric;
            apply_output(&mut config, out, Vec::new());
            wave_drag_command(&input, &config)
        }
        Commands::Mass {
            input,
            slices,
            axis,
            out,
        } => {
            if let Some(slices) = slices {
                config.mass.slices = slices;
            }
            if let Some(axis) = axis {
                config.mass.axis = axis;
            }
            apply_output(&mut config, out, Vec::new());
            mass_command(&input, &config)
        }
        Commands::Check { input } => check_command(&input, &config),
        Commands::Config { .. } | Commands::Version => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "compgeom=debug" } else { "compgeom=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<CompGeomConfig> {
    let mut config = match path {
        Some(path) => CompGeomConfig::from_file(path)?,
        None => CompGeomConfig::load()?,
    };
    if path.is_some() {
        config.apply_env_overrides();
    }
    Ok(config)
}

fn apply_output(config: &mut CompGeomConfig, out: Option<PathBuf>, formats: Vec<ExportFormat>) {
    if let Some(out) = out {
        config.output.directory = out;
    }
    if !formats.is_empty() {
        config.output.formats = formats;
    }
}

fn demo_parts() -> Vec<PartInput> {
    let fuselage = Primitive::cylinder(Point3::new(0.0, 0.0, 0.0), 10.0, 1.0, 32);
    let nose = Primitive::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, 32, 16);
    let wing = Primitive::boxed(Point3::new(3.5, -6.0, -0.15), Point3::new(6.0, 6.0, 0.15));
    let tail = Primitive::boxed(Point3::new(8.8, -0.1, 0.0), Point3::new(10.0, 0.1, 2.5));
    vec![
        PartInput::new("fuselage", ComponentKind::Solid, rotate_z_to_x(&fuselage)).with_density(0.2),
        PartInput::solid("nose", &nose).with_density(0.2),
        PartInput::solid("wing", &wing).with_density(1.5).with_priority(1),
        PartInput::solid("tail", &tail).with_density(1.0),
    ]
}

/// Cylinders are built along z; the demo fuselage runs along x
fn rotate_z_to_x(primitive: &Primitive) -> Vec<[Point3<f64>; 3]> {
    primitive
        .to_triangles()
        .into_iter()
        .map(|t| t.map(|p| Point3::new(p.z, p.y, -p.x)))
        .collect()
}

fn load_parts(input: &InputArgs, config: &CompGeomConfig) -> Result<Vec<PartInput>> {
    let density = config.mass.default_density;
    let mut parts = Vec::new();
    if input.demo {
        parts.extend(demo_parts());
    }
    if let Some(model) = &input.model {
        let manifest = ModelManifest::from_file(model)?;
        let base = model.parent().unwrap_or_else(|| Path::new("."));
        parts.extend(manifest.load_parts(base, density)?);
    }
    if let Some(dir) = &input.dir {
        parts.extend(io::load_directory(dir, density)?);
    }
    for file in &input.files {
        parts.push(io::import_stl(file, ComponentKind::Solid)?.with_density(density));
    }
    if parts.is_empty() {
        bail!("no input parts: pass STL files, --model, --dir or --demo");
    }
    Ok(parts)
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn output_dir(config: &CompGeomConfig) -> Result<PathBuf> {
    let dir = config.output.directory.clone();
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    Ok(dir)
}

fn print_rule() {
    println!("{}", "━".repeat(80).bright_black());
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("{} {}", "⚠️  Warning:".yellow().bold(), warning);
    }
}

fn run_command(input: &InputArgs, config: &CompGeomConfig, reports: bool) -> Result<()> {
    let parts = load_parts(input, config)?;
    let pb = spinner(&format!("Intersecting {} parts", parts.len()))?;
    let start = Instant::now();
    let outcome = run_comp_geom(&parts, config, None)?;
    pb.finish_with_message(format!("CompGeom done in {:.2?}", start.elapsed()));

    let dir = output_dir(config)?;
    let mut written = Vec::new();
    for format in &config.output.formats {
        let path = dir.join(format.file_name("compgeom"));
        written.extend(format.export(&outcome.mesh, &path)?);
    }
    if reports {
        let text = io::comp_geom_report(&outcome.results, &outcome.diagnostics, outcome.mesh.triangle_count());
        let path = dir.join("compgeom.txt");
        io::write_report(&path, &text)?;
        written.push(path);
        if config.output.csv {
            let path = dir.join("compgeom.csv");
            io::write_report(&path, &io::comp_geom_csv(&outcome.results, &outcome.diagnostics))?;
            written.push(path);
        }
        if config.output.json {
            let path = dir.join("compgeom.json");
            io::write_json(&path, &outcome.results)?;
            written.push(path);
        }
    }

    let r = &outcome.results;
    print_rule();
    println!("{}", "CompGeom".bold());
    print_rule();
    for c in &r.components {
        println!(
            "  {:<20} {} {:>12.4}  {} {:>12.4}",
            c.name.cyan(),
            "wet area".bright_black(),
            c.wet_area,
            "wet vol".bright_black(),
            c.wet_vol
        );
    }
    println!(
        "  {:<20} {} {:>12.4}  {} {:>12.4}",
        "Totals".bold(),
        "wet area".bright_black(),
        r.total_wet_area,
        "wet vol".bright_black(),
        r.total_wet_vol
    );
    print_warnings(&outcome.diagnostics.warnings());
    for path in written {
        println!("  {} {}", "Wrote".green(), path.display());
    }
    print_rule();
    Ok(())
}

fn slice_command(input: &InputArgs, config: &CompGeomConfig) -> Result<()> {
    let parts = load_parts(input, config)?;
    let pb = spinner(&format!("Slicing along {}", config.slicing.axis))?;
    let outcome = run_area_slice(&parts, config, None)?;
    pb.finish_with_message(format!("{} stations", outcome.results.stations.len()));

    let text = io::slice_report(&outcome.results);
    let dir = output_dir(config)?;
    io::write_report(&dir.join("slices.txt"), &text)?;
    if config.output.json {
        io::write_json(&dir.join("slices.json"), &outcome.results)?;
    }
    println!("{}", text);
    print_warnings(&outcome.diagnostics.warnings());
    Ok(())
}

fn wave_drag_command(input: &InputArgs, config: &CompGeomConfig) -> Result<()> {
    let parts = load_parts(input, config)?;
    let pb = spinner(&format!("Wave-drag slicing at Mach {}", config.slicing.mach))?;
    let outcome = run_wave_drag(&parts, config, None)?;
    pb.finish_with_message(format!("{} rotations", outcome.results.rotations.len()));

    let text = io::wave_drag_report(&outcome.results);
    let dir = output_dir(config)?;
    io::write_report(&dir.join("wave_drag.txt"), &text)?;
    if config.output.json {
        io::write_json(&dir.join("wave_drag.json"), &outcome.results)?;
    }
    println!("{}", text);
    print_warnings(&outcome.diagnostics.warnings());
    Ok(())
}

fn mass_command(input: &InputArgs, config: &CompGeomConfig) -> Result<()> {
    let parts = load_parts(input, config)?;
    let pb = spinner(&format!(
        "Mass properties with {} slices along {}",
        config.mass.slices, config.mass.axis
    ))?;
    let outcome = run_mass_properties(&parts, config, None)?;
    pb.finish_with_message(format!("Total mass {:.4}", outcome.results.total.mass));

    let text = io::mass_report(&outcome.results);
    let dir = output_dir(config)?;
    io::write_report(&dir.join("mass_props.txt"), &text)?;
    if config.output.json {
        io::write_json(&dir.join("mass_props.json"), &outcome.results)?;
    }
    println!("{}", text);
    print_warnings(&outcome.diagnostics.warnings());
    Ok(())
}

fn check_command(input: &InputArgs, config: &CompGeomConfig) -> Result<()> {
    let parts = load_parts(input, config)?;
    let report = check_meshes(&parts, config)?;

    print_rule();
    for mesh in &report.meshes {
        let status = if mesh.open_edges == 0 {
            "closed".green()
        } else {
            format!("{} open edges", mesh.open_edges).red()
        };
        println!(
            "  {:<20} {:>8} facets  {:>6} degenerate  {}",
            mesh.name.cyan(),
            mesh.facets,
            mesh.degenerate,
            status
        );
    }
    let repair = &report.repair;
    if repair.open_meshes_merged > 0 {
        println!("  {} {}", "Merged:".yellow(), repair.merged_names.join(", "));
    }
    if repair.open_meshes_removed > 0 {
        println!("  {} {}", "Would remove:".red(), repair.removed_names.join(", "));
    }
    print_rule();
    Ok(())
}
