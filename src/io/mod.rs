// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - part readers, mesh exporters and result reports

mod gmsh;
mod model;
mod report;
mod stl;
mod tri;

pub use gmsh::export_gmsh;
pub use model::{load_directory, ModelManifest, PartEntry, TagEntry};
pub use report::{
    comp_geom_csv, comp_geom_report, mass_report, slice_report, wave_drag_report, write_json,
    write_report,
};
pub use stl::{export_stl_ascii, export_stl_binary, import_stl};
pub use tri::{export_cart3d, export_nascart};

use crate::geometry::IndexedMesh;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mesh file formats the exporters produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    StlAscii,
    StlBinary,
    Cart3d,
    Nascart,
    Gmsh,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::StlAscii,
        ExportFormat::StlBinary,
        ExportFormat::Cart3d,
        ExportFormat::Nascart,
        ExportFormat::Gmsh,
    ];

    /// File name suffix, binary STL gets its own stem so both STL flavors
    /// can sit in one directory
    pub fn file_name(self, stem: &str) -> String {
        match self {
            ExportFormat::StlAscii => format!("{}.stl", stem),
            ExportFormat::StlBinary => format!("{}_bin.stl", stem),
            ExportFormat::Cart3d => format!("{}.tri", stem),
            ExportFormat::Nascart => format!("{}.dat", stem),
            ExportFormat::Gmsh => format!("{}.msh", stem),
        }
    }

    /// Write `mesh` in this format, returns every file written
    pub fn export(self, mesh: &IndexedMesh, path: &Path) -> Result<Vec<PathBuf>> {
        match self {
            ExportFormat::StlAscii => export_stl_ascii(mesh, path).map(|_| vec![path.to_path_buf()]),
            ExportFormat::StlBinary => export_stl_binary(mesh, path).map(|_| vec![path.to_path_buf()]),
            ExportFormat::Cart3d => export_cart3d(mesh, path).map(|_| vec![path.to_path_buf()]),
            ExportFormat::Nascart => export_nascart(mesh, path),
            ExportFormat::Gmsh => export_gmsh(mesh, path).map(|_| vec![path.to_path_buf()]),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::StlAscii => "stl",
            ExportFormat::StlBinary => "stl-binary",
            ExportFormat::Cart3d => "cart3d",
            ExportFormat::Nascart => "nascart",
            ExportFormat::Gmsh => "gmsh",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "stl" | "stl-ascii" => Ok(ExportFormat::StlAscii),
            "stl-binary" | "stlb" => Ok(ExportFormat::StlBinary),
            "cart3d" | "tri" => Ok(ExportFormat::Cart3d),
            "nascart" | "dat" => Ok(ExportFormat::Nascart),
            "gmsh" | "msh" => Ok(ExportFormat::Gmsh),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_round_trip() {
        for format in ExportFormat::ALL {
            let parsed: ExportFormat = format.to_string().parse().unwrap();
            assert_eq!(parsed, format);
        }
        assert_eq!("TRI".parse::<ExportFormat>(), Ok(ExportFormat::Cart3d));
        assert!("obj".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Nascart.file_name("wing"), "wing.dat");
    }
}
