// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mass properties from tetrahedra and triangle shell elements
//!
//! Products of inertia follow the positive convention `Ixy = ∫ x y dm`.

use super::mesh::Axis;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Mass, centroid and inertia of one element about its own centroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassElement {
    /// Index of the owning component
    pub component: usize,
    pub mass: f64,
    pub volume: f64,
    pub cg: Point3<f64>,
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyz: f64,
}

impl MassElement {
    /// Build from second moments `s[j][k] = ∫ r_j r_k dm` about the centroid
    fn from_moments(component: usize, mass: f64, volume: f64, cg: Point3<f64>, s: [[f64; 3]; 3]) -> Self {
        Self {
            component,
            mass,
            volume,
            cg,
            ixx: s[1][1] + s[2][2],
            iyy: s[0][0] + s[2][2],
            izz: s[0][0] + s[1][1],
            ixy: s[0][1],
            ixz: s[0][2],
            iyz: s[1][2],
        }
    }
}

/// Second moments of a simplex with vertex offsets `r` from its centroid
fn simplex_moments(r: &[Vector3<f64>], factor: f64) -> [[f64; 3]; 3] {
    let mut s = [[0.0; 3]; 3];
    for (j, row) in s.iter_mut().enumerate() {
        for (k, value) in row.iter_mut().enumerate() {
            *value = factor * r.iter().map(|v| v[j] * v[k]).sum::<f64>();
        }
    }
    s
}

/// Solid tetrahedron of volumetric `density`
pub fn tetra_mass_props(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    density: f64,
    component: usize,
) -> MassElement {
    let volume = ((p1 - p0).dot(&(p2 - p0).cross(&(p3 - p0))) / 6.0).abs();
    let mass = density * volume;
    let cg = Point3::from((p0.coords + p1.coords + p2.coords + p3.coords) / 4.0);
    let r = [p0 - cg, p1 - cg, p2 - cg, p3 - cg];
    MassElement::from_moments(component, mass, volume, cg, simplex_moments(&r, mass / 20.0))
}

/// Triangle shell of areal density `area_density`
pub fn shell_mass_props(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    area_density: f64,
    component: usize,
) -> MassElement {
    let area = (p1 - p0).cross(&(p2 - p0)).norm() * 0.5;
    let mass = area_density * area;
    let cg = Point3::from((p0.coords + p1.coords + p2.coords) / 3.0);
    let r = [p0 - cg, p1 - cg, p2 - cg];
    MassElement::from_moments(component, mass, 0.0, cg, simplex_moments(&r, mass / 12.0))
}

/// Extrude triangle `tri` by `±half_width` along `axis` and split the prism
/// into three tetrahedra
pub fn prism_mass_props(
    tri: &[Point3<f64>; 3],
    axis: &Vector3<f64>,
    half_width: f64,
    density: f64,
    component: usize,
) -> [MassElement; 3] {
    let offset = axis * half_width;
    let [a, b, c] = tri.map(|p| p - offset);
    let [d, e, f] = tri.map(|p| p + offset);
    [
        tetra_mass_props(&a, &b, &c, &d, density, component),
        tetra_mass_props(&b, &c, &d, &e, density, component),
        tetra_mass_props(&c, &d, &e, &f, density, component),
    ]
}

/// Accumulated mass properties about the total centroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f64,
    pub volume: f64,
    pub cg: Point3<f64>,
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyz: f64,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 0.0,
            volume: 0.0,
            cg: Point3::origin(),
            ixx: 0.0,
            iyy: 0.0,
            izz: 0.0,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
        }
    }
}

impl MassProperties {
    /// Sum elements: centroid first, then inertia shifted to it
    pub fn accumulate<'a>(elements: impl IntoIterator<Item = &'a MassElement> + Clone) -> Self {
        let mut props = MassProperties::default();
        let mut moment = Vector3::zeros();
        for e in elements.clone() {
            props.mass += e.mass;
            props.volume += e.volume;
            moment += e.cg.coords * e.mass;
        }
        if props.mass <= 0.0 {
            return props;
        }
        props.cg = Point3::from(moment / props.mass);

        for e in elements {
            let d = e.cg - props.cg;
            props.ixx += e.ixx + e.mass * (d.y * d.y + d.z * d.z);
            props.iyy += e.iyy + e.mass * (d.x * d.x + d.z * d.z);
            props.izz += e.izz + e.mass * (d.x * d.x + d.y * d.y);
            props.ixy += e.ixy + e.mass * d.x * d.y;
            props.ixz += e.ixz + e.mass * d.x * d.z;
            props.iyz += e.iyz + e.mass * d.y * d.z;
        }
        props
    }

    /// Merge two bodies whose inertias are about their own centroids
    pub fn combine(&self, other: &MassProperties) -> Self {
        let mass = self.mass + other.mass;
        if mass <= 0.0 {
            return MassProperties {
                volume: self.volume + other.volume,
                ..Default::default()
            };
        }
        let cg = Point3::from((self.cg.coords * self.mass + other.cg.coords * other.mass) / mass);
        let mut props = MassProperties {
            mass,
            volume: self.volume + other.volume,
            cg,
            ..Default::default()
        };
        for part in [self, other] {
            let d = part.cg - cg;
            props.ixx += part.ixx + part.mass * (d.y * d.y + d.z * d.z);
            props.iyy += part.iyy + part.mass * (d.x * d.x + d.z * d.z);
            props.izz += part.izz + part.mass * (d.x * d.x + d.y * d.y);
            props.ixy += part.ixy + part.mass * d.x * d.y;
            props.ixz += part.ixz + part.mass * d.x * d.z;
            props.iyz += part.iyz + part.mass * d.y * d.z;
        }
        props
    }
}

/// Concentrated mass added to the totals, in caller units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMass {
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub mass: f64,
    pub cg: Point3<f64>,
    /// Inertia about its own centroid
    #[serde(default)]
    pub ixx: f64,
    #[serde(default)]
    pub iyy: f64,
    #[serde(default)]
    pub izz: f64,
    #[serde(default)]
    pub ixy: f64,
    #[serde(default)]
    pub ixz: f64,
    #[serde(default)]
    pub iyz: f64,
}

impl PointMass {
    pub fn new(name: impl Into<String>, mass: f64, cg: Point3<f64>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            mass,
            cg,
            ixx: 0.0,
            iyy: 0.0,
            izz: 0.0,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
        }
    }

    pub fn element(&self, component: usize) -> MassElement {
        MassElement {
            component,
            mass: self.mass,
            volume: 0.0,
            cg: self.cg,
            ixx: self.ixx,
            iyy: self.iyy,
            izz: self.izz,
            ixy: self.ixy,
            ixz: self.ixz,
            iyz: self.iyz,
        }
    }
}

/// Solid material up to and including one slab
///
/// Inertia is about the fill centroid. Shells and point masses are not part
/// of the fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillStation {
    /// Far edge of the slab along the slicing axis
    pub location: f64,
    pub properties: MassProperties,
}

/// Running fill over per-slab element groups, in slab order
pub fn fill_stations(slabs: &[Vec<MassElement>], start: f64, width: f64) -> Vec<FillStation> {
    let mut fill = MassProperties::default();
    slabs
        .iter()
        .enumerate()
        .map(|(s, elements)| {
            fill = fill.combine(&MassProperties::accumulate(elements.iter()));
            FillStation {
                location: start + (s + 1) as f64 * width,
                properties: fill,
            }
        })
        .collect()
}

/// Mass properties of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMass {
    pub name: String,
    pub id: String,
    pub properties: MassProperties,
}

/// Output of a mass-properties run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MassResults {
    pub components: Vec<ComponentMass>,
    pub total: MassProperties,
    /// Volume of all solid prisms
    pub solid_volume: f64,
    pub num_slices: usize,
    pub slice_width: f64,
    pub axis: Axis,
    /// Point masses included in `total`, one entry each
    pub point_masses: Vec<ComponentMass>,
    /// Cumulative solid fill, one station per slab
    pub fills: Vec<FillStation>,
}
