// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Facet arena representation of one assembly part
//!
//! A [`Mesh`] owns its input facets plus an arena of split children. A facet
//! is either a [`FacetState::Leaf`] used directly or [`FacetState::Split`]
//! with children that tile it. Leaves and children are the "pieces" that
//! classification and integration operate on.

use super::robust_predicates::{triangle_area, triangle_centroid, triangle_normal};
use super::BoundingBox;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }

    /// The two remaining axes in cyclic order
    pub fn others(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{}'", other)),
        }
    }
}

/// What a mesh represents in the assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Closed body with volume
    #[default]
    Solid,
    /// Zero-thickness surface
    Shell,
    /// Synthetic box removing the y < 0 half of the assembly
    HalfBox,
    /// Synthetic cutting plane
    Slice,
}

impl ComponentKind {
    /// Whether this mesh encloses volume for inside/outside tests
    pub fn encloses_volume(self) -> bool {
        matches!(self, ComponentKind::Solid | ComponentKind::HalfBox)
    }

    /// Whether this mesh is a real part (reported and integrated)
    pub fn is_physical(self) -> bool {
        matches!(self, ComponentKind::Solid | ComponentKind::Shell)
    }

    /// Whether a piece with the given interior flag is left out of wetted sums
    pub fn ignores(self, interior: bool) -> bool {
        match self {
            ComponentKind::Solid | ComponentKind::Shell => interior,
            ComponentKind::Slice => !interior,
            ComponentKind::HalfBox => true,
        }
    }
}

/// Entry of an assembly's component table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub id: String,
    pub kind: ComponentKind,
    pub density: f64,
    pub priority: i32,
}

/// Named region of one component's surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTag {
    pub name: String,
    /// Index of the component that declared the tag
    pub component: usize,
}

/// Cut accumulated on a facet during the intersection sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionEdge {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    /// Index of the mesh whose facet produced the cut
    pub mesh: usize,
}

/// Split state of an input facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum FacetState {
    #[default]
    Leaf,
    /// Indices into [`Mesh::splits`]
    Split { children: Vec<usize> },
}

/// Triangle with its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    pub corners: [Point3<f64>; 3],
    pub normal: Vector3<f64>,
    /// Index of the owning component in the assembly's component table
    pub component: usize,
    pub edges: Vec<IntersectionEdge>,
    pub state: FacetState,
    /// Meshes whose volume contains this piece, filled by classification
    pub inside: Vec<usize>,
    /// Excluded from wetted sums, filled by classification
    pub ignored: bool,
    /// Sub-surface tag: 1-based index into the assembly's tag table, 0 when untagged
    #[serde(default)]
    pub tag: usize,
}

impl Facet {
    /// Build a facet, taking the normal from the winding
    pub fn new(corners: [Point3<f64>; 3], component: usize) -> Self {
        let normal = triangle_normal(&corners[0], &corners[1], &corners[2])
            .unwrap_or_else(Vector3::zeros);
        Self::with_normal(corners, normal, component)
    }

    pub fn with_normal(corners: [Point3<f64>; 3], normal: Vector3<f64>, component: usize) -> Self {
        Self {
            corners,
            normal,
            component,
            edges: Vec::new(),
            state: FacetState::Leaf,
            inside: Vec::new(),
            ignored: false,
            tag: 0,
        }
    }

    pub fn area(&self) -> f64 {
        triangle_area(&self.corners[0], &self.corners[1], &self.corners[2])
    }

    pub fn centroid(&self) -> Point3<f64> {
        triangle_centroid(&self.corners)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.corners)
    }

    pub fn is_interior(&self) -> bool {
        !self.inside.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.state, FacetState::Leaf)
    }

    fn scale(&mut self, factor: f64) {
        for corner in &mut self.corners {
            *corner = Point3::from(corner.coords * factor);
        }
        for edge in &mut self.edges {
            edge.start = Point3::from(edge.start.coords * factor);
            edge.end = Point3::from(edge.end.coords * factor);
        }
        if factor < 0.0 {
            self.normal = -self.normal;
        }
    }
}

/// Triangulated surface of one part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    /// Stable identifier of the owning component
    pub component_id: String,
    /// Index of the owning component in the assembly's component table
    pub component: usize,
    pub kind: ComponentKind,
    /// Volumetric density for solids, areal density for shells
    pub density: f64,
    /// Higher priority wins when volumes overlap in mass properties
    pub priority: i32,
    pub facets: Vec<Facet>,
    /// Arena of split children referenced by [`FacetState::Split`]
    pub splits: Vec<Facet>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        let name = name.into();
        Self {
            component_id: name.clone(),
            name,
            component: 0,
            kind,
            density: 1.0,
            priority: 0,
            facets: Vec::new(),
            splits: Vec::new(),
        }
    }

    /// Build from corner triples, all facets owned by `component`
    pub fn from_triangles(
        name: impl Into<String>,
        kind: ComponentKind,
        component: usize,
        triangles: &[[Point3<f64>; 3]],
    ) -> Self {
        let mut mesh = Self::new(name, kind);
        mesh.component = component;
        mesh.facets = triangles
            .iter()
            .map(|corners| Facet::new(*corners, component))
            .collect();
        mesh
    }

    pub fn add_facet(&mut self, corners: [Point3<f64>; 3]) {
        self.facets.push(Facet::new(corners, self.component));
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Bounding box of all input facets
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.facets.iter().flat_map(|f| f.corners.iter()))
    }

    /// Leaves and split children, the surface actually in use
    pub fn pieces(&self) -> impl Iterator<Item = &Facet> + '_ {
        self.facets.iter().flat_map(move |facet| {
            let (parent, children): (Option<&Facet>, &[usize]) = match &facet.state {
                FacetState::Leaf => (Some(facet), &[]),
                FacetState::Split { children } => (None, children.as_slice()),
            };
            parent
                .into_iter()
                .chain(children.iter().filter_map(move |&c| self.splits.get(c)))
        })
    }

    /// Locations of every piece, usable for mutation through [`Mesh::piece_mut`]
    pub fn piece_refs(&self) -> Vec<PieceRef> {
        let mut refs = Vec::with_capacity(self.facets.len() + self.splits.len());
        for (index, facet) in self.facets.iter().enumerate() {
            match &facet.state {
                FacetState::Leaf => refs.push(PieceRef::Facet(index)),
                FacetState::Split { children } => {
                    refs.extend(children.iter().map(|&c| PieceRef::Split(c)))
                }
            }
        }
        refs
    }

    pub fn piece(&self, piece: PieceRef) -> Option<&Facet> {
        match piece {
            PieceRef::Facet(i) => self.facets.get(i),
            PieceRef::Split(i) => self.splits.get(i),
        }
    }

    pub fn piece_mut(&mut self, piece: PieceRef) -> Option<&mut Facet> {
        match piece {
            PieceRef::Facet(i) => self.facets.get_mut(i),
            PieceRef::Split(i) => self.splits.get_mut(i),
        }
    }

    /// Scale every coordinate about the origin
    pub fn scale(&mut self, factor: f64) {
        for facet in self.facets.iter_mut().chain(self.splits.iter_mut()) {
            facet.scale(factor);
        }
    }

    /// Drop intersection edges, children and classification
    pub fn reset(&mut self) {
        self.splits.clear();
        for facet in &mut self.facets {
            facet.edges.clear();
            facet.state = FacetState::Leaf;
            facet.inside.clear();
            facet.ignored = false;
        }
    }

    pub fn clear_edges(&mut self) {
        for facet in &mut self.facets {
            facet.edges.clear();
        }
    }

    /// Area of all input facets
    pub fn theoretical_area(&self) -> f64 {
        self.facets.iter().map(Facet::area).sum()
    }
}

/// Location of a piece inside a [`Mesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceRef {
    Facet(usize),
    Split(usize),
}
