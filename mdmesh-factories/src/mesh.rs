//! Unstructured mesh produced by the builders.
//!
//! Points are shared between cells; every cell carries exactly one scalar.
//! Field data is a small ordered string map used to attach provenance
//! (geometry XML, metadata JSON, axis titles) to the mesh.

use crate::{MeshError, Result};
use serde::{Deserialize, Serialize};

/// Field-data array holding the geometry XML.
pub const GEOMETRY_XML_FIELD: &str = "VATES_Metadata";
/// Field-data array holding the metadata JSON.
pub const METADATA_JSON_FIELD: &str = "VATES_Metadata_Json";
/// Default name of the cell scalar array.
pub const SIGNAL_ARRAY: &str = "signal";

/// Cell topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Single point.
    Vertex,
    /// Segment between two points.
    Line,
    /// Quadrilateral, counter-clockwise.
    Quad,
    /// Hexahedron: bottom face counter-clockwise, then the top face.
    Hexahedron,
}

impl CellKind {
    /// Number of corner points.
    #[must_use]
    pub fn n_points(self) -> usize {
        match self {
            Self::Vertex => 1,
            Self::Line => 2,
            Self::Quad => 4,
            Self::Hexahedron => 8,
        }
    }

    /// Legacy VTK cell type code.
    #[must_use]
    pub fn vtk_type(self) -> u8 {
        match self {
            Self::Vertex => 1,
            Self::Line => 3,
            Self::Quad => 9,
            Self::Hexahedron => 12,
        }
    }

    /// Cell kind for a legacy VTK type code.
    #[must_use]
    pub fn from_vtk_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Vertex),
            3 => Some(Self::Line),
            9 => Some(Self::Quad),
            12 => Some(Self::Hexahedron),
            _ => None,
        }
    }

    /// Cell kind spanning `dims` display axes.
    #[must_use]
    pub fn for_dimensionality(dims: usize) -> Option<Self> {
        match dims {
            0 => Some(Self::Vertex),
            1 => Some(Self::Line),
            2 => Some(Self::Quad),
            3 => Some(Self::Hexahedron),
            _ => None,
        }
    }
}

/// One cell: its kind and the ids of its corner points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Topology.
    pub kind: CellKind,
    /// Corner point ids in VTK order.
    pub point_ids: Vec<usize>,
}

/// Ordered name → string map attached to a mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldData {
    arrays: Vec<(String, String)>,
}

impl FieldData {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an existing array in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.arrays.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.arrays.push((name, value)),
        }
    }

    /// Value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.arrays
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Arrays in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.arrays.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of arrays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns true if no array is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

/// Axis-aligned box used to clip a mesh for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipBox {
    /// Lower corner.
    pub min: [f64; 3],
    /// Upper corner.
    pub max: [f64; 3],
}

impl ClipBox {
    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        Self {
            min: std::array::from_fn(|k| a[k].min(b[k])),
            max: std::array::from_fn(|k| a[k].max(b[k])),
        }
    }

    /// Returns true if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: &[f64; 3]) -> bool {
        (0..3).all(|k| point[k] >= self.min[k] && point[k] <= self.max[k])
    }
}

/// Mesh of shared points and scalar-carrying cells.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredGrid {
    points: Vec<[f64; 3]>,
    cells: Vec<Cell>,
    scalar_name: String,
    scalars: Vec<f64>,
    field_data: FieldData,
}

impl Default for UnstructuredGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl UnstructuredGrid {
    /// Creates an empty grid whose scalars are called `signal`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scalar_name(SIGNAL_ARRAY)
    }

    /// Creates an empty grid with a custom scalar array name.
    pub fn with_scalar_name(name: impl Into<String>) -> Self {
        Self {
            points: Vec::new(),
            cells: Vec::new(),
            scalar_name: name.into(),
            scalars: Vec::new(),
            field_data: FieldData::new(),
        }
    }

    /// Reserves room for `points` points and `cells` cells.
    pub fn reserve(&mut self, points: usize, cells: usize) {
        self.points.reserve(points);
        self.cells.reserve(cells);
        self.scalars.reserve(cells);
    }

    /// Appends a point and returns its id.
    pub fn push_point(&mut self, point: [f64; 3]) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Appends a cell with its scalar.
    ///
    /// # Errors
    /// Returns [`MeshError::InvalidCell`] if the number of ids does not match
    /// the kind or an id is out of range.
    pub fn push_cell(&mut self, kind: CellKind, point_ids: Vec<usize>, scalar: f64) -> Result<()> {
        if point_ids.len() != kind.n_points() {
            return Err(MeshError::InvalidCell(format!(
                "{kind:?} needs {} points, got {}",
                kind.n_points(),
                point_ids.len()
            )));
        }
        if let Some(&bad) = point_ids.iter().find(|&&id| id >= self.points.len()) {
            return Err(MeshError::InvalidCell(format!(
                "point id {bad} out of range for {} points",
                self.points.len()
            )));
        }
        self.cells.push(Cell { kind, point_ids });
        self.scalars.push(scalar);
        Ok(())
    }

    /// Number of points.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// All points.
    #[must_use]
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// All cells.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell `index`.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Name of the cell scalar array.
    #[must_use]
    pub fn scalar_name(&self) -> &str {
        &self.scalar_name
    }

    /// Per-cell scalars.
    #[must_use]
    pub fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    /// `(min, max)` of the finite cell scalars.
    #[must_use]
    pub fn scalar_range(&self) -> Option<(f64, f64)> {
        self.scalars
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(None, |range, s| match range {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }

    /// Attached field data.
    #[must_use]
    pub fn field_data(&self) -> &FieldData {
        &self.field_data
    }

    /// Mutable field data.
    pub fn field_data_mut(&mut self) -> &mut FieldData {
        &mut self.field_data
    }

    /// Copy of the grid keeping only cells entirely inside `clip`.
    ///
    /// Points no kept cell uses are dropped and the rest renumbered; field
    /// data is carried over.
    #[must_use]
    pub fn clip(&self, clip: &ClipBox) -> Self {
        let mut remap = vec![None; self.points.len()];
        let mut out = Self::with_scalar_name(self.scalar_name.clone());
        out.field_data = self.field_data.clone();

        for (cell, &scalar) in self.cells.iter().zip(&self.scalars) {
            if !cell.point_ids.iter().all(|&id| clip.contains(&self.points[id])) {
                continue;
            }
            let ids = cell
                .point_ids
                .iter()
                .map(|&id| *remap[id].get_or_insert_with(|| out.push_point(self.points[id])))
                .collect();
            out.cells.push(Cell {
                kind: cell.kind,
                point_ids: ids,
            });
            out.scalars.push(scalar);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    fn two_quads() -> UnstructuredGrid {
        let mut grid = UnstructuredGrid::new();
        for y in 0..2 {
            for x in 0..3 {
                grid.push_point([f64::from(x), f64::from(y), 0.0]);
            }
        }
        grid.push_cell(CellKind::Quad, vec![0, 1, 4, 3], 1.0).unwrap();
        grid.push_cell(CellKind::Quad, vec![1, 2, 5, 4], 3.0).unwrap();
        grid
    }

    #[test]
    fn test_vtk_codes_round_trip() {
        for kind in [
            CellKind::Vertex,
            CellKind::Line,
            CellKind::Quad,
            CellKind::Hexahedron,
        ] {
            assert_eq!(CellKind::from_vtk_type(kind.vtk_type()), Some(kind));
        }
        assert_eq!(CellKind::from_vtk_type(42), None);
    }

    #[test]
    fn test_push_cell_validates() {
        let mut grid = two_quads();
        assert!(grid.push_cell(CellKind::Line, vec![0], 1.0).is_err());
        assert!(grid.push_cell(CellKind::Line, vec![0, 6], 1.0).is_err());
        assert_eq!(grid.n_cells(), 2);
        assert_eq!(grid.scalar_range(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_clip_compacts_points() {
        let mut grid = two_quads();
        grid.field_data_mut().insert(GEOMETRY_XML_FIELD, "<DimensionSet/>");
        let clipped = grid.clip(&ClipBox::new([1.0, 1.0, 1.0], [0.0, 0.0, -1.0]));
        assert_eq!(clipped.n_cells(), 1);
        assert_eq!(clipped.n_points(), 4);
        assert_eq!(clipped.scalars(), &[1.0]);
        assert_eq!(clipped.cell(0).unwrap().point_ids, vec![0, 1, 2, 3]);
        assert_eq!(
            clipped.field_data().get(GEOMETRY_XML_FIELD),
            Some("<DimensionSet/>")
        );
    }

    #[test]
    fn test_field_data_replaces_in_place() {
        let mut fields = FieldData::new();
        fields.insert("a", "1");
        fields.insert("b", "2");
        fields.insert("a", "3");
        let collected: Vec<_> = fields.iter().collect();
        assert_eq!(collected, vec![("a", "3"), ("b", "2")]);
    }
}
