//! Display transform for non-orthogonal workspaces.
//!
//! Workspaces in reciprocal-lattice coordinates may have axes that are not
//! mutually orthogonal. Mesh points are computed on the orthogonal bin grid
//! and mapped through the normalised basis so the rendered cells appear
//! skewed correctly.

use mdmesh_core::MDWorkspace;
use nalgebra::{Matrix3, Vector3};

/// Linear map from bin-grid coordinates to display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewTransform {
    matrix: Matrix3<f64>,
}

impl Default for SkewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SkewTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Builds the transform from basis vectors given as rows.
    ///
    /// Each vector is normalised and becomes a column of the matrix; a
    /// zero vector keeps the corresponding unit axis.
    #[must_use]
    pub fn from_basis(basis: [[f64; 3]; 3]) -> Self {
        let columns: Vec<Vector3<f64>> = basis
            .iter()
            .enumerate()
            .map(|(axis, row)| {
                let v = Vector3::from_row_slice(row);
                v.try_normalize(f64::EPSILON)
                    .unwrap_or_else(|| Vector3::ith(axis, 1.0))
            })
            .collect();
        Self {
            matrix: Matrix3::from_columns(&columns),
        }
    }

    /// Transform for `workspace`: its skew basis when `enabled`, else identity.
    #[must_use]
    pub fn for_workspace(workspace: &dyn MDWorkspace, enabled: bool) -> Self {
        match workspace.skew_basis() {
            Some(basis) if enabled => Self::from_basis(basis),
            _ => Self::identity(),
        }
    }

    /// Returns true if the transform leaves points unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix3::identity()
    }

    /// Underlying matrix.
    #[must_use]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Maps one point.
    #[must_use]
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        if self.is_identity() {
            return point;
        }
        let p = self.matrix * Vector3::from(point);
        [p.x, p.y, p.z]
    }
}
