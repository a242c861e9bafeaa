//! Geometry snapshot shared by the presenters and the field data they attach.

use crate::Result;
use mdmesh_core::{
    Dimension, GeometryXml, MDWorkspace, MetadataJson, SpecialCoordinateSystem, WorkspaceHandle,
};
use mdmesh_factories::{UnstructuredGrid, GEOMETRY_XML_FIELD, METADATA_JSON_FIELD};

/// Field data names of the X, Y and Z axis titles.
pub const AXIS_TITLE_FIELDS: [&str; 3] = ["AxisTitleForX", "AxisTitleForY", "AxisTitleForZ"];

/// Workspace metadata recorded once a presenter is set up.
#[derive(Debug, Clone)]
pub(crate) struct Geometry {
    pub(crate) workspace: WorkspaceHandle,
    pub(crate) geometry: GeometryXml,
    pub(crate) xml: String,
}

impl Geometry {
    pub(crate) fn of(workspace: WorkspaceHandle) -> Result<Self> {
        let geometry = GeometryXml::from_dimensions(workspace.dimensions())?;
        let xml = geometry.to_xml_string()?;
        Ok(Self {
            workspace,
            geometry,
            xml,
        })
    }

    pub(crate) fn time_dimension(&self) -> Option<&Dimension> {
        self.geometry.t.as_ref()
    }

    /// Lower bin edges of the time axis.
    pub(crate) fn time_step_values(&self) -> Vec<f64> {
        self.time_dimension()
            .map(|t| (0..t.n_bins()).map(|i| t.bin_boundary(i)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn instrument(&self) -> String {
        self.workspace.instrument().unwrap_or_default().to_string()
    }

    pub(crate) fn special_coordinates(&self) -> SpecialCoordinateSystem {
        self.workspace.special_coordinates()
    }

    pub(crate) fn set_axis_labels(&self, grid: &mut UnstructuredGrid) {
        let axes = [&self.geometry.x, &self.geometry.y, &self.geometry.z];
        for (field, axis) in AXIS_TITLE_FIELDS.iter().zip(axes) {
            if let Some(dim) = axis {
                grid.field_data_mut().insert(*field, dim.label());
            }
        }
    }

    /// Attaches the geometry XML, the metadata JSON and the axis titles.
    pub(crate) fn attach(&self, grid: &mut UnstructuredGrid, range: (f64, f64)) -> Result<()> {
        let json = MetadataJson::for_workspace(self.workspace.as_ref(), range.0, range.1)
            .to_json_string()?;
        let fields = grid.field_data_mut();
        fields.insert(GEOMETRY_XML_FIELD, self.xml.as_str());
        fields.insert(METADATA_JSON_FIELD, json);
        self.set_axis_labels(grid);
        Ok(())
    }
}
