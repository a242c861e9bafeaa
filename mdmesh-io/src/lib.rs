//! mdmesh-io: File I/O for mdmesh.
//!
//! This crate provides:
//! - **Legacy VTK** writing and reading of meshes with their field data
//! - **Workspace descriptions** loaded from JSON
//! - **Format sniffing** of mesh and NeXus files via memmap2
//!
#![warn(missing_docs)]

mod error;
mod sniff;
mod vtk;
mod workspace_json;

pub use error::{Error, Result};
pub use sniff::{can_read_file, identify, FileFormat};
pub use vtk::{parse_vtk, read_field_data, read_vtk, VtkWriter};
pub use workspace_json::{
    load_workspace_json, EventDescription, HistoDescription, InfoDescription,
    WorkspaceDescription,
};
