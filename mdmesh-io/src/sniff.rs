//! File format detection.
//!
//! Files are memory-mapped and inspected by signature so that large NeXus
//! files are never read in full.

use crate::vtk::VTK_HEADER;
use crate::Result;
use log::debug;
use mdmesh_core::WorkspaceKind;
use mdmesh_factories::GEOMETRY_XML_FIELD;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// HDF5 superblock signature.
const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// Formats the loaders recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Legacy VTK mesh carrying geometry metadata.
    MeshVtk,
    /// NeXus file holding an MD workspace of the given kind.
    Nexus(WorkspaceKind),
}

/// Returns true if `path` holds a mesh or workspace this crate recognises.
///
/// Never fails: unreadable files are simply not readable.
pub fn can_read_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    match identify(path) {
        Ok(format) => format.is_some(),
        Err(err) => {
            debug!("cannot inspect {}: {err}", path.display());
            false
        }
    }
}

/// Identifies the format of the file at `path`.
///
/// # Errors
/// Returns an error if the file cannot be opened or mapped.
pub fn identify<P: AsRef<Path>>(path: P) -> Result<Option<FileFormat>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
    // This is the standard safety contract for memory mapping.
    #[allow(unsafe_code)]
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = &mmap[..];

    if bytes.starts_with(VTK_HEADER.as_bytes()) {
        let field = format!("\n{GEOMETRY_XML_FIELD} ");
        return Ok(contains(bytes, field.as_bytes()).then_some(FileFormat::MeshVtk));
    }
    if has_hdf5_signature(bytes) {
        return Ok(nexus_workspace_kind(path, bytes)?.map(FileFormat::Nexus));
    }
    Ok(None)
}

/// The superblock sits at offset 0 or at a power of two from 512 on.
fn has_hdf5_signature(bytes: &[u8]) -> bool {
    std::iter::successors(Some(0usize), |&offset| {
        Some(if offset == 0 { 512 } else { offset * 2 })
    })
    .take_while(|&offset| offset + HDF5_SIGNATURE.len() <= bytes.len())
    .any(|offset| bytes[offset..].starts_with(HDF5_SIGNATURE))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Group names are stored verbatim in the file, so a byte scan finds them.
#[cfg(not(feature = "hdf5"))]
fn nexus_workspace_kind(_path: &Path, bytes: &[u8]) -> Result<Option<WorkspaceKind>> {
    Ok([WorkspaceKind::Event, WorkspaceKind::Histo]
        .into_iter()
        .find(|kind| contains(bytes, kind.to_string().as_bytes())))
}

/// Opens the file and looks for an MD workspace group under a top-level entry.
#[cfg(feature = "hdf5")]
fn nexus_workspace_kind(path: &Path, _bytes: &[u8]) -> Result<Option<WorkspaceKind>> {
    let file = hdf5::File::open(path)?;
    for entry in file.groups()? {
        for kind in [WorkspaceKind::Event, WorkspaceKind::Histo] {
            if entry.link_exists(&kind.to_string()) {
                return Ok(Some(kind));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_hdf5_signature_offsets() {
        let mut bytes = vec![0u8; 1200];
        assert!(!has_hdf5_signature(&bytes));
        bytes[512..520].copy_from_slice(HDF5_SIGNATURE);
        assert!(has_hdf5_signature(&bytes));
        assert!(has_hdf5_signature(HDF5_SIGNATURE));
        assert!(!has_hdf5_signature(&HDF5_SIGNATURE[..4]));
    }

    #[test]
    fn test_vtk_needs_geometry_field() {
        let with_field = file_with(
            b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET UNSTRUCTURED_GRID\n\
              FIELD FieldData 1\nVATES_Metadata 1 1 string\n%3C%3E\n",
        );
        assert_eq!(identify(with_field.path()).unwrap(), Some(FileFormat::MeshVtk));
        assert!(can_read_file(with_field.path()));

        let plain = file_with(b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET UNSTRUCTURED_GRID\n");
        assert!(!can_read_file(plain.path()));
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn test_nexus_group_scan() {
        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        bytes.extend_from_slice(b"MDHistoWorkspace");
        let nexus = file_with(&bytes);
        assert_eq!(
            identify(nexus.path()).unwrap(),
            Some(FileFormat::Nexus(WorkspaceKind::Histo))
        );

        let other = file_with(HDF5_SIGNATURE);
        assert!(!can_read_file(other.path()));
    }

    #[test]
    fn test_unreadable_inputs_are_rejected() {
        assert!(!can_read_file("/nonexistent/mdmesh/file.vtk"));
        assert!(!can_read_file(file_with(b"").path()));
        assert!(!can_read_file(file_with(b"{\"type\": \"MDHistoWorkspace\"}").path()));
    }
}
