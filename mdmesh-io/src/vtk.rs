//! Legacy ASCII VTK unstructured grids.
//!
//! Files are laid out as:
//! ```text
//! # vtk DataFile Version 3.0
//! <title>
//! ASCII
//! DATASET UNSTRUCTURED_GRID
//! FIELD FieldData <n>
//! <name> 1 1 string
//! <percent-encoded value>
//! POINTS <n> double
//! CELLS <n> <size>
//! CELL_TYPES <n>
//! CELL_DATA <n>
//! SCALARS <name> double 1
//! LOOKUP_TABLE default
//! ```
//! String values are percent-encoded so that every value fits on one line.

use crate::{Error, Result};
use log::debug;
use mdmesh_factories::{CellKind, FieldData, UnstructuredGrid, SIGNAL_ARRAY};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// First characters of every legacy VTK file.
pub(crate) const VTK_HEADER: &str = "# vtk DataFile Version";
const VTK_VERSION: &str = "3.0";
const DEFAULT_TITLE: &str = "mdmesh unstructured grid";

/// Writer for legacy ASCII VTK files.
pub struct VtkWriter<W: Write> {
    writer: W,
    title: String,
}

impl VtkWriter<BufWriter<File>> {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Writes `grid` to a new file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write<P: AsRef<Path>>(path: P, grid: &UnstructuredGrid) -> Result<()> {
        Self::create(path)?.write_grid(grid)
    }
}

impl<W: Write> VtkWriter<W> {
    /// Wraps any byte sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Sets the title line. Line breaks are replaced by spaces.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into().replace(['\n', '\r'], " ");
        self
    }

    /// Writes the grid, its cell scalars and its field data.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if a field or scalar array has an empty
    /// name, or an I/O error if writing fails.
    pub fn write_grid(&mut self, grid: &UnstructuredGrid) -> Result<()> {
        let field_data = grid.field_data();
        let scalar_name = encode_name(grid.scalar_name())?;
        let field_names = field_data
            .iter()
            .map(|(name, _)| encode_name(name))
            .collect::<Result<Vec<_>>>()?;

        let w = &mut self.writer;
        writeln!(w, "{VTK_HEADER} {VTK_VERSION}")?;
        writeln!(w, "{}", self.title)?;
        writeln!(w, "ASCII")?;
        writeln!(w, "DATASET UNSTRUCTURED_GRID")?;

        if !field_data.is_empty() {
            writeln!(w, "FIELD FieldData {}", field_data.len())?;
            for (name, (_, value)) in field_names.iter().zip(field_data.iter()) {
                writeln!(w, "{name} 1 1 string")?;
                writeln!(w, "{}", percent_encode(value))?;
            }
        }

        writeln!(w, "POINTS {} double", grid.n_points())?;
        for p in grid.points() {
            writeln!(w, "{} {} {}", p[0], p[1], p[2])?;
        }

        let size: usize = grid.cells().iter().map(|c| c.point_ids.len() + 1).sum();
        writeln!(w, "CELLS {} {size}", grid.n_cells())?;
        for cell in grid.cells() {
            write!(w, "{}", cell.point_ids.len())?;
            for id in &cell.point_ids {
                write!(w, " {id}")?;
            }
            writeln!(w)?;
        }

        writeln!(w, "CELL_TYPES {}", grid.n_cells())?;
        for cell in grid.cells() {
            writeln!(w, "{}", cell.kind.vtk_type())?;
        }

        writeln!(w, "CELL_DATA {}", grid.n_cells())?;
        writeln!(w, "SCALARS {scalar_name} double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for value in grid.scalars() {
            writeln!(w, "{value}")?;
        }

        w.flush()?;
        debug!(
            "wrote VTK grid: {} points, {} cells, {} field arrays",
            grid.n_points(),
            grid.n_cells(),
            field_data.len()
        );
        Ok(())
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reads a grid written by [`VtkWriter`].
///
/// # Errors
/// Returns an error if the file cannot be read or is not an ASCII
/// unstructured grid.
pub fn read_vtk<P: AsRef<Path>>(path: P) -> Result<UnstructuredGrid> {
    let content = std::fs::read_to_string(path)?;
    parse_vtk(&content)
}

/// Reads only the field data of a VTK file.
///
/// # Errors
/// Same as [`read_vtk`].
pub fn read_field_data<P: AsRef<Path>>(path: P) -> Result<FieldData> {
    Ok(read_vtk(path)?.field_data().clone())
}

/// Parses the text of a legacy ASCII VTK unstructured grid.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for anything [`VtkWriter`] would not
/// produce, and [`Error::Mesh`] if the cells reference missing points.
pub fn parse_vtk(content: &str) -> Result<UnstructuredGrid> {
    let mut tokens = Tokens::new(content);
    if !tokens.line()?.starts_with(VTK_HEADER) {
        return Err(Error::InvalidFormat("missing legacy VTK header".into()));
    }
    let _title = tokens.line()?;
    let encoding = tokens.line()?.trim();
    if !encoding.eq_ignore_ascii_case("ASCII") {
        return Err(Error::InvalidFormat(format!(
            "only ASCII files are supported, found '{encoding}'"
        )));
    }
    tokens.keyword("DATASET")?;
    let dataset = tokens.expect_token("dataset type")?;
    if !dataset.eq_ignore_ascii_case("UNSTRUCTURED_GRID") {
        return Err(Error::InvalidFormat(format!(
            "expected an UNSTRUCTURED_GRID dataset, found '{dataset}'"
        )));
    }

    let mut field_data = FieldData::new();
    let mut points = Vec::new();
    let mut cells = Vec::new();
    let mut kinds = Vec::new();
    let mut scalars = None;
    while let Some(section) = tokens.token() {
        match section.to_ascii_uppercase().as_str() {
            "FIELD" => read_field(&mut tokens, &mut field_data)?,
            "POINTS" => points = read_points(&mut tokens)?,
            "CELLS" => cells = read_cells(&mut tokens)?,
            "CELL_TYPES" => kinds = read_cell_types(&mut tokens)?,
            "CELL_DATA" => scalars = Some(read_cell_scalars(&mut tokens)?),
            other => {
                return Err(Error::InvalidFormat(format!("unsupported section '{other}'")));
            }
        }
    }

    if cells.len() != kinds.len() {
        return Err(Error::InvalidFormat(format!(
            "{} cells but {} cell types",
            cells.len(),
            kinds.len()
        )));
    }
    let (name, values) = scalars.unwrap_or_else(|| (SIGNAL_ARRAY.to_string(), Vec::new()));
    if values.len() != cells.len() {
        return Err(Error::InvalidFormat(format!(
            "{} cells but {} cell scalars",
            cells.len(),
            values.len()
        )));
    }

    let mut grid = UnstructuredGrid::with_scalar_name(name);
    grid.reserve(points.len(), cells.len());
    for point in points {
        grid.push_point(point);
    }
    for ((ids, kind), scalar) in cells.into_iter().zip(kinds).zip(values) {
        grid.push_cell(kind, ids, scalar)?;
    }
    *grid.field_data_mut() = field_data;
    Ok(grid)
}

fn read_field(tokens: &mut Tokens<'_>, field_data: &mut FieldData) -> Result<()> {
    let _name = tokens.expect_token("field name")?;
    let n_arrays: usize = tokens.parse("field array count")?;
    for _ in 0..n_arrays {
        let name = percent_decode(tokens.expect_token("array name")?)?;
        let components: usize = tokens.parse("component count")?;
        let tuples: usize = tokens.parse("tuple count")?;
        let data_type = tokens.expect_token("array type")?;
        if !data_type.eq_ignore_ascii_case("string") || components * tuples != 1 {
            return Err(Error::InvalidFormat(format!(
                "field array '{name}' must hold a single string, found {components}x{tuples} {data_type}"
            )));
        }
        let value = percent_decode(tokens.line()?.trim())?;
        field_data.insert(name, value);
    }
    Ok(())
}

fn read_points(tokens: &mut Tokens<'_>) -> Result<Vec<[f64; 3]>> {
    let n: usize = tokens.parse("point count")?;
    let _data_type = tokens.expect_token("point type")?;
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        points.push([
            tokens.parse("coordinate")?,
            tokens.parse("coordinate")?,
            tokens.parse("coordinate")?,
        ]);
    }
    Ok(points)
}

fn read_cells(tokens: &mut Tokens<'_>) -> Result<Vec<Vec<usize>>> {
    let n: usize = tokens.parse("cell count")?;
    let size: usize = tokens.parse("cell list size")?;
    let mut cells = Vec::with_capacity(n);
    let mut consumed = 0;
    for _ in 0..n {
        let n_ids: usize = tokens.parse("cell point count")?;
        let ids = (0..n_ids)
            .map(|_| tokens.parse("point id"))
            .collect::<Result<Vec<usize>>>()?;
        consumed += n_ids + 1;
        cells.push(ids);
    }
    if consumed != size {
        return Err(Error::InvalidFormat(format!(
            "cell list declares {size} values, found {consumed}"
        )));
    }
    Ok(cells)
}

fn read_cell_types(tokens: &mut Tokens<'_>) -> Result<Vec<CellKind>> {
    let n: usize = tokens.parse("cell type count")?;
    (0..n)
        .map(|_| {
            let code: u8 = tokens.parse("cell type")?;
            CellKind::from_vtk_type(code)
                .ok_or_else(|| Error::InvalidFormat(format!("unsupported cell type {code}")))
        })
        .collect()
}

fn read_cell_scalars(tokens: &mut Tokens<'_>) -> Result<(String, Vec<f64>)> {
    let n: usize = tokens.parse("cell data count")?;
    tokens.keyword("SCALARS")?;
    let name = percent_decode(tokens.expect_token("scalar name")?)?;
    let _data_type = tokens.expect_token("scalar type")?;
    let next = tokens.expect_token("LOOKUP_TABLE")?;
    if !next.eq_ignore_ascii_case("LOOKUP_TABLE") {
        if next != "1" {
            return Err(Error::InvalidFormat(format!(
                "scalar array '{name}' must have one component, found {next}"
            )));
        }
        tokens.keyword("LOOKUP_TABLE")?;
    }
    let _table = tokens.expect_token("lookup table name")?;
    let values = (0..n)
        .map(|_| tokens.parse("scalar value"))
        .collect::<Result<Vec<f64>>>()?;
    Ok((name, values))
}

/// Whitespace-separated tokens, with access to whole lines for string values.
struct Tokens<'a> {
    lines: std::str::Lines<'a>,
    pending: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines(),
            pending: "".split_whitespace(),
        }
    }

    /// Next full line; the rest of the current line is discarded.
    fn line(&mut self) -> Result<&'a str> {
        self.pending = "".split_whitespace();
        self.lines
            .next()
            .ok_or_else(|| Error::InvalidFormat("unexpected end of file".into()))
    }

    fn token(&mut self) -> Option<&'a str> {
        loop {
            if let Some(token) = self.pending.next() {
                return Some(token);
            }
            self.pending = self.lines.next()?.split_whitespace();
        }
    }

    fn expect_token(&mut self, what: &str) -> Result<&'a str> {
        self.token().ok_or_else(|| {
            Error::InvalidFormat(format!("unexpected end of file reading {what}"))
        })
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.expect_token(what)?;
        token
            .parse()
            .map_err(|_| Error::InvalidFormat(format!("invalid {what} '{token}'")))
    }

    fn keyword(&mut self, expected: &str) -> Result<()> {
        let token = self.expect_token(expected)?;
        if token.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(Error::InvalidFormat(format!(
                "expected {expected}, found '{token}'"
            )))
        }
    }
}

/// Escapes whitespace, control bytes, non-ASCII bytes and `%` as `%XX`.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        if byte <= b' ' || byte >= 0x7f || byte == b'%' {
            out.push_str(&format!("%{byte:02X}"));
        } else {
            out.push(char::from(byte));
        }
    }
    out
}

/// Array names are single tokens, so an empty one cannot be read back.
fn encode_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::InvalidFormat("array names must not be empty".into()));
    }
    Ok(percent_encode(name))
}

fn percent_decode(value: &str) -> Result<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| {
                    Error::InvalidFormat(format!("bad percent escape in '{value}'"))
                })?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| Error::InvalidFormat(format!("'{value}' does not decode to UTF-8")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use mdmesh_factories::GEOMETRY_XML_FIELD;
    use tempfile::NamedTempFile;

    fn quad() -> UnstructuredGrid {
        let mut grid = UnstructuredGrid::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            grid.push_point(p);
        }
        grid.push_cell(CellKind::Quad, vec![0, 1, 2, 3], 2.5).unwrap();
        grid.field_data_mut()
            .insert(GEOMETRY_XML_FIELD, "<DimensionSet>\n  <XDimension ID=\"x\"/>\n</DimensionSet>");
        grid
    }

    #[test]
    fn test_percent_encoding() {
        assert_eq!(percent_encode("a b%\n"), "a%20b%25%0A");
        assert_eq!(percent_encode("Å"), "%C3%85");
        assert_eq!(percent_decode("a%20b%25%0A").unwrap(), "a b%\n");
        assert_eq!(percent_decode("%C3%85").unwrap(), "Å");
        assert!(percent_decode("%G1").is_err());
        assert!(percent_decode("%2").is_err());
    }

    #[test]
    fn test_write_layout() {
        let mut writer = VtkWriter::new(Vec::new());
        writer.write_grid(&quad()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.starts_with("# vtk DataFile Version 3.0\n"));
        assert!(text.contains("FIELD FieldData 1\nVATES_Metadata 1 1 string\n%3CDimensionSet%3E%0A"));
        assert!(text.contains("CELLS 1 5\n4 0 1 2 3\n"));
        assert!(text.contains("CELL_TYPES 1\n9\n"));
        assert!(text.contains("SCALARS signal double 1\nLOOKUP_TABLE default\n2.5\n"));
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let grid = quad();
        VtkWriter::write(file.path(), &grid).unwrap();
        let read = read_vtk(file.path()).unwrap();
        assert_eq!(read, grid);
        let fields = read_field_data(file.path()).unwrap();
        assert_eq!(fields.get(GEOMETRY_XML_FIELD), grid.field_data().get(GEOMETRY_XML_FIELD));
    }

    #[test]
    fn test_empty_grid_has_no_field_section() {
        let mut writer = VtkWriter::new(Vec::new()).with_title("empty\nmesh");
        writer.write_grid(&UnstructuredGrid::new()).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(!text.contains("FIELD"));
        assert!(text.contains("\nempty mesh\n"));
        let grid = parse_vtk(&text).unwrap();
        assert_eq!(grid.n_cells(), 0);
        assert!(grid.field_data().is_empty());
    }

    #[test]
    fn test_rejects_binary_and_foreign_datasets() {
        let binary = "# vtk DataFile Version 3.0\nt\nBINARY\nDATASET UNSTRUCTURED_GRID\n";
        assert!(matches!(parse_vtk(binary), Err(Error::InvalidFormat(_))));
        let polydata = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\n";
        assert!(matches!(parse_vtk(polydata), Err(Error::InvalidFormat(_))));
        assert!(matches!(parse_vtk("hello\n"), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_array_names_are_rejected() {
        let mut grid = quad();
        grid.field_data_mut().insert("", "value");
        let mut writer = VtkWriter::new(Vec::new());
        assert!(matches!(writer.write_grid(&grid), Err(Error::InvalidFormat(_))));
        // nothing is written before the names are checked
        assert!(writer.into_inner().is_empty());

        let mut grid = quad();
        grid.field_data_mut().insert("two words", "v");
        let mut writer = VtkWriter::new(Vec::new());
        writer.write_grid(&grid).unwrap();
        let read = parse_vtk(&String::from_utf8(writer.into_inner()).unwrap()).unwrap();
        assert_eq!(read.field_data().get("two words"), Some("v"));
    }

    #[test]
    fn test_rejects_dangling_point_ids() {
        let text = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET UNSTRUCTURED_GRID\n\
                    POINTS 1 double\n0 0 0\nCELLS 1 3\n2 0 5\nCELL_TYPES 1\n3\n\
                    CELL_DATA 1\nSCALARS signal double\nLOOKUP_TABLE default\n1\n";
        assert!(matches!(parse_vtk(text), Err(Error::Mesh(_))));
    }
}
