//! Geometry XML: the "applied geometry" snapshot of a workspace's dimensions.
//!
//! The document maps up to four non-integrated dimensions onto the X, Y, Z
//! and T display axes. Integrated dimensions are listed after them so a
//! rebin can be replayed from the XML alone:
//!
//! ```xml
//! <DimensionSet>
//!   <XDimension ID="qx" Name="Q_x" Units="A^-1" Minimum="-2" Maximum="2" NumberOfBins="8"/>
//!   <YDimension ID="qy" Name="Q_y" Units="A^-1" Minimum="-2" Maximum="2" NumberOfBins="8"/>
//!   <Dimension ID="en" Name="Energy" Units="meV" Minimum="0" Maximum="150" NumberOfBins="1"/>
//! </DimensionSet>
//! ```

use crate::{Dimension, Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

const ROOT: &str = "DimensionSet";
const AXIS_TAGS: [&str; 4] = ["XDimension", "YDimension", "ZDimension", "TDimension"];
const INTEGRATED_TAG: &str = "Dimension";

/// Dimensions currently in effect, keyed by display axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryXml {
    /// X axis.
    pub x: Option<Dimension>,
    /// Y axis.
    pub y: Option<Dimension>,
    /// Z axis.
    pub z: Option<Dimension>,
    /// Time (fourth) axis.
    pub t: Option<Dimension>,
    /// Dimensions collapsed to a single bin.
    pub integrated: Vec<Dimension>,
}

impl GeometryXml {
    /// Maps non-integrated dimensions in order onto X, Y, Z, T.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if more than four dimensions are non-integrated.
    pub fn from_dimensions(dimensions: &[Dimension]) -> Result<Self> {
        let mut geometry = Self::default();
        let mut mapped = Vec::new();
        for dim in dimensions {
            if dim.is_integrated() {
                geometry.integrated.push(dim.clone());
            } else {
                mapped.push(dim.clone());
            }
        }
        if mapped.len() > AXIS_TAGS.len() {
            return Err(Error::Config(format!(
                "{} non-integrated dimensions cannot be mapped onto X/Y/Z/T",
                mapped.len()
            )));
        }
        let mut mapped = mapped.into_iter();
        geometry.x = mapped.next();
        geometry.y = mapped.next();
        geometry.z = mapped.next();
        geometry.t = mapped.next();
        Ok(geometry)
    }

    /// Mapped axes in X, Y, Z, T order.
    #[must_use]
    pub fn mapped(&self) -> Vec<&Dimension> {
        [&self.x, &self.y, &self.z, &self.t]
            .into_iter()
            .filter_map(Option::as_ref)
            .collect()
    }

    /// All dimensions: mapped axes first, then integrated ones.
    #[must_use]
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.mapped()
            .into_iter()
            .cloned()
            .chain(self.integrated.iter().cloned())
            .collect()
    }

    /// Returns true if a fourth (time) axis is mapped.
    #[must_use]
    pub fn has_t_dimension(&self) -> bool {
        self.t.is_some()
    }

    /// Serializes the geometry.
    ///
    /// # Errors
    /// Returns [`Error::GeometryXml`] if the writer fails.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(xml_error)?;

        let axes = [&self.x, &self.y, &self.z, &self.t];
        for (tag, dim) in AXIS_TAGS.iter().zip(axes) {
            if let Some(dim) = dim {
                writer
                    .write_event(Event::Empty(dimension_element(tag, dim)))
                    .map_err(xml_error)?;
            }
        }
        for dim in &self.integrated {
            writer
                .write_event(Event::Empty(dimension_element(INTEGRATED_TAG, dim)))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(xml_error)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::GeometryXml(e.to_string()))
    }

    /// Parses a geometry document produced by [`GeometryXml::to_xml_string`].
    ///
    /// # Errors
    /// Returns [`Error::GeometryXml`] if the document is malformed, an axis is
    /// repeated, or the X, Y, Z, T axes are not filled in order.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut geometry = Self::default();
        let mut seen_root = false;
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(element) | Event::Empty(element) => {
                    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    if !seen_root {
                        if tag != ROOT {
                            return Err(Error::GeometryXml(format!(
                                "expected <{ROOT}> root, found <{tag}>"
                            )));
                        }
                        seen_root = true;
                        continue;
                    }
                    let dim = parse_dimension(&tag, &element)?;
                    geometry.insert(&tag, dim)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(Error::GeometryXml(format!("missing <{ROOT}> root")));
        }
        geometry.check_axis_order()?;
        Ok(geometry)
    }

    fn insert(&mut self, tag: &str, dim: Dimension) -> Result<()> {
        let slot = match tag {
            "XDimension" => &mut self.x,
            "YDimension" => &mut self.y,
            "ZDimension" => &mut self.z,
            "TDimension" => &mut self.t,
            INTEGRATED_TAG => {
                self.integrated.push(dim);
                return Ok(());
            }
            other => {
                return Err(Error::GeometryXml(format!("unexpected element <{other}>")));
            }
        };
        if slot.is_some() {
            return Err(Error::GeometryXml(format!("duplicate <{tag}>")));
        }
        *slot = Some(dim);
        Ok(())
    }

    fn check_axis_order(&self) -> Result<()> {
        let present = [
            self.x.is_some(),
            self.y.is_some(),
            self.z.is_some(),
            self.t.is_some(),
        ];
        for (i, window) in present.windows(2).enumerate() {
            if window[1] && !window[0] {
                return Err(Error::GeometryXml(format!(
                    "<{}> present without <{}>",
                    AXIS_TAGS[i + 1],
                    AXIS_TAGS[i]
                )));
            }
        }
        Ok(())
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::GeometryXml(err.to_string())
}

fn dimension_element<'a>(tag: &'a str, dim: &'a Dimension) -> BytesStart<'a> {
    let minimum = dim.minimum().to_string();
    let maximum = dim.maximum().to_string();
    let n_bins = dim.n_bins().to_string();
    BytesStart::new(tag).with_attributes([
        ("ID", dim.id()),
        ("Name", dim.name()),
        ("Units", dim.units()),
        ("Minimum", minimum.as_str()),
        ("Maximum", maximum.as_str()),
        ("NumberOfBins", n_bins.as_str()),
    ])
}

fn parse_dimension(tag: &str, element: &BytesStart<'_>) -> Result<Dimension> {
    let mut id = None;
    let mut name = None;
    let mut units = None;
    let mut minimum = None;
    let mut maximum = None;
    let mut n_bins = None;

    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        match attr.key.as_ref() {
            b"ID" => id = Some(value),
            b"Name" => name = Some(value),
            b"Units" => units = Some(value),
            b"Minimum" => minimum = Some(parse_number::<f64>(tag, "Minimum", &value)?),
            b"Maximum" => maximum = Some(parse_number::<f64>(tag, "Maximum", &value)?),
            b"NumberOfBins" => n_bins = Some(parse_number::<usize>(tag, "NumberOfBins", &value)?),
            _ => {}
        }
    }

    let missing = |field: &str| Error::GeometryXml(format!("<{tag}> is missing {field}"));
    let name = name.ok_or_else(|| missing("Name"))?;
    Dimension::new(
        id.unwrap_or_else(|| name.clone()),
        name,
        units.unwrap_or_default(),
        minimum.ok_or_else(|| missing("Minimum"))?,
        maximum.ok_or_else(|| missing("Maximum"))?,
        n_bins.ok_or_else(|| missing("NumberOfBins"))?,
    )
    .map_err(|e| Error::GeometryXml(e.to_string()))
}

fn parse_number<T: std::str::FromStr>(tag: &str, field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::GeometryXml(format!("<{tag}> {field}='{value}' is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<Dimension> {
        vec![
            Dimension::new("qx", "Q_x", "A^-1", -2.0, 2.0, 8).unwrap(),
            Dimension::new("en", "Energy", "meV", 0.0, 150.0, 1).unwrap(),
            Dimension::new("qy", "Q_y", "A^-1", -1.5, 1.25, 5).unwrap(),
        ]
    }

    #[test]
    fn test_maps_non_integrated_in_order() {
        let geometry = GeometryXml::from_dimensions(&dims()).unwrap();
        assert_eq!(geometry.x.as_ref().unwrap().id(), "qx");
        assert_eq!(geometry.y.as_ref().unwrap().id(), "qy");
        assert!(geometry.z.is_none());
        assert_eq!(geometry.integrated.len(), 1);
        assert!(!geometry.has_t_dimension());
    }

    #[test]
    fn test_round_trip_keeps_integrated() {
        let geometry = GeometryXml::from_dimensions(&dims()).unwrap();
        let xml = geometry.to_xml_string().unwrap();
        assert!(xml.contains("<XDimension"));
        assert!(xml.contains("Name=\"Energy\""));
        let parsed = GeometryXml::parse(&xml).unwrap();
        assert_eq!(parsed, geometry);
    }

    #[test]
    fn test_rejects_wrong_root() {
        let err = GeometryXml::parse("<Geometry><XDimension/></Geometry>").unwrap_err();
        assert!(err.to_string().contains("DimensionSet"));
    }

    #[test]
    fn test_rejects_axis_gap() {
        let xml = r#"<DimensionSet>
            <XDimension ID="a" Name="a" Units="u" Minimum="0" Maximum="1" NumberOfBins="2"/>
            <ZDimension ID="c" Name="c" Units="u" Minimum="0" Maximum="1" NumberOfBins="2"/>
        </DimensionSet>"#;
        assert!(GeometryXml::parse(xml).is_err());
    }

    #[test]
    fn test_rejects_duplicate_axis_and_bad_numbers() {
        let duplicate = r#"<DimensionSet>
            <XDimension ID="a" Name="a" Units="u" Minimum="0" Maximum="1" NumberOfBins="2"/>
            <XDimension ID="b" Name="b" Units="u" Minimum="0" Maximum="1" NumberOfBins="2"/>
        </DimensionSet>"#;
        assert!(GeometryXml::parse(duplicate).is_err());

        let bad = r#"<DimensionSet>
            <XDimension ID="a" Name="a" Units="u" Minimum="zero" Maximum="1" NumberOfBins="2"/>
        </DimensionSet>"#;
        assert!(GeometryXml::parse(bad).is_err());
    }

    #[test]
    fn test_escapes_names() {
        let dim = Dimension::new("h", "[H,0,0] <r.l.u>", "in 1.57 A^-1", 0.0, 1.0, 3).unwrap();
        let geometry = GeometryXml::from_dimensions(&[dim]).unwrap();
        let parsed = GeometryXml::parse(&geometry.to_xml_string().unwrap()).unwrap();
        assert_eq!(parsed.x.unwrap().name(), "[H,0,0] <r.l.u>");
    }

    #[test]
    fn test_too_many_axes() {
        let dims: Vec<Dimension> = (0..5)
            .map(|i| Dimension::new(format!("d{i}"), "d", "u", 0.0, 1.0, 2).unwrap())
            .collect();
        assert!(GeometryXml::from_dimensions(&dims).is_err());
    }
}
