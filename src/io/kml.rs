//! KML reading: placemarks with polygon geometry and a free-text description.

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use quick_xml::{Reader, events::Event};

/// One `<Placemark>` from a KML document.
#[derive(Debug, Clone)]
pub(crate) struct Placemark {
    pub name: Option<String>,
    pub description: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Reads every placemark from the KML file at `path`.
pub(crate) fn read_kml_file(path: &Path) -> Result<Vec<Placemark>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("[io::kml] Failed to read KML file: {}", path.display()))?;
    read_kml_str(&text)
        .with_context(|| format!("[io::kml] Failed to parse KML file: {}", path.display()))
}

/// Reads every placemark from a KML document held in memory.
pub(crate) fn read_kml_str(text: &str) -> Result<Vec<Placemark>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut parser = KmlParser::default();
    loop {
        let event = reader.read_event()
            .with_context(|| format!("[io::kml] malformed XML near byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => parser.start(String::from_utf8_lossy(e.local_name().as_ref()).into_owned()),
            Event::End(e) => parser.end(&String::from_utf8_lossy(e.local_name().as_ref()))
                .with_context(|| format!("[io::kml] placemark #{}", parser.placemarks.len()))?,
            Event::Text(e) => parser.text(&e.unescape()
                .with_context(|| format!("[io::kml] bad character reference near byte {}", reader.buffer_position()))?),
            Event::CData(e) => parser.text(&String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
    }

    ensure!(!parser.placemarks.is_empty(), "[io::kml] document contains no <Placemark> features");
    Ok(parser.placemarks)
}

/// Placemark under construction.
#[derive(Default)]
struct PartialPlacemark {
    name: Option<String>,
    description: Option<String>,
    polygons: Vec<Polygon<f64>>,
    exterior: Option<LineString<f64>>,
    interiors: Vec<LineString<f64>>,
}

/// Event-driven state: the open element path plus whatever placemark is being read.
#[derive(Default)]
struct KmlParser {
    open: Vec<String>,
    current: Option<PartialPlacemark>,
    coordinates: String,
    placemarks: Vec<Placemark>,
}

impl KmlParser {
    fn start(&mut self, tag: String) {
        match tag.as_str() {
            "Placemark" => self.current = Some(PartialPlacemark::default()),
            "coordinates" => self.coordinates.clear(),
            _ => {}
        }
        self.open.push(tag);
    }

    fn text(&mut self, text: &str) {
        let Some(placemark) = self.current.as_mut() else { return };
        let Some(tag) = self.open.last() else { return };
        let in_placemark = self.open.iter().rev().nth(1).is_some_and(|parent| parent == "Placemark");

        match tag.as_str() {
            "name" if in_placemark => placemark.name.get_or_insert_with(String::new).push_str(text),
            "description" if in_placemark => placemark.description.get_or_insert_with(String::new).push_str(text),
            "coordinates" => {
                self.coordinates.push_str(text);
                self.coordinates.push(' ');
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.open.pop();
        let Some(placemark) = self.current.as_mut() else { return Ok(()) };

        match tag {
            "coordinates" if inside(&self.open, "Polygon") => {
                let ring = parse_coordinates(&self.coordinates)?;
                if inside(&self.open, "innerBoundaryIs") {
                    placemark.interiors.push(ring);
                } else if inside(&self.open, "outerBoundaryIs") {
                    placemark.exterior = Some(ring);
                }
            }
            "Polygon" => {
                let Some(exterior) = placemark.exterior.take() else {
                    bail!("[io::kml] <Polygon> without <outerBoundaryIs>");
                };
                let interiors = std::mem::take(&mut placemark.interiors);
                placemark.polygons.push(Polygon::new(exterior, interiors));
            }
            "Placemark" => {
                let Some(done) = self.current.take() else { return Ok(()) };
                self.placemarks.push(Placemark {
                    name: done.name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty()),
                    description: done.description,
                    geometry: MultiPolygon(done.polygons),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

#[inline]
fn inside(open: &[String], tag: &str) -> bool { open.iter().any(|name| name == tag) }

/// Parse a whitespace-separated list of `lon,lat[,alt]` tuples into a closed ring.
fn parse_coordinates(text: &str) -> Result<LineString<f64>> {
    let mut points = text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let mut next = |axis: &str| -> Result<f64> {
                let raw = parts.next()
                    .with_context(|| format!("[io::kml] coordinate {tuple:?} has no {axis}"))?;
                raw.trim().parse::<f64>()
                    .with_context(|| format!("[io::kml] invalid {axis} in coordinate {tuple:?}"))
            };
            Ok(Coord { x: next("longitude")?, y: next("latitude")? })
        })
        .collect::<Result<Vec<_>>>()?;

    // Ensure ring is closed (first point == last point)
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }

    Ok(LineString(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
  <name>Localities</name>
  <Placemark id="1">
    <name>QLD_LOC_1</name>
    <description><![CDATA[<table><tr><td>LOCALITY</td><td>Spring Hill</td></tr></table>]]></description>
    <Polygon>
      <outerBoundaryIs><LinearRing><coordinates>
        153.0,-27.0,0 153.1,-27.0,0 153.1,-27.1,0 153.0,-27.1,0 153.0,-27.0,0
      </coordinates></LinearRing></outerBoundaryIs>
      <innerBoundaryIs><LinearRing><coordinates>
        153.04,-27.04 153.06,-27.04 153.06,-27.06
      </coordinates></LinearRing></innerBoundaryIs>
    </Polygon>
  </Placemark>
  <Placemark>
    <description>&lt;table&gt;&lt;tr&gt;&lt;td&gt;lga&lt;/td&gt;&lt;td&gt;Logan City&lt;/td&gt;&lt;/tr&gt;&lt;/table&gt;</description>
    <MultiGeometry>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>1,1 2,1 2,2 1,1</coordinates></LinearRing></outerBoundaryIs></Polygon>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>5,5 6,5 6,6 5,5</coordinates></LinearRing></outerBoundaryIs></Polygon>
    </MultiGeometry>
  </Placemark>
  <Placemark><name>No description</name></Placemark>
</Document>
</kml>"#;

    #[test]
    fn reads_polygons_holes_and_multigeometry() {
        let placemarks = read_kml_str(DOC).unwrap();
        assert_eq!(placemarks.len(), 3);

        let first = &placemarks[0];
        assert_eq!(first.name.as_deref(), Some("QLD_LOC_1"));
        assert_eq!(first.geometry.0.len(), 1);
        let polygon = &first.geometry.0[0];
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.interiors().len(), 1);
        // Open inner ring gets closed.
        assert_eq!(polygon.interiors()[0].0.len(), 4);
        assert_eq!(polygon.exterior().0[1], Coord { x: 153.1, y: -27.0 });

        assert_eq!(placemarks[1].name, None);
        assert_eq!(placemarks[1].geometry.0.len(), 2);
        assert!(placemarks[2].geometry.0.is_empty());
    }

    #[test]
    fn unwraps_cdata_and_decodes_escaped_descriptions() {
        let placemarks = read_kml_str(DOC).unwrap();
        assert_eq!(
            placemarks[0].description.as_deref(),
            Some("<table><tr><td>LOCALITY</td><td>Spring Hill</td></tr></table>"),
        );
        assert_eq!(
            placemarks[1].description.as_deref(),
            Some("<table><tr><td>lga</td><td>Logan City</td></tr></table>"),
        );
        assert!(placemarks[2].description.is_none());
    }

    #[test]
    fn comments_are_skipped_and_cdata_names_kept() {
        let doc = "<kml><Document>\
            <!-- <Placemark><name>Ghost</name></Placemark> -->\
            <Placemark><name><![CDATA[Real & Co]]></name>\
              <Polygon><outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs></Polygon>\
            </Placemark>\
        </Document></kml>";
        let placemarks = read_kml_str(doc).unwrap();
        assert_eq!(placemarks.len(), 1);
        assert_eq!(placemarks[0].name.as_deref(), Some("Real & Co"));
        assert_eq!(placemarks[0].geometry.0.len(), 1);
    }

    #[test]
    fn nested_names_do_not_replace_the_placemark_name() {
        let doc = "<kml><Placemark><name>Outer</name>\
            <ExtendedData><Data name=\"x\"><name>inner</name></Data></ExtendedData>\
        </Placemark></kml>";
        let placemarks = read_kml_str(doc).unwrap();
        assert_eq!(placemarks[0].name.as_deref(), Some("Outer"));
    }

    #[test]
    fn document_without_placemarks_is_rejected() {
        let err = read_kml_str("<kml><Document/></kml>").unwrap_err();
        assert!(err.to_string().contains("no <Placemark>"));
    }

    #[test]
    fn bad_coordinates_and_missing_outer_rings_are_rejected() {
        let bad = "<Placemark><Polygon><outerBoundaryIs><coordinates>1,x 2,2</coordinates></outerBoundaryIs></Polygon></Placemark>";
        assert!(read_kml_str(bad).is_err());

        let hollow = "<Placemark><Polygon><innerBoundaryIs><coordinates>1,1 2,2 3,1</coordinates></innerBoundaryIs></Polygon></Placemark>";
        assert!(format!("{:#}", read_kml_str(hollow).unwrap_err()).contains("outerBoundaryIs"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(read_kml_str("<kml><Placemark><name>x</Placemark></kml>").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_kml_file(Path::new("/definitely/not/here.kml")).is_err());
    }
}
