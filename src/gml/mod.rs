//! GML geometry, envelope and time object grammars.
//!
//! Each wire revision embeds its own GML flavour:
//!
//! | dialect | namespace                         | positions                   | envelope |
//! |---------|-----------------------------------|-----------------------------|----------|
//! | GML 2   | `http://www.opengis.net/gml`      | `coordinates` (`x,y x,y`)   | `Box`    |
//! | GML 3.1 | `http://www.opengis.net/gml`      | `pos` / `posList` (`x y`)   | `Envelope` |
//! | GML 3.2 | `http://www.opengis.net/gml/3.2`  | `pos` / `posList`, `gml:id` | `Envelope` |
//!
//! Readers are lenient and accept any position encoding in any dialect.

mod coords;

use geo_types::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::Serialize;

use crate::crs::Crs;
use crate::error::{FilterError, Result};
use crate::model::{Envelope, GeometryLiteral, Literal};
use crate::tree::Element;

pub use coords::{format_coordinates, format_pos_list, parse_coordinates, parse_pos_list};

pub const GML_NS: &str = "http://www.opengis.net/gml";
pub const GML32_NS: &str = "http://www.opengis.net/gml/3.2";

/// GML flavour embedded by a wire revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GmlDialect {
    Gml2,
    Gml31,
    Gml32,
}

impl GmlDialect {
    pub fn namespace(self) -> &'static str {
        match self {
            GmlDialect::Gml2 | GmlDialect::Gml31 => GML_NS,
            GmlDialect::Gml32 => GML32_NS,
        }
    }

    fn envelope_name(self) -> &'static str {
        match self {
            GmlDialect::Gml2 => "Box",
            GmlDialect::Gml31 | GmlDialect::Gml32 => "Envelope",
        }
    }

    fn multi_curve(self) -> (&'static str, &'static str) {
        match self {
            GmlDialect::Gml2 => ("MultiLineString", "lineStringMember"),
            GmlDialect::Gml31 | GmlDialect::Gml32 => ("MultiCurve", "curveMember"),
        }
    }

    fn multi_surface(self) -> (&'static str, &'static str) {
        match self {
            GmlDialect::Gml2 => ("MultiPolygon", "polygonMember"),
            GmlDialect::Gml31 | GmlDialect::Gml32 => ("MultiSurface", "surfaceMember"),
        }
    }

    /// Geometry element names this dialect writes, qualified with `gml:`.
    pub fn geometry_operands(self) -> Vec<String> {
        let (curves, _) = self.multi_curve();
        let (surfaces, _) = self.multi_surface();
        [
            self.envelope_name(),
            "Point",
            "LineString",
            "Polygon",
            "MultiPoint",
            curves,
            surfaces,
            "MultiGeometry",
        ]
        .iter()
        .map(|name| format!("gml:{}", name))
        .collect()
    }

    pub fn has_time_objects(self) -> bool {
        !matches!(self, GmlDialect::Gml2)
    }
}

/// Hands out `gml:id` values within a single encode call.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: usize,
}

impl IdGenerator {
    pub fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}{}", prefix, self.next)
    }
}

fn with_gml_id(dialect: GmlDialect, element: Element, prefix: &str, ids: &mut IdGenerator) -> Element {
    match dialect {
        GmlDialect::Gml32 => element.with_ns_attr(GML32_NS, "id", ids.next_id(prefix)),
        GmlDialect::Gml2 | GmlDialect::Gml31 => element,
    }
}

fn with_srs_name(element: Element, srs_name: Option<&str>) -> Element {
    match srs_name {
        Some(name) => element.with_attr("srsName", name),
        None => element,
    }
}

/// Write a geometry in the dialect's grammar.
pub fn write_geometry(
    dialect: GmlDialect,
    geometry: &Geometry<f64>,
    srs_name: Option<&str>,
    ids: &mut IdGenerator,
) -> Element {
    with_srs_name(geometry_element(dialect, geometry, ids), srs_name)
}

fn geometry_element(dialect: GmlDialect, geometry: &Geometry<f64>, ids: &mut IdGenerator) -> Element {
    let ns = dialect.namespace();
    let element = match geometry {
        Geometry::Point(point) => Element::new(ns, "Point").with_child(position(dialect, point.0)),
        Geometry::Line(line) => line_string(dialect, &[line.start, line.end]),
        Geometry::LineString(line) => line_string(dialect, &line.0),
        Geometry::Polygon(polygon) => polygon_element(dialect, polygon),
        Geometry::Rect(rect) => polygon_element(dialect, &rect.to_polygon()),
        Geometry::Triangle(triangle) => polygon_element(dialect, &triangle.to_polygon()),
        Geometry::MultiPoint(points) => {
            let members = points
                .0
                .iter()
                .map(|p| geometry_element(dialect, &Geometry::Point(*p), ids))
                .collect::<Vec<_>>();
            multi(dialect, ("MultiPoint", "pointMember"), members)
        }
        Geometry::MultiLineString(lines) => {
            let members = lines
                .0
                .iter()
                .map(|l| geometry_element(dialect, &Geometry::LineString(l.clone()), ids))
                .collect::<Vec<_>>();
            multi(dialect, dialect.multi_curve(), members)
        }
        Geometry::MultiPolygon(polygons) => {
            let members = polygons
                .0
                .iter()
                .map(|p| geometry_element(dialect, &Geometry::Polygon(p.clone()), ids))
                .collect::<Vec<_>>();
            multi(dialect, dialect.multi_surface(), members)
        }
        Geometry::GeometryCollection(collection) => {
            let members = collection
                .0
                .iter()
                .map(|g| geometry_element(dialect, g, ids))
                .collect::<Vec<_>>();
            multi(dialect, ("MultiGeometry", "geometryMember"), members)
        }
    };
    with_gml_id(dialect, element, "geom", ids)
}

fn position(dialect: GmlDialect, coord: Coord<f64>) -> Element {
    let ns = dialect.namespace();
    match dialect {
        GmlDialect::Gml2 => Element::new(ns, "coordinates").with_text(format_coordinates(&[coord])),
        GmlDialect::Gml31 | GmlDialect::Gml32 => Element::new(ns, "pos").with_text(format_pos_list(&[coord])),
    }
}

fn position_list(dialect: GmlDialect, coords: &[Coord<f64>]) -> Element {
    let ns = dialect.namespace();
    match dialect {
        GmlDialect::Gml2 => Element::new(ns, "coordinates").with_text(format_coordinates(coords)),
        GmlDialect::Gml31 | GmlDialect::Gml32 => Element::new(ns, "posList").with_text(format_pos_list(coords)),
    }
}

fn line_string(dialect: GmlDialect, coords: &[Coord<f64>]) -> Element {
    Element::new(dialect.namespace(), "LineString").with_child(position_list(dialect, coords))
}

fn ring(dialect: GmlDialect, wrapper: &str, ring: &LineString<f64>) -> Element {
    let ns = dialect.namespace();
    Element::new(ns, wrapper).with_child(Element::new(ns, "LinearRing").with_child(position_list(dialect, &ring.0)))
}

fn polygon_element(dialect: GmlDialect, polygon: &Polygon<f64>) -> Element {
    let (outer, inner) = match dialect {
        GmlDialect::Gml2 => ("outerBoundaryIs", "innerBoundaryIs"),
        GmlDialect::Gml31 | GmlDialect::Gml32 => ("exterior", "interior"),
    };
    Element::new(dialect.namespace(), "Polygon")
        .with_child(ring(dialect, outer, polygon.exterior()))
        .with_children(polygon.interiors().iter().map(|r| ring(dialect, inner, r)))
}

fn multi(dialect: GmlDialect, (name, member): (&str, &str), members: Vec<Element>) -> Element {
    let ns = dialect.namespace();
    Element::new(ns, name).with_children(
        members
            .into_iter()
            .map(|m| Element::new(ns, member).with_child(m)),
    )
}

/// Write a 2D envelope (`Box` in GML 2, `Envelope` otherwise).
pub fn write_envelope(dialect: GmlDialect, lower: [f64; 2], upper: [f64; 2], srs_name: Option<&str>) -> Element {
    let ns = dialect.namespace();
    let lower_coord = Coord { x: lower[0], y: lower[1] };
    let upper_coord = Coord { x: upper[0], y: upper[1] };
    let element = match dialect {
        GmlDialect::Gml2 => Element::new(ns, "Box").with_child(
            Element::new(ns, "coordinates").with_text(format_coordinates(&[lower_coord, upper_coord])),
        ),
        GmlDialect::Gml31 | GmlDialect::Gml32 => Element::new(ns, "Envelope")
            .with_child(Element::new(ns, "lowerCorner").with_text(format_pos_list(&[lower_coord])))
            .with_child(Element::new(ns, "upperCorner").with_text(format_pos_list(&[upper_coord]))),
    };
    with_srs_name(element, srs_name)
}

/// Write a GML time instant or period. Other literals are rejected.
pub fn write_time(dialect: GmlDialect, literal: &Literal, ids: &mut IdGenerator) -> Result<Element> {
    let ns = dialect.namespace();
    match literal {
        Literal::Instant(position) => {
            let element = Element::new(ns, "TimeInstant")
                .with_child(Element::new(ns, "timePosition").with_text(position.clone()));
            Ok(with_gml_id(dialect, element, "t", ids))
        }
        Literal::Period { begin, end } => {
            let element = Element::new(ns, "TimePeriod")
                .with_child(Element::new(ns, "beginPosition").with_text(begin.clone()))
                .with_child(Element::new(ns, "endPosition").with_text(end.clone()));
            Ok(with_gml_id(dialect, element, "t", ids))
        }
        other => Err(FilterError::InvalidFilter(format!(
            "{:?} is not a time object",
            other
        ))),
    }
}

pub fn is_envelope(dialect: GmlDialect, element: &Element) -> bool {
    element.in_namespace(dialect.namespace()) && matches!(element.name.as_str(), "Box" | "Envelope")
}

pub fn is_time(dialect: GmlDialect, element: &Element) -> bool {
    element.in_namespace(dialect.namespace()) && matches!(element.name.as_str(), "TimeInstant" | "TimePeriod")
}

pub fn is_geometry(dialect: GmlDialect, element: &Element) -> bool {
    element.in_namespace(dialect.namespace()) && !is_envelope(dialect, element) && !is_time(dialect, element)
}

fn srs_of(element: &Element) -> Option<Crs> {
    element.attr("srsName").map(Crs::parse)
}

/// Read a geometry with the CRS named by its `srsName`.
pub fn read_geometry(dialect: GmlDialect, element: &Element) -> Result<GeometryLiteral> {
    Ok(GeometryLiteral {
        geometry: parse_geometry(dialect, element)?,
        crs: srs_of(element),
    })
}

fn parse_geometry(dialect: GmlDialect, element: &Element) -> Result<Geometry<f64>> {
    let ns = dialect.namespace();
    if !element.in_namespace(ns) {
        return Err(FilterError::malformed(format!(
            "expected a geometry in {}, found '{}'",
            ns, element.name
        )));
    }
    let geometry = match element.name.as_str() {
        "Point" => {
            let coords = read_coords(element)?;
            match coords.as_slice() {
                [coord] => Geometry::Point(Point(*coord)),
                _ => {
                    return Err(FilterError::malformed(format!(
                        "Point has {} positions",
                        coords.len()
                    )));
                }
            }
        }
        "LineString" => Geometry::LineString(LineString(read_coords(element)?)),
        "Polygon" => Geometry::Polygon(read_polygon(ns, element)?),
        "MultiPoint" => {
            let points = members(dialect, element, &["pointMember", "pointMembers"])?
                .into_iter()
                .map(|g| match g {
                    Geometry::Point(p) => Ok(p),
                    _ => Err(FilterError::malformed("MultiPoint member is not a Point")),
                })
                .collect::<Result<Vec<_>>>()?;
            Geometry::MultiPoint(MultiPoint(points))
        }
        "MultiLineString" | "MultiCurve" => {
            let lines = members(dialect, element, &["lineStringMember", "curveMember", "curveMembers"])?
                .into_iter()
                .map(|g| match g {
                    Geometry::LineString(l) => Ok(l),
                    _ => Err(FilterError::malformed("curve member is not a LineString")),
                })
                .collect::<Result<Vec<_>>>()?;
            Geometry::MultiLineString(MultiLineString(lines))
        }
        "MultiPolygon" | "MultiSurface" => {
            let polygons = members(dialect, element, &["polygonMember", "surfaceMember", "surfaceMembers"])?
                .into_iter()
                .map(|g| match g {
                    Geometry::Polygon(p) => Ok(p),
                    _ => Err(FilterError::malformed("surface member is not a Polygon")),
                })
                .collect::<Result<Vec<_>>>()?;
            Geometry::MultiPolygon(MultiPolygon(polygons))
        }
        "MultiGeometry" => Geometry::GeometryCollection(GeometryCollection(members(
            dialect,
            element,
            &["geometryMember", "geometryMembers"],
        )?)),
        other => {
            return Err(FilterError::malformed(format!("unsupported geometry type '{}'", other)));
        }
    };
    Ok(geometry)
}

fn members(dialect: GmlDialect, element: &Element, names: &[&str]) -> Result<Vec<Geometry<f64>>> {
    element
        .children
        .iter()
        .filter(|c| c.in_namespace(dialect.namespace()) && names.contains(&c.name.as_str()))
        .flat_map(|member| member.children.iter())
        .map(|g| parse_geometry(dialect, g))
        .collect()
}

fn read_polygon(ns: &str, element: &Element) -> Result<Polygon<f64>> {
    let ring_of = |wrapper: &Element| -> Result<LineString<f64>> {
        let ring = wrapper
            .child(ns, "LinearRing")
            .ok_or_else(|| FilterError::malformed(format!("{} without LinearRing", wrapper.name)))?;
        Ok(LineString(read_coords(ring)?))
    };

    let exterior = element
        .children
        .iter()
        .find(|c| c.in_namespace(ns) && matches!(c.name.as_str(), "exterior" | "outerBoundaryIs"))
        .ok_or_else(|| FilterError::malformed("Polygon without exterior ring"))?;
    let interiors = element
        .children
        .iter()
        .filter(|c| c.in_namespace(ns) && matches!(c.name.as_str(), "interior" | "innerBoundaryIs"))
        .map(&ring_of)
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(ring_of(exterior)?, interiors))
}

/// Positions of a Point, LineString, LinearRing or Box in any encoding.
fn read_coords(element: &Element) -> Result<Vec<Coord<f64>>> {
    let ns = element.namespace.as_deref().unwrap_or_default();

    if let Some(list) = element.child(ns, "posList") {
        let dimension = list
            .attr("srsDimension")
            .or_else(|| element.attr("srsDimension"))
            .map(|d| d.trim().parse::<usize>())
            .transpose()
            .map_err(|_| FilterError::malformed("invalid srsDimension"))?
            .unwrap_or(2);
        return parse_pos_list(list.text(), dimension);
    }

    let positions: Vec<&Element> = element.children_named(ns, "pos").collect();
    if !positions.is_empty() {
        return positions
            .into_iter()
            .map(|pos| {
                let values = coords::parse_ordinates(pos.text())?;
                match values.as_slice() {
                    [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                    _ => Err(FilterError::malformed("pos needs at least two ordinates")),
                }
            })
            .collect();
    }

    if let Some(coordinates) = element.child(ns, "coordinates") {
        return parse_coordinates(
            coordinates.text(),
            coordinates.attr("decimal").unwrap_or("."),
            coordinates.attr("cs").unwrap_or(","),
            coordinates.attr("ts").unwrap_or(" "),
        );
    }

    let coords: Vec<&Element> = element.children_named(ns, "coord").collect();
    if !coords.is_empty() {
        return coords
            .into_iter()
            .map(|coord| {
                let axis = |name: &str| -> Result<f64> {
                    let value = coord
                        .child(ns, name)
                        .ok_or_else(|| FilterError::malformed(format!("coord without {}", name)))?;
                    crate::utils::parse_decimal(value.text())
                        .ok_or_else(|| FilterError::malformed(format!("invalid {} value", name)))
                };
                Ok(Coord { x: axis("X")?, y: axis("Y")? })
            })
            .collect();
    }

    Err(FilterError::malformed(format!("{} has no positions", element.name)))
}

/// Read a `Box` or `Envelope` into an n-dimensional envelope.
pub fn read_envelope(dialect: GmlDialect, element: &Element) -> Result<Envelope> {
    let ns = dialect.namespace();
    if !is_envelope(dialect, element) {
        return Err(FilterError::malformed(format!(
            "expected Box or Envelope, found '{}'",
            element.name
        )));
    }
    let crs = srs_of(element);

    if let (Some(lower), Some(upper)) = (element.child(ns, "lowerCorner"), element.child(ns, "upperCorner")) {
        let lower = coords::parse_ordinates(lower.text())?;
        let upper = coords::parse_ordinates(upper.text())?;
        if lower.len() != upper.len() || lower.len() < 2 {
            return Err(FilterError::malformed("envelope corners have mismatched dimensions"));
        }
        return Ok(Envelope::new(lower, upper, crs));
    }

    let corners = read_coords(element)?;
    match corners.as_slice() {
        [lower, upper] => Ok(Envelope::from_extent(lower.x, lower.y, upper.x, upper.y, crs)),
        _ => Err(FilterError::malformed(format!(
            "{} needs exactly two corners, found {}",
            element.name,
            corners.len()
        ))),
    }
}

/// Read a `TimeInstant` or `TimePeriod` literal.
pub fn read_time(dialect: GmlDialect, element: &Element) -> Result<Literal> {
    let ns = dialect.namespace();
    let instant_position = |instant: &Element| -> Result<String> {
        instant
            .child(ns, "timePosition")
            .map(|p| p.text().trim().to_string())
            .ok_or_else(|| FilterError::malformed("TimeInstant without timePosition"))
    };

    match element.name.as_str() {
        "TimeInstant" if element.in_namespace(ns) => Ok(Literal::Instant(instant_position(element)?)),
        "TimePeriod" if element.in_namespace(ns) => {
            let bound = |position: &str, wrapper: &str| -> Result<String> {
                if let Some(p) = element.child(ns, position) {
                    return Ok(p.text().trim().to_string());
                }
                let instant = element
                    .child(ns, wrapper)
                    .and_then(|w| w.child(ns, "TimeInstant"))
                    .ok_or_else(|| FilterError::malformed(format!("TimePeriod without {}", position)))?;
                instant_position(instant)
            };
            Ok(Literal::Period {
                begin: bound("beginPosition", "begin")?,
                end: bound("endPosition", "end")?,
            })
        }
        other => Err(FilterError::malformed(format!("'{}' is not a time object", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};

    fn round_trip(dialect: GmlDialect, geometry: Geometry<f64>) -> Geometry<f64> {
        let mut ids = IdGenerator::default();
        let element = write_geometry(dialect, &geometry, Some("EPSG:4326"), &mut ids);
        let literal = read_geometry(dialect, &element).unwrap();
        assert_eq!(literal.crs, Some(Crs::epsg(4326)));
        literal.geometry
    }

    #[test]
    fn writes_gml2_point_with_coordinates() {
        let mut ids = IdGenerator::default();
        let geometry: Geometry<f64> = point!(x: 1.5, y: 2.0).into();
        let element = write_geometry(GmlDialect::Gml2, &geometry, None, &mut ids);
        assert!(element.is(GML_NS, "Point"));
        assert_eq!(element.child(GML_NS, "coordinates").map(Element::text), Some("1.5,2"));
        assert_eq!(element.attr("srsName"), None);
    }

    #[test]
    fn writes_gml32_ids() {
        let mut ids = IdGenerator::default();
        let geometry: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        let element = write_geometry(GmlDialect::Gml32, &geometry, None, &mut ids);
        assert_eq!(element.ns_attr(GML32_NS, "id"), Some("geom1"));
        assert_eq!(element.child(GML32_NS, "posList").map(Element::text), Some("0 0 1 1"));
    }

    #[test]
    fn geometries_round_trip_in_every_dialect() {
        let polygon: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]
        .into();
        let multi: Geometry<f64> = MultiPoint(vec![point!(x: 1.0, y: 2.0), point!(x: 3.0, y: 4.0)]).into();
        for dialect in [GmlDialect::Gml2, GmlDialect::Gml31, GmlDialect::Gml32] {
            assert_eq!(round_trip(dialect, polygon.clone()), polygon);
            assert_eq!(round_trip(dialect, multi.clone()), multi);
        }
    }

    #[test]
    fn reads_gml2_coord_elements() {
        let ns = GML_NS;
        let element = Element::new(ns, "Point").with_child(
            Element::new(ns, "coord")
                .with_child(Element::new(ns, "X").with_text("3"))
                .with_child(Element::new(ns, "Y").with_text("4")),
        );
        let literal = read_geometry(GmlDialect::Gml2, &element).unwrap();
        assert_eq!(literal.geometry, Geometry::Point(point!(x: 3.0, y: 4.0)));
    }

    #[test]
    fn envelopes_round_trip() {
        for dialect in [GmlDialect::Gml2, GmlDialect::Gml31, GmlDialect::Gml32] {
            let element = write_envelope(dialect, [-10.0, -5.0], [10.0, 5.0], None);
            let envelope = read_envelope(dialect, &element).unwrap();
            assert_eq!(envelope, Envelope::from_extent(-10.0, -5.0, 10.0, 5.0, None));
        }
    }

    #[test]
    fn reads_three_dimensional_envelope() {
        let ns = GML32_NS;
        let element = Element::new(ns, "Envelope")
            .with_attr("srsName", "EPSG:4979")
            .with_child(Element::new(ns, "lowerCorner").with_text("1 2 3"))
            .with_child(Element::new(ns, "upperCorner").with_text("4 5 6"));
        let envelope = read_envelope(GmlDialect::Gml32, &element).unwrap();
        assert_eq!(envelope.dimension(), 3);
        assert_eq!(envelope.crs, Some(Crs::epsg(4979)));
    }

    #[test]
    fn time_objects_round_trip() {
        let mut ids = IdGenerator::default();
        let period = Literal::Period {
            begin: "2024-01-01T00:00:00Z".into(),
            end: "2024-12-31T23:59:59Z".into(),
        };
        let element = write_time(GmlDialect::Gml32, &period, &mut ids).unwrap();
        assert_eq!(element.ns_attr(GML32_NS, "id"), Some("t1"));
        assert_eq!(read_time(GmlDialect::Gml32, &element).unwrap(), period);
        assert!(write_time(GmlDialect::Gml32, &Literal::Number(1.0), &mut ids).is_err());
    }

    #[test]
    fn rejects_unknown_geometry() {
        let element = Element::new(GML_NS, "Curve");
        assert!(matches!(
            read_geometry(GmlDialect::Gml31, &element),
            Err(FilterError::MalformedFilterDocument(_))
        ));
    }
}
