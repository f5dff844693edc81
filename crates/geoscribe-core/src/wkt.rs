//! WKT text codec for `POLYGON` and `MULTIPOLYGON`.
//!
//! WKT pairs are `lng lat`; the model stores `[lat, lng]`, so every coordinate is transposed at
//! this boundary. Parsing never fails loudly: malformed input yields `None`.

use crate::geometry::{Geometry, LatLng, MultiPolygon, PolygonWithHoles, Ring};
use std::fmt::Write;

/// World boundary ring at the Mercator latitude limits, in WKT order.
///
/// Used as the outer ring of inverted selections, with the selection itself as a hole.
pub const WORLD_BOUNDARY: &str = "-180 -85.0511287798, -90 -85.0511287798, 0 -85.0511287798, \
90 -85.0511287798, 180 -85.0511287798, 180 85.0511287798, 90 85.0511287798, 0 85.0511287798, \
-90 85.0511287798, -180 85.0511287798, -180 -85.0511287798";

/// Parse a `lng lat, lng lat, ...` coordinate list.
///
/// Pairs that are not two finite numbers are dropped. Returns `None` if fewer than
/// three points remain.
pub fn parse_ring(text: &str) -> Option<Ring> {
    let points: Vec<LatLng> = text.split(',').filter_map(parse_pair).collect();
    Ring::new(points).ok()
}

fn parse_pair(pair: &str) -> Option<LatLng> {
    let mut parts = pair.split_whitespace();
    let lng: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(LatLng::normalized(lat, lng))
}

/// Strip a leading keyword (case-insensitive) and return the parenthesised remainder.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let text = text.trim();
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = text[keyword.len()..].trim_start();
    rest.starts_with('(').then_some(rest)
}

/// Contents of one enclosing pair of parentheses.
fn strip_parens(text: &str) -> Option<&str> {
    text.trim().strip_prefix('(')?.strip_suffix(')')
}

/// Split `(a), (b), (c)` into `["a", "b", "c"]`, keeping nested parentheses intact.
///
/// Anything other than commas and whitespace between groups, or unbalanced parentheses,
/// yields `None`.
fn split_groups(text: &str) -> Option<Vec<&str>> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    groups.push(&text[start..i]);
                }
            }
            ',' => {}
            c if depth == 0 && !c.is_whitespace() => return None,
            _ => {}
        }
    }
    (depth == 0 && !groups.is_empty()).then_some(groups)
}

fn parse_polygon_rings(text: &str) -> Option<PolygonWithHoles> {
    let groups = split_groups(text)?;
    let (outer, holes) = groups.split_first()?;
    let outer = parse_ring(outer)?;
    let holes = holes.iter().filter_map(|h| parse_ring(h)).collect();
    Some(PolygonWithHoles::new(outer, holes))
}

/// Parse `POLYGON ((outer), (hole), ...)`. Invalid holes are dropped; an invalid outer ring
/// rejects the whole polygon.
pub fn parse_polygon(text: &str) -> Option<PolygonWithHoles> {
    let body = strip_keyword(text, "POLYGON")?;
    parse_polygon_rings(strip_parens(body)?)
}

/// Parse `MULTIPOLYGON (((...)), ((...)))`. Polygons that fail to parse are skipped.
pub fn parse_multi_polygon(text: &str) -> Option<MultiPolygon> {
    let body = strip_keyword(text, "MULTIPOLYGON")?;
    let polygons = split_groups(strip_parens(body)?)?
        .into_iter()
        .filter_map(parse_polygon_rings)
        .collect();
    MultiPolygon::new(polygons)
}

/// Parse any supported geometry; a single polygon becomes a one-element multipolygon.
pub fn parse_geometry(text: &str) -> Option<MultiPolygon> {
    let trimmed = text.trim();
    let upper = trimmed.get(..12).unwrap_or(trimmed).to_ascii_uppercase();
    if upper.starts_with("MULTIPOLYGON") {
        parse_multi_polygon(trimmed)
    } else if upper.starts_with("POLYGON") {
        parse_polygon(trimmed).and_then(|p| MultiPolygon::new(vec![p]))
    } else {
        log::debug!("Unrecognised WKT geometry: {:.40}", trimmed);
        None
    }
}

/// Plain decimal with negative zero folded to zero.
fn number(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// Closed coordinate list of `ring` in WKT order.
pub fn ring_to_wkt(ring: &Ring) -> String {
    let mut out = String::new();
    for (i, p) in ring.closed_points().into_iter().enumerate() {
        let p = p.normalize();
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {}", number(p.lng), number(p.lat));
    }
    out
}

fn rings_body(rings: impl IntoIterator<Item = String>) -> String {
    rings
        .into_iter()
        .map(|r| format!("({})", r))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn polygon_to_wkt(polygon: &PolygonWithHoles) -> String {
    let rings = std::iter::once(&polygon.outer).chain(&polygon.holes).map(ring_to_wkt);
    format!("POLYGON ({})", rings_body(rings))
}

pub fn multi_polygon_to_wkt(multi: &MultiPolygon) -> String {
    let polygons = multi
        .polygons()
        .iter()
        .map(|p| {
            let rings = std::iter::once(&p.outer).chain(&p.holes).map(ring_to_wkt);
            format!("({})", rings_body(rings))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("MULTIPOLYGON ({})", polygons)
}

/// Serialise record geometry.
///
/// Inverted geometry is written as one polygon whose outer ring is [`WORLD_BOUNDARY`] and
/// whose holes are the record's parts; even-odd filling then selects everything outside.
pub fn geometry_to_wkt(geometry: &Geometry, inverted: bool) -> String {
    let parts = geometry.parts().iter().map(ring_to_wkt);
    if inverted {
        let rings = std::iter::once(WORLD_BOUNDARY.to_string()).chain(parts);
        return format!("POLYGON ({})", rings_body(rings));
    }
    match geometry {
        Geometry::Single(_) => format!("POLYGON ({})", rings_body(parts)),
        Geometry::Multi(_) => {
            let polygons = parts.map(|r| format!("(({}))", r)).collect::<Vec<_>>();
            format!("MULTIPOLYGON ({})", polygons.join(", "))
        }
    }
}

/// Parsed WKT reduced to something a record can hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedGeometry {
    pub geometry: Geometry,
    pub inverted: bool,
    /// Hole rings that records cannot represent and were discarded.
    pub dropped_holes: usize,
}

/// Convert parsed WKT into record geometry.
///
/// A world-boundary outer ring with holes is read back as an inverted selection of those holes.
/// Otherwise each polygon's outer ring becomes one part and holes are dropped.
pub fn import_geometry(multi: MultiPolygon) -> ImportedGeometry {
    let mut polygons = multi.into_polygons();
    let inverted = matches!(
        polygons.as_slice(),
        [polygon] if polygon.outer.is_world_boundary() && !polygon.holes.is_empty()
    );
    if inverted {
        let mut parts: Vec<Ring> = polygons.remove(0).holes.into_iter().map(Ring::open).collect();
        let geometry = if parts.len() == 1 {
            Geometry::Single(parts.remove(0))
        } else {
            Geometry::Multi(parts)
        };
        return ImportedGeometry {
            geometry,
            inverted: true,
            dropped_holes: 0,
        };
    }
    let dropped_holes = polygons.iter().map(|p| p.holes.len()).sum();
    let mut rings: Vec<Ring> = polygons.into_iter().map(|p| p.outer.open()).collect();
    let geometry = if rings.len() == 1 {
        Geometry::Single(rings.remove(0))
    } else {
        Geometry::Multi(rings)
    };
    if dropped_holes > 0 {
        log::warn!("Dropped {} hole ring(s) on import", dropped_holes);
    }
    ImportedGeometry {
        geometry,
        inverted: false,
        dropped_holes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::MAX_LATITUDE;

    fn ring(points: &[(f64, f64)]) -> Ring {
        Ring::new(points.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect()).unwrap()
    }

    #[test]
    fn test_single_polygon_to_wkt() {
        let r = ring(&[(10.0, 10.0), (10.0, 20.0), (20.0, 20.0), (20.0, 10.0)]);
        assert_eq!(
            geometry_to_wkt(&Geometry::Single(r), false),
            "POLYGON ((10 10, 20 10, 20 20, 10 20, 10 10))"
        );
    }

    #[test]
    fn test_already_closed_ring_not_closed_twice() {
        let r = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(ring_to_wkt(&r), "0 0, 1 0, 1 1, 0 0");
    }

    #[test]
    fn test_fractional_and_negative_numbers() {
        let r = ring(&[(-0.0, 10.5), (-33.25, 151.125), (1.0, -0.5)]);
        assert_eq!(ring_to_wkt(&r), "10.5 0, 151.125 -33.25, -0.5 1, 10.5 0");
    }

    #[test]
    fn test_inverted_has_two_rings() {
        let r = ring(&[(10.0, 10.0), (10.0, 20.0), (20.0, 20.0), (20.0, 10.0)]);
        let wkt = geometry_to_wkt(&Geometry::Single(r.clone()), true);
        let parsed = parse_polygon(&wkt).unwrap();
        assert_eq!(parsed.holes.len(), 1);
        assert!(parsed.outer.is_world_boundary());
        assert_eq!(parsed.holes[0].points(), r.closed_points().as_slice());
        assert!(wkt.starts_with("POLYGON ((-180 -85.0511287798, "));
    }

    #[test]
    fn test_multi_to_wkt() {
        let a = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let b = ring(&[(10.0, 10.0), (10.0, 11.0), (11.0, 11.0), (11.0, 10.0)]);
        assert_eq!(
            geometry_to_wkt(&Geometry::Multi(vec![a, b]), false),
            "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((10 10, 11 10, 11 11, 10 11, 10 10)))"
        );
    }

    #[test]
    fn test_inverted_multi_is_world_with_holes() {
        let a = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
        let b = ring(&[(10.0, 10.0), (10.0, 11.0), (11.0, 11.0)]);
        let wkt = geometry_to_wkt(&Geometry::Multi(vec![a, b]), true);
        let parsed = parse_polygon(&wkt).unwrap();
        assert!(parsed.outer.is_world_boundary());
        assert_eq!(parsed.holes.len(), 2);
    }

    #[test]
    fn test_parse_ring_transposes_and_filters() {
        let r = parse_ring("10 20, abc def, 30 40, 50 60").unwrap();
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(0), Some(LatLng::new(20.0, 10.0)));
        assert!(parse_ring("10 20, 30 40").is_none());
        assert!(parse_ring("10 20, NaN 1, 30 40, inf 2").is_none());
    }

    #[test]
    fn test_parse_ring_clamps_and_wraps() {
        let r = parse_ring("190 89, 0 0, 10 10").unwrap();
        let p = r.get(0).unwrap();
        assert_eq!(p.lat, MAX_LATITUDE);
        assert!((p.lng - -170.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_polygon_with_holes() {
        let wkt = "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 3 2, 3 3, 2 2), (5 5, 6 6))";
        let p = parse_polygon(wkt).unwrap();
        assert_eq!(p.outer.len(), 5);
        assert_eq!(p.holes.len(), 1);
    }

    #[test]
    fn test_parse_polygon_whitespace_and_case() {
        let p = parse_polygon("  polygon( ( 0 0,1 0 , 1 1,0 0 ) )  ").unwrap();
        assert_eq!(p.outer.len(), 4);
        let p = parse_polygon("POLYGON((0 0, 1 0, 1 1, 0 0))").unwrap();
        assert_eq!(p.outer.len(), 4);
    }

    #[test]
    fn test_parse_polygon_rejects_bad_outer() {
        assert!(parse_polygon("POLYGON ((0 0, 1 1), (0 0, 1 0, 1 1, 0 0))").is_none());
        assert!(parse_polygon("POLYGON ((0 0, 1 0, 1 1, 0 0)").is_none());
        assert!(parse_polygon("POLYGON EMPTY").is_none());
        assert!(parse_polygon("POLYGONAL ((0 0, 1 0, 1 1, 0 0))").is_none());
    }

    #[test]
    fn test_parse_multi_polygon() {
        let wkt = "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 1, 0 0)), ((10 10, 11 10, 11 11, 10 11, 10 10)))";
        let m = parse_multi_polygon(wkt).unwrap();
        assert_eq!(m.len(), 2);
        for polygon in m.polygons() {
            assert_eq!(polygon.outer.len(), 5);
            assert!(polygon.outer.is_closed());
            assert!(polygon.holes.is_empty());
        }
    }

    #[test]
    fn test_parse_multi_skips_bad_chunks() {
        let wkt = "MULTIPOLYGON (((0 0, 1 1)), ((10 10, 11 10, 11 11, 10 10), (10.2 10.2, 10.4 10.2, 10.4 10.4, 10.2 10.2)))";
        let m = parse_multi_polygon(wkt).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.hole_count(), 1);
        assert!(parse_multi_polygon("MULTIPOLYGON (((0 0, 1 1)))").is_none());
    }

    #[test]
    fn test_parse_geometry_dispatch() {
        assert_eq!(parse_geometry("polygon ((0 0, 1 0, 1 1, 0 0))").map(|m| m.len()), Some(1));
        assert_eq!(
            parse_geometry(" MultiPolygon (((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))")
                .map(|m| m.len()),
            Some(2)
        );
        assert!(parse_geometry("POINT (1 2)").is_none());
        assert!(parse_geometry("").is_none());
        assert!(parse_geometry("POLYGON ((((").is_none());
        assert!(parse_geometry("ÄÖÜ POLYGON").is_none());
    }

    #[test]
    fn test_polygon_roundtrip() {
        let r = ring(&[(1.5, -3.25), (2.0, 4.0), (-7.125, 0.5), (0.0, -10.0)]);
        let wkt = geometry_to_wkt(&Geometry::Single(r.clone()), false);
        let parsed = parse_polygon(&wkt).unwrap().outer.open();
        assert_eq!(parsed.len(), r.len());
        for (a, b) in parsed.points().iter().zip(r.points()) {
            assert!(a.approx_eq(b, 1e-12));
        }
    }

    #[test]
    fn test_import_inverted_roundtrip() {
        let r = ring(&[(10.0, 10.0), (10.0, 20.0), (20.0, 20.0), (20.0, 10.0)]);
        let wkt = geometry_to_wkt(&Geometry::Single(r.clone()), true);
        let imported = import_geometry(parse_geometry(&wkt).unwrap());
        assert!(imported.inverted);
        assert_eq!(imported.geometry, Geometry::Single(r));
    }

    #[test]
    fn test_import_inverted_multi_roundtrip() {
        let a = ring(&[(0.0, 0.0), (0.0, 5.0), (5.0, 0.0)]);
        let b = ring(&[(10.0, 10.0), (10.0, 15.0), (15.0, 10.0)]);
        let geometry = Geometry::Multi(vec![a, b]);
        let imported = import_geometry(parse_geometry(&geometry_to_wkt(&geometry, true)).unwrap());
        assert!(imported.inverted);
        assert_eq!(imported.dropped_holes, 0);
        assert_eq!(imported.geometry, geometry);
        assert!(!imported.geometry.parts()[0].is_world_boundary());
    }

    #[test]
    fn test_import_drops_holes_and_opens_rings() {
        let wkt = "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5), (5.2 5.1, 5.8 5.1, 5.8 5.7, 5.2 5.1)))";
        let imported = import_geometry(parse_geometry(wkt).unwrap());
        assert!(!imported.inverted);
        assert_eq!(imported.dropped_holes, 1);
        assert_eq!(imported.geometry.part_count(), 2);
        assert!(imported.geometry.parts().iter().all(|r| r.len() == 3));

        let single = import_geometry(parse_geometry("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap());
        assert!(!single.geometry.is_multi());
        assert_eq!(single.geometry.vertex_count(), 4);
    }

    #[test]
    fn test_polygon_and_multi_writers() {
        let wkt = "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 3 2, 3 3, 2 2))";
        assert_eq!(polygon_to_wkt(&parse_polygon(wkt).unwrap()), wkt);
        let multi = "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5), (5.2 5.1, 5.8 5.1, 5.8 5.7, 5.2 5.1)))";
        assert_eq!(multi_polygon_to_wkt(&parse_multi_polygon(multi).unwrap()), multi);
    }
}
