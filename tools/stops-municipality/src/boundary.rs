//! Municipality boundaries read from a GeoJSON feature collection.

use anyhow::{bail, Context, Result};
use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, GeoJson};
use std::path::Path;

/// One named area with an optional bounding box prefilter
#[derive(Debug, Clone)]
pub struct Boundary {
    pub name: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: Option<[f64; 4]>,
    pub area: MultiPolygon<f64>,
}

impl Boundary {
    /// Whether the point lies strictly inside the bbox (if any) and inside the area
    pub fn contains(&self, point: &Point<f64>) -> bool {
        if let Some([min_lon, min_lat, max_lon, max_lat]) = self.bbox {
            let (lon, lat) = (point.x(), point.y());
            let inside = min_lon.min(max_lon) < lon
                && lon < min_lon.max(max_lon)
                && min_lat.min(max_lat) < lat
                && lat < min_lat.max(max_lat);
            if !inside {
                return false;
            }
        }
        self.area.contains(point)
    }
}

/// Read every usable boundary from a GeoJSON file, in file order
pub fn read_boundaries(path: &Path) -> Result<Vec<Boundary>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary file: {}", path.display()))?;

    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON from: {}", path.display()))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => bail!("Expected features with names, found a bare geometry"),
    };

    let total = features.len();
    let boundaries: Vec<Boundary> = features.into_iter().filter_map(feature_to_boundary).collect();
    if boundaries.len() < total {
        log::warn!(
            "Skipped {} features without a name or polygon geometry",
            total - boundaries.len()
        );
    }

    Ok(boundaries)
}

/// The `official_name` property, or `name` when absent
fn boundary_name(feature: &Feature) -> Option<String> {
    ["official_name", "name"]
        .into_iter()
        .find_map(|key| feature.property(key).and_then(|value| value.as_str()))
        .map(str::to_string)
}

fn feature_to_boundary(feature: Feature) -> Option<Boundary> {
    let name = boundary_name(&feature)?;
    let bbox = feature
        .bbox
        .as_deref()
        .and_then(|bbox| <[f64; 4]>::try_from(bbox).ok());
    let area = geometry_to_multipolygon(feature.geometry?.value).ok()?;

    Some(Boundary { name, bbox, area })
}

/// Convert a GeoJSON geometry value to a geo MultiPolygon
fn geometry_to_multipolygon(value: geojson::Value) -> Result<MultiPolygon<f64>> {
    match value {
        geojson::Value::Polygon(rings) => Ok(MultiPolygon::new(vec![rings_to_polygon(&rings)?])),
        geojson::Value::MultiPolygon(polygons) => Ok(MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| rings_to_polygon(rings))
                .collect::<Result<_>>()?,
        )),
        _ => bail!("Geometry is not a Polygon or MultiPolygon"),
    }
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let Some(exterior) = rings.first() else {
        bail!("Polygon has no rings");
    };
    let interiors = rings.iter().skip(1).map(|r| coords_to_linestring(r)).collect();
    Ok(Polygon::new(coords_to_linestring(exterior), interiors))
}

fn coords_to_linestring(coords: &[Vec<f64>]) -> LineString<f64> {
    LineString::new(
        coords
            .iter()
            .map(|c| Coord {
                x: c.first().copied().unwrap_or(0.0),
                y: c.get(1).copied().unwrap_or(0.0),
            })
            .collect(),
    )
}
