//! Rewriting stop names in a GTFS stops file.

use anyhow::{bail, Context, Result};
use geo::Point;
use std::path::{Path, PathBuf};

use crate::boundary::Boundary;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaggingStats {
    pub stops: usize,
    pub matched: usize,
    pub without_coordinates: usize,
}

/// `stops.txt` becomes `stops_with_municipalities.txt` in the same directory
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_with_municipalities.txt"))
}

/// The first boundary containing the point
pub fn find_municipality<'a>(boundaries: &'a [Boundary], point: &Point<f64>) -> Option<&'a Boundary> {
    boundaries.iter().find(|boundary| boundary.contains(point))
}

/// Copy the stops file, renaming every stop to `"<name> (<municipality>)"`
///
/// Stops outside every boundary, or without usable coordinates, keep their name.
pub fn tag_stops(input: &Path, output: &Path, boundaries: &[Boundary]) -> Result<TaggingStats> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(input)
        .with_context(|| format!("Failed to open stops file: {}", input.display()))?;

    let headers: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches(UTF8_BOM).trim())
        .collect();
    let column = |name: &str| headers.iter().position(|header| header == name);
    let (Some(name_column), Some(lat_column), Some(lon_column)) =
        (column("stop_name"), column("stop_lat"), column("stop_lon"))
    else {
        bail!("{} needs stop_name, stop_lat and stop_lon columns", input.display());
    };

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    writer.write_record(&headers)?;

    let mut stats = TaggingStats::default();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        stats.stops += 1;
        let mut fields: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or_default().to_string())
            .collect();

        let coordinate = |i: usize| fields[i].trim().parse::<f64>().ok();
        match (coordinate(lon_column), coordinate(lat_column)) {
            (Some(lon), Some(lat)) => {
                if let Some(boundary) = find_municipality(boundaries, &Point::new(lon, lat)) {
                    fields[name_column] = format!("{} ({})", fields[name_column], boundary.name);
                    stats.matched += 1;
                }
            }
            _ => stats.without_coordinates += 1,
        }

        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use std::fs;

    fn square(name: &str, min: (f64, f64), max: (f64, f64)) -> Boundary {
        let ring = LineString::new(vec![
            Coord { x: min.0, y: min.1 },
            Coord { x: max.0, y: min.1 },
            Coord { x: max.0, y: max.1 },
            Coord { x: min.0, y: max.1 },
            Coord { x: min.0, y: min.1 },
        ]);
        Boundary {
            name: name.to_string(),
            bbox: None,
            area: MultiPolygon::new(vec![Polygon::new(ring, vec![])]),
        }
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/data/sweden/stops.txt")),
            PathBuf::from("/data/sweden/stops_with_municipalities.txt")
        );
    }

    #[test]
    fn test_first_matching_boundary_wins() {
        let boundaries = vec![
            square("Inner", (1.0, 1.0), (2.0, 2.0)),
            square("Outer", (0.0, 0.0), (3.0, 3.0)),
        ];

        let inner = find_municipality(&boundaries, &Point::new(1.5, 1.5));
        assert_eq!(inner.map(|b| b.name.as_str()), Some("Inner"));

        let outer = find_municipality(&boundaries, &Point::new(0.5, 0.5));
        assert_eq!(outer.map(|b| b.name.as_str()), Some("Outer"));

        assert!(find_municipality(&boundaries, &Point::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_tag_stops() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stops.txt");
        fs::write(
            &input,
            "\u{feff}stop_id,stop_name,stop_lat,stop_lon\n\
             1,Centralen,1.5,1.5\n\
             2,Hamnen,9.0,9.0\n\
             3,\"Torget, norra\",0.5,0.5\n\
             4,Okänd,,\n",
        )
        .unwrap();
        let output = output_path(&input);

        let stats = tag_stops(&input, &output, &[square("Staden", (0.0, 0.0), (2.0, 2.0))]).unwrap();
        assert_eq!(
            stats,
            TaggingStats {
                stops: 4,
                matched: 2,
                without_coordinates: 1
            }
        );

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "stop_id,stop_name,stop_lat,stop_lon\n\
             1,Centralen (Staden),1.5,1.5\n\
             2,Hamnen,9.0,9.0\n\
             3,\"Torget, norra (Staden)\",0.5,0.5\n\
             4,Okänd,,\n"
        );
    }
}
