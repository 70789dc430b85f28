//! In-memory point tables and the loaders that build them from GeoJSON and
//! CSV sources.

use std::{
    collections::{BTreeMap, HashMap},
    convert::TryFrom,
    fmt, fs,
    path::Path,
};

use geo::{BoundingRect, Centroid, MultiPoint, Point, Rect};
use geojson::{FeatureCollection, GeoJson, Value as GeometryValue};
use log::{info, warn};
use serde_json::Value;

use crate::error::{Error, Result};

/// Columns kept from the school layer.
pub const POI_COLUMNS: [&str; 6] = [
    "osmid",
    "amenity",
    "element_type",
    "addr:city",
    "isced:level",
    "operator",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PointRow {
    /// `None` when the source row carries no usable location. Such rows are
    /// still written out, with empty coordinates.
    pub point: Option<Point>,
    pub properties: BTreeMap<String, Option<String>>,
}

impl PointRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.properties.get(column).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<PointRow>,
    /// Geometry types seen in the source before points were derived.
    pub source_geometry_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub non_null: usize,
    pub distinct: usize,
    pub top: Vec<(String, usize)>,
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top = self
            .top
            .iter()
            .map(|(value, count)| format!("{value} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{:<20} non-null {:>7}  distinct {:>7}  top: {}",
            self.column, self.non_null, self.distinct, top
        )
    }
}

impl PointTable {
    pub fn new(name: &str, columns: Vec<String>) -> PointTable {
        PointTable {
            name: name.to_string(),
            columns,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Locations of the rows that have one.
    pub fn points(&self) -> Vec<Point> {
        self.rows.iter().filter_map(|row| row.point).collect()
    }

    pub fn unlocated(&self) -> usize {
        self.rows.iter().filter(|row| row.point.is_none()).count()
    }

    pub fn bounds(&self) -> Option<Rect> {
        MultiPoint::new(self.points()).bounding_rect()
    }

    /// Every located row is a point once loaded, so this reports the source
    /// geometry tally when one was recorded.
    pub fn geometry_type_counts(&self) -> BTreeMap<String, usize> {
        if !self.source_geometry_types.is_empty() || self.rows.is_empty() {
            return self.source_geometry_types.clone();
        }
        let mut counts = BTreeMap::new();
        for row in self.rows.iter() {
            let kind = if row.point.is_some() { "Point" } else { "None" };
            *counts.entry(kind.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Non-null values of `column`, most frequent first.
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in self.rows.iter() {
            if let Some(value) = row.get(column) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn summarize(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .map(|column| {
                let counts = self.value_counts(column);
                ColumnSummary {
                    column: column.clone(),
                    non_null: counts.iter().map(|(_, c)| c).sum(),
                    distinct: counts.len(),
                    top: counts.into_iter().take(5).collect(),
                }
            })
            .collect()
    }

    pub fn log_summary(&self) {
        info!("{}: {} rows", self.name, self.len());
        let unlocated = self.unlocated();
        if unlocated > 0 {
            warn!("{}: {unlocated} rows have no location", self.name);
        }
        for (geometry_type, count) in self.geometry_type_counts() {
            info!("  geometry {geometry_type}: {count}");
        }
        for summary in self.summarize() {
            info!("  {summary}");
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn geometry_type_name(value: &GeometryValue) -> &'static str {
    match value {
        GeometryValue::Point(_) => "Point",
        GeometryValue::MultiPoint(_) => "MultiPoint",
        GeometryValue::LineString(_) => "LineString",
        GeometryValue::MultiLineString(_) => "MultiLineString",
        GeometryValue::Polygon(_) => "Polygon",
        GeometryValue::MultiPolygon(_) => "MultiPolygon",
        GeometryValue::GeometryCollection(_) => "GeometryCollection",
    }
}

pub fn points_from_collection(collection: &FeatureCollection, name: &str, columns: &[&str]) -> PointTable {
    let mut table = PointTable::new(name, columns.iter().map(|c| c.to_string()).collect());

    for (i, feature) in collection.features.iter().enumerate() {
        let geometry = feature.geometry.as_ref().map(|g| &g.value);
        let kind = geometry.map(geometry_type_name).unwrap_or("None");
        *table.source_geometry_types.entry(kind.to_string()).or_insert(0) += 1;

        // Ways and relations are reduced to their centroid.
        let point = geometry
            .and_then(|value| geo_types::Geometry::<f64>::try_from(value.clone()).ok())
            .and_then(|g| g.centroid());
        if point.is_none() {
            warn!("{name}: feature {i} ({kind}) has no usable location");
        }

        let properties = columns
            .iter()
            .map(|&column| {
                let value = feature.property(column).and_then(value_to_string);
                (column.to_string(), value)
            })
            .collect();
        table.rows.push(PointRow { point, properties });
    }

    table
}

pub fn load_poi_geojson(path: &Path, name: &str, columns: &[&str]) -> Result<PointTable> {
    let geojson_str = fs::read_to_string(path)?;
    let geojson = geojson_str.parse::<GeoJson>()?;
    let collection = FeatureCollection::try_from(geojson)?;
    let table = points_from_collection(&collection, name, columns);
    info!("Loaded {} {name} from {}", table.len(), path.display());
    Ok(table)
}

/// Overpass QL selecting every element carrying `key=value` inside the named
/// country. Ways and relations are returned with their centre.
pub fn overpass_query(country: &str, key: &str, value: &str) -> String {
    format!(
        "[out:json][timeout:180];\
         area[\"boundary\"=\"administrative\"][\"admin_level\"=\"2\"][\"name:en\"=\"{country}\"]->.country;\
         nwr[\"{key}\"=\"{value}\"](area.country);\
         out center tags;"
    )
}

/// Builds points from an Overpass JSON response. `osmid` and `element_type`
/// come from the element itself, other columns from its tags.
pub fn points_from_overpass(response: &Value, name: &str, columns: &[&str]) -> PointTable {
    let mut table = PointTable::new(name, columns.iter().map(|c| c.to_string()).collect());
    let elements = response
        .get("elements")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for element in elements {
        let element_type = element.get("type").and_then(Value::as_str).unwrap_or("node");
        let located = element.get("center").unwrap_or(element);
        let point = match (
            located.get("lon").and_then(Value::as_f64),
            located.get("lat").and_then(Value::as_f64),
        ) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => {
                warn!("{name}: {element_type} without coordinates");
                None
            }
        };
        *table
            .source_geometry_types
            .entry(element_type.to_string())
            .or_insert(0) += 1;

        let tags = element.get("tags");
        let properties = columns
            .iter()
            .map(|&column| {
                let value = match column {
                    "osmid" => element.get("id").and_then(value_to_string),
                    "element_type" => Some(element_type.to_string()),
                    tag => tags.and_then(|t| t.get(tag)).and_then(value_to_string),
                };
                (column.to_string(), value)
            })
            .collect();
        table.rows.push(PointRow { point, properties });
    }

    info!("Loaded {} {name} from Overpass", table.len());
    table
}

/// Reads a CSV with coordinate columns into points. The coordinate columns
/// are consumed; every other column becomes a property. Rows whose
/// coordinates are blank or unparseable are kept without a location.
pub fn load_points_csv(path: &Path, name: &str, lon_column: &str, lat_column: &str) -> Result<PointTable> {
    let reader = csv::Reader::from_path(path)?;
    let table = read_points_csv(reader, name, lon_column, lat_column)?;
    info!("Loaded {} {name} from {}", table.len(), path.display());
    Ok(table)
}

pub fn read_points_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    name: &str,
    lon_column: &str,
    lat_column: &str,
) -> Result<PointTable> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::MissingColumn {
                dataset: name.to_string(),
                column: column.to_string(),
            })
    };
    let lon_idx = position(lon_column)?;
    let lat_idx = position(lat_column)?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != lon_idx && *i != lat_idx)
        .map(|(_, h)| h.clone())
        .collect();
    let mut table = PointTable::new(name, columns);

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let coordinate = |idx: usize| record.get(idx).and_then(|v| v.trim().parse::<f64>().ok());
        let point = match (coordinate(lon_idx), coordinate(lat_idx)) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => {
                warn!("{name}: row {} has no usable coordinates", line + 1);
                None
            }
        };

        let properties = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lon_idx && *i != lat_idx)
            .map(|(i, h)| {
                let value = record.get(i).filter(|v| !v.is_empty()).map(str::to_string);
                (h.clone(), value)
            })
            .collect();
        table.rows.push(PointRow { point, properties });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv_reader(data: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn csv_points_drop_coordinate_columns() {
        let data = "radio,lat,lon,range\nLTE,36.75,3.05,1000\nGSM,35.1,-0.6,\n";
        let table = read_points_csv(csv_reader(data), "cell sites", "lon", "lat").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns, vec!["radio", "range"]);
        assert_eq!(table.rows[0].point, Some(Point::new(3.05, 36.75)));
        assert_eq!(table.rows[0].get("radio"), Some("LTE"));
        assert_eq!(table.rows[1].get("range"), None);
        assert!(!table.rows[0].properties.contains_key("lat"));
    }

    #[test]
    fn csv_missing_coordinate_column() {
        let data = "radio,lat\nLTE,36.75\n";
        let err = read_points_csv(csv_reader(data), "cell sites", "lon", "lat").unwrap_err();
        match err {
            Error::MissingColumn { dataset, column } => {
                assert_eq!(dataset, "cell sites");
                assert_eq!(column, "lon");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn csv_rows_without_coordinates_are_kept() {
        let data = "radio,lat,lon\nLTE,36.7,3.0\nGSM,,\nUMTS,abc,1.0\n";
        let table = read_points_csv(csv_reader(data), "cell sites", "lon", "lat").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.unlocated(), 2);
        assert_eq!(table.points(), vec![Point::new(3.0, 36.7)]);
        assert_eq!(table.rows[1].point, None);
        assert_eq!(table.rows[1].get("radio"), Some("GSM"));

        let types = table.geometry_type_counts();
        assert_eq!(types.get("Point"), Some(&1));
        assert_eq!(types.get("None"), Some(&2));
    }

    #[test]
    fn value_counts_and_summary() {
        let data = "type_infr,lat,lon\nfiber,1,1\nfiber,2,2\nmicrowave,3,3\n,4,4\n";
        let table = read_points_csv(csv_reader(data), "nodes", "lon", "lat").unwrap();
        assert_eq!(
            table.value_counts("type_infr"),
            vec![("fiber".to_string(), 2), ("microwave".to_string(), 1)]
        );
        let summary = table.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].non_null, 3);
        assert_eq!(summary[0].distinct, 2);
        assert_eq!(table.geometry_type_counts().get("Point"), Some(&4));

        let bounds = table.bounds().unwrap();
        assert_eq!(bounds.min().x, 1.0);
        assert_eq!(bounds.max().y, 4.0);
    }

    #[test]
    fn overpass_elements_become_points() {
        let response = json!({
            "elements": [
                { "type": "node", "id": 1, "lat": 36.7, "lon": 3.05,
                  "tags": { "amenity": "school", "isced:level": "1" } },
                { "type": "way", "id": 2, "center": { "lat": 35.0, "lon": 1.0 },
                  "tags": { "amenity": "school", "operator": "State" } },
                { "type": "relation", "id": 3, "tags": { "amenity": "school" } }
            ]
        });
        let table = points_from_overpass(&response, "schools", &POI_COLUMNS);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].get("osmid"), Some("1"));
        assert_eq!(table.rows[0].get("isced:level"), Some("1"));
        assert_eq!(table.rows[1].get("element_type"), Some("way"));
        assert_eq!(table.rows[1].get("operator"), Some("State"));
        assert_eq!(table.rows[1].point, Some(Point::new(1.0, 35.0)));
        assert_eq!(table.rows[2].point, None);
        assert_eq!(table.rows[2].get("osmid"), Some("3"));
        assert!(overpass_query("Algeria", "amenity", "school").contains("[\"amenity\"=\"school\"]"));
    }

    #[test]
    fn geojson_polygons_reduce_to_centroids() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "osmid": 42, "amenity": "school", "name": "ignored" },
                    "geometry": { "type": "Point", "coordinates": [3.0, 36.0] }
                },
                {
                    "type": "Feature",
                    "properties": { "osmid": 43, "amenity": "school", "operator": null },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "osmid": 44, "amenity": "school" },
                    "geometry": null
                }
            ]
        });
        let collection = FeatureCollection::try_from(GeoJson::from_json_value(value).unwrap()).unwrap();
        let table = points_from_collection(&collection, "schools", &POI_COLUMNS);

        assert_eq!(table.len(), 3);
        assert_eq!(table.columns.len(), POI_COLUMNS.len());
        assert_eq!(table.rows[0].get("osmid"), Some("42"));
        assert_eq!(table.rows[1].get("operator"), None);
        assert!(!table.rows[0].properties.contains_key("name"));
        assert_eq!(table.rows[1].point, Some(Point::new(1.0, 1.0)));
        assert_eq!(table.rows[2].point, None);
        assert_eq!(table.rows[2].get("osmid"), Some("44"));

        let types = table.geometry_type_counts();
        assert_eq!(types.get("Point"), Some(&1));
        assert_eq!(types.get("Polygon"), Some(&1));
        assert_eq!(types.get("None"), Some(&1));
    }
}
