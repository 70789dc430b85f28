//! Maps loaded tables onto the fixed output schemas and writes them out.

use std::{fs, path::Path};

use geo::Polygon;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use log::info;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::{
    datasets::PointTable,
    error::Result,
    schema::{column_names, ColumnSpec, CELL_SITE_SCHEMA, POI_SCHEMA, TRANSMISSION_NODE_SCHEMA},
};

pub const DEFAULT_ANTENNA_HEIGHT_M: u32 = 25;
pub const DEFAULT_SIGNAL_STRENGTH_DBM: i32 = -93;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Booleans are written `True`/`False`, as the published datasets spell them.
fn serialize_flag<S: Serializer>(value: &Option<bool>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(true) => serializer.serialize_str("True"),
        Some(false) => serializer.serialize_str("False"),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiRecord {
    pub poi_id: String,
    pub dataset_id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub poi_type: String,
    #[serde(serialize_with = "serialize_flag")]
    pub is_public: Option<bool>,
    pub poi_subtype: Option<String>,
    pub country_code: String,
    #[serde(serialize_with = "serialize_flag")]
    pub is_connected: Option<bool>,
    pub connectivity_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSiteRecord {
    pub ict_id: String,
    pub dataset_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operator_name: Option<String>,
    pub radio_type: Option<String>,
    pub antenna_height_m: u32,
    pub backhaul_type: Option<String>,
    pub backhaul_throughput_mbps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub ict_id: String,
    pub dataset_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operator_name: Option<String>,
    pub infrastructure_type: String,
    pub node_status: String,
    pub equipped_capacity_mbps: Option<f64>,
    pub potential_capacity_mbps: Option<f64>,
}

pub fn standardize_pois(table: &PointTable, iso3: &str, poi_type: &str) -> Vec<PoiRecord> {
    let dataset_id = new_id();
    table
        .rows
        .iter()
        .map(|row| PoiRecord {
            poi_id: new_id(),
            dataset_id: dataset_id.clone(),
            lat: row.point.map(|p| p.y()),
            lon: row.point.map(|p| p.x()),
            poi_type: poi_type.to_string(),
            is_public: None,
            poi_subtype: None,
            country_code: iso3.to_string(),
            is_connected: Some(false),
            connectivity_type: None,
        })
        .collect()
}

/// `radio` carries the radio technology in the cell-site inventory.
pub fn standardize_cell_sites(table: &PointTable) -> Vec<CellSiteRecord> {
    let dataset_id = new_id();
    table
        .rows
        .iter()
        .map(|row| CellSiteRecord {
            ict_id: new_id(),
            dataset_id: dataset_id.clone(),
            latitude: row.point.map(|p| p.y()),
            longitude: row.point.map(|p| p.x()),
            operator_name: None,
            radio_type: row.get("radio").map(str::to_string),
            antenna_height_m: DEFAULT_ANTENNA_HEIGHT_M,
            backhaul_type: None,
            backhaul_throughput_mbps: None,
        })
        .collect()
}

pub fn standardize_nodes(table: &PointTable) -> Vec<NodeRecord> {
    let dataset_id = new_id();
    table
        .rows
        .iter()
        .map(|row| NodeRecord {
            ict_id: new_id(),
            dataset_id: dataset_id.clone(),
            latitude: row.point.map(|p| p.y()),
            longitude: row.point.map(|p| p.x()),
            operator_name: None,
            infrastructure_type: "fiber".to_string(),
            node_status: "operational".to_string(),
            equipped_capacity_mbps: None,
            potential_capacity_mbps: None,
        })
        .collect()
}

/// One feature per disjoint coverage area.
pub fn standardize_coverage(areas: &[Polygon]) -> FeatureCollection {
    let dataset_id = new_id();
    let features = areas
        .iter()
        .map(|polygon| {
            let mut properties = JsonObject::new();
            properties.insert("coverage_id".to_string(), JsonValue::from(new_id()));
            properties.insert("dataset_id".to_string(), JsonValue::from(dataset_id.clone()));
            properties.insert(
                "signal_strength_dbm".to_string(),
                JsonValue::from(DEFAULT_SIGNAL_STRENGTH_DBM),
            );
            properties.insert("operator_name".to_string(), JsonValue::Null);
            properties.insert("coverage".to_string(), JsonValue::from(1));
            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes `records` under a header taken from `schema`, so empty tables still
/// produce the documented columns.
pub fn write_csv<T: Serialize>(path: &Path, schema: &[ColumnSpec], records: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(column_names(schema))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(records.len())
}

pub fn write_geojson(path: &Path, collection: &FeatureCollection) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(collection)?)?;
    info!("Wrote {} features to {}", collection.features.len(), path.display());
    Ok(collection.features.len())
}

pub fn write_pois(path: &Path, records: &[PoiRecord]) -> Result<usize> {
    write_csv(path, &POI_SCHEMA, records)
}

pub fn write_cell_sites(path: &Path, records: &[CellSiteRecord]) -> Result<usize> {
    write_csv(path, &CELL_SITE_SCHEMA, records)
}

pub fn write_nodes(path: &Path, records: &[NodeRecord]) -> Result<usize> {
    write_csv(path, &TRANSMISSION_NODE_SCHEMA, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datasets::{read_points_csv, PointRow},
        schema::COVERAGE_SCHEMA,
    };
    use geo::{LineString, Point};
    use std::collections::BTreeMap;

    fn serialized_header<T: Serialize>(record: &T) -> Vec<String> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(record).unwrap();
        let data = writer.into_inner().unwrap();
        let mut reader = csv::Reader::from_reader(data.as_slice());
        reader.headers().unwrap().iter().map(str::to_string).collect()
    }

    fn table(data: &str, name: &str) -> PointTable {
        read_points_csv(csv::Reader::from_reader(data.as_bytes()), name, "lon", "lat").unwrap()
    }

    #[test]
    fn records_match_documented_columns() {
        let cells = table("radio,lat,lon\nLTE,36.7,3.0\n", "cell sites");
        let nodes = table("type_infr,lat,lon\nfiber,36.7,3.0\n", "nodes");

        assert_eq!(
            serialized_header(&standardize_pois(&cells, "DZA", "school")[0]),
            column_names(&POI_SCHEMA)
        );
        assert_eq!(
            serialized_header(&standardize_cell_sites(&cells)[0]),
            column_names(&CELL_SITE_SCHEMA)
        );
        assert_eq!(
            serialized_header(&standardize_nodes(&nodes)[0]),
            column_names(&TRANSMISSION_NODE_SCHEMA)
        );
    }

    #[test]
    fn pois_keep_row_count_and_share_dataset_id() {
        let mut schools = PointTable::new("schools", vec![]);
        schools.rows = (0..5)
            .map(|i| PointRow {
                point: Some(Point::new(3.0 + i as f64, 36.0)),
                properties: BTreeMap::new(),
            })
            .collect();
        let records = standardize_pois(&schools, "DZA", "school");

        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.dataset_id == records[0].dataset_id));
        assert_ne!(records[0].poi_id, records[1].poi_id);
        assert_eq!(records[2].lon, Some(5.0));
        assert_eq!(records[2].lat, Some(36.0));
        assert_eq!(records[0].country_code, "DZA");
        assert_eq!(records[0].is_connected, Some(false));
        assert!(Uuid::parse_str(&records[0].poi_id).is_ok());
    }

    #[test]
    fn cell_sites_carry_radio_and_default_height() {
        let cells = table("radio,lat,lon\nLTE,36.7,3.0\n,35.0,2.0\n", "cell sites");
        let records = standardize_cell_sites(&cells);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].radio_type.as_deref(), Some("LTE"));
        assert_eq!(records[1].radio_type, None);
        assert_eq!(records[0].antenna_height_m, 25);
        assert_eq!(records[0].latitude, Some(36.7));
    }

    #[test]
    fn nodes_default_to_operational_fiber() {
        let nodes = table("type_infr,lat,lon\nmicrowave,36.7,3.0\n", "nodes");
        let records = standardize_nodes(&nodes);
        assert_eq!(records[0].infrastructure_type, "fiber");
        assert_eq!(records[0].node_status, "operational");
        assert_eq!(records[0].equipped_capacity_mbps, None);
    }

    #[test]
    fn coverage_features_have_documented_properties() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let collection = standardize_coverage(&[square.clone(), square]);
        assert_eq!(collection.features.len(), 2);

        let properties = collection.features[0].properties.as_ref().unwrap();
        for column in COVERAGE_SCHEMA.iter().filter(|c| c.name != "geometry") {
            assert!(properties.contains_key(column.name), "missing {}", column.name);
        }
        assert_eq!(properties["coverage"], JsonValue::from(1));
        assert_eq!(properties["signal_strength_dbm"], JsonValue::from(-93));
        assert!(properties["operator_name"].is_null());
        assert_eq!(
            collection.features[0].property("dataset_id"),
            collection.features[1].property("dataset_id")
        );
    }

    #[test]
    fn empty_tables_still_get_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DZA/processed/nodes.csv");
        assert_eq!(write_nodes(&path, &[]).unwrap(), 0);
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim_end(), column_names(&TRANSMISSION_NODE_SCHEMA).join(","));
    }

    #[test]
    fn written_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        let cells = table("radio,lat,lon\nLTE,36.7,3.0\nGSM,35.0,2.0\n", "cell sites");
        write_cell_sites(&path, &standardize_cell_sites(&cells)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, column_names(&CELL_SITE_SCHEMA));
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn rows_without_coordinates_are_written_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        let cells = table("radio,lat,lon\nLTE,36.7,3.0\nGSM,,\nUMTS,35.0,2.0\n", "cell sites");
        let records = standardize_cell_sites(&cells);
        assert_eq!(records.len(), 3);
        assert_eq!(write_cell_sites(&path, &records).unwrap(), 3);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][2], "");
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[1][5], "GSM");
        assert_eq!(&rows[2][2], "35.0");
    }

    #[test]
    fn values_match_published_formatting() {
        let dir = tempfile::tempdir().unwrap();
        let cells = table("radio,lat,lon\nLTE,36.7,3.0\n", "cell sites");

        let cells_path = dir.path().join("cells.csv");
        write_cell_sites(&cells_path, &standardize_cell_sites(&cells)).unwrap();
        let mut reader = csv::Reader::from_path(&cells_path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[6], "25");

        let pois_path = dir.path().join("pois.csv");
        write_pois(&pois_path, &standardize_pois(&cells, "DZA", "school")).unwrap();
        let mut reader = csv::Reader::from_path(&pois_path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[5], "");
        assert_eq!(&row[8], "False");

        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let text = serde_json::to_string(&standardize_coverage(&[square])).unwrap();
        assert!(text.contains("\"signal_strength_dbm\":-93"), "{text}");
        assert!(!text.contains("-93.0"), "{text}");
    }
}
