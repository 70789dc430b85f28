//! Broadband performance tiles: aggregated speed test results reported on a
//! fixed grid of roughly 610 m tiles at zoom level 16.

use std::{fmt, fs::File, path::Path};

use arrow::{
    array::{Array, AsArray},
    compute::cast,
    datatypes::{DataType, Float64Type},
    record_batch::RecordBatch,
};
use geo::{Point, Rect};
use log::{debug, info};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};
use serde::Deserialize;

use crate::{
    datasets::{PointRow, PointTable},
    error::{Error, Result},
};

pub const TILE_COLUMNS: [&str; 5] = ["tile_x", "tile_y", "tests", "avg_d_kbps", "avg_lat_ms"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Mobile,
    Fixed,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Mobile => write!(f, "mobile"),
            Service::Fixed => write!(f, "fixed"),
        }
    }
}

/// Location of the quarterly open-data tile file for `service`.
pub fn perf_tiles_parquet_url(service: Service, year: i32, quarter: u32) -> String {
    let quarter_start = format!("{year}-{:02}-01", (quarter - 1) * 3 + 1);
    format!(
        "s3://ookla-open-data/parquet/performance/type={service}/year={year}/quarter={quarter}/{quarter_start}_performance_{service}_tiles.parquet"
    )
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerfTile {
    pub tile_x: f64,
    pub tile_y: f64,
    pub tests: u64,
    pub avg_d_kbps: f64,
    pub avg_lat_ms: f64,
}

impl PerfTile {
    pub fn point(&self) -> Point {
        Point::new(self.tile_x, self.tile_y)
    }

    fn within(&self, bbox: &Rect) -> bool {
        self.tile_x >= bbox.min().x
            && self.tile_x <= bbox.max().x
            && self.tile_y >= bbox.min().y
            && self.tile_y <= bbox.max().y
    }
}

/// Reads a mirrored tile snapshot. Columns other than the tile fields, such as
/// a leading index, are ignored.
pub fn load_tiles_csv(path: &Path) -> Result<Vec<PerfTile>> {
    let reader = csv::Reader::from_path(path)?;
    let tiles = read_tiles_csv(reader)?;
    info!("Loaded {} tiles from {}", tiles.len(), path.display());
    Ok(tiles)
}

pub fn read_tiles_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<PerfTile>> {
    let headers = reader.headers()?.clone();
    for column in TILE_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::MissingColumn {
                dataset: "performance tiles".to_string(),
                column: column.to_string(),
            });
        }
    }
    let mut tiles = vec![];
    for tile in reader.deserialize() {
        tiles.push(tile?);
    }
    Ok(tiles)
}

fn f64_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let column = batch.column_by_name(name).ok_or_else(|| Error::MissingColumn {
        dataset: "performance tiles".to_string(),
        column: name.to_string(),
    })?;
    let column = cast(column, &DataType::Float64)?;
    let values = column.as_primitive::<Float64Type>();
    Ok((0..values.len())
        .map(|i| if values.is_null(i) { None } else { Some(values.value(i)) })
        .collect())
}

/// Reads the five tile columns from a Parquet file and keeps the tiles whose
/// centre falls inside `bbox`.
pub fn load_tiles_parquet(path: &Path, bbox: &Rect) -> Result<Vec<PerfTile>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let mask = ProjectionMask::columns(builder.parquet_schema(), TILE_COLUMNS);
    let reader = builder.with_projection(mask).build()?;

    let mut tiles = vec![];
    let mut scanned = 0;
    for batch in reader {
        let batch = batch?;
        scanned += batch.num_rows();
        let xs = f64_column(&batch, "tile_x")?;
        let ys = f64_column(&batch, "tile_y")?;
        let tests = f64_column(&batch, "tests")?;
        let download = f64_column(&batch, "avg_d_kbps")?;
        let latency = f64_column(&batch, "avg_lat_ms")?;

        for i in 0..batch.num_rows() {
            let (Some(tile_x), Some(tile_y)) = (xs[i], ys[i]) else {
                continue;
            };
            let tile = PerfTile {
                tile_x,
                tile_y,
                tests: tests[i].unwrap_or(0.0) as u64,
                avg_d_kbps: download[i].unwrap_or(f64::NAN),
                avg_lat_ms: latency[i].unwrap_or(f64::NAN),
            };
            if tile.within(bbox) {
                tiles.push(tile);
            }
        }
    }

    debug!("Scanned {scanned} tiles in {}", path.display());
    info!("Kept {} tiles inside the country bounds", tiles.len());
    Ok(tiles)
}

pub fn tiles_to_points(name: &str, tiles: &[PerfTile]) -> PointTable {
    let columns = TILE_COLUMNS[2..].iter().map(|c| c.to_string()).collect();
    let mut table = PointTable::new(name, columns);
    table.rows = tiles
        .iter()
        .map(|tile| PointRow {
            point: Some(tile.point()),
            properties: [
                ("tests", tile.tests.to_string()),
                ("avg_d_kbps", tile.avg_d_kbps.to_string()),
                ("avg_lat_ms", tile.avg_lat_ms.to_string()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v)))
            .collect(),
        })
        .collect();
    table
}
