//! The end-to-end run: boundary lookup, dataset loading, coverage derivation,
//! QA maps and the standardized outputs, in that order.

use std::path::PathBuf;

use geo::{MultiPolygon, Rect};
use log::{info, warn};
use plotters::style::RGBColor;

use crate::{
    config::Config,
    country::{iso3_country_code, CountryBoundary},
    coverage::{clip_coverage, coverage_area, disjoint_areas, tile_size_at_latitude},
    datasets::{load_points_csv, load_poi_geojson, overpass_query, points_from_overpass, PointTable, POI_COLUMNS},
    error::{Error, Result},
    fetch::{fetch_overpass, fetch_source},
    plot::{partition_outside, plot_coverage, plot_outside_points, plot_points, Palette},
    standardize::{
        standardize_cell_sites, standardize_coverage, standardize_nodes, standardize_pois, write_cell_sites,
        write_geojson, write_nodes, write_pois,
    },
    tiles::{load_tiles_csv, load_tiles_parquet, perf_tiles_parquet_url, tiles_to_points, PerfTile, Service},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub iso3: String,
    pub schools: usize,
    pub cell_sites: usize,
    pub nodes: usize,
    pub mobile_tiles: usize,
    pub fixed_tiles: usize,
    pub coverage_areas: usize,
    pub files: Vec<PathBuf>,
}

fn load_tiles(config: &Config, service: Service, bounds: &Rect) -> Result<Vec<PerfTile>> {
    if config.fetch {
        let url = perf_tiles_parquet_url(service, config.year, config.quarter);
        let path = fetch_source(&url, &config.cache_dir)?;
        load_tiles_parquet(&path, bounds)
    } else {
        let template = match service {
            Service::Mobile => &config.sources.mobile_tiles,
            Service::Fixed => &config.sources.fixed_tiles,
        };
        load_tiles_csv(&fetch_source(&config.source(template), &config.cache_dir)?)
    }
}

fn load_schools(config: &Config) -> Result<PointTable> {
    if config.fetch {
        let query = overpass_query(&config.country, "amenity", "school");
        let response = fetch_overpass(&config.sources.overpass, &query)?;
        Ok(points_from_overpass(&response, "schools", &POI_COLUMNS))
    } else {
        let path = fetch_source(&config.source(&config.sources.schools), &config.cache_dir)?;
        load_poi_geojson(&path, "schools", &POI_COLUMNS)
    }
}

fn check_points(
    config: &Config,
    iso3: &str,
    table: &PointTable,
    boundary: &CountryBoundary,
    title: &str,
    color: RGBColor,
) -> Result<()> {
    table.log_summary();
    let (_, outside) = partition_outside(table, boundary);
    if !outside.is_empty() {
        warn!("{}: {} of {} points fall outside {}", table.name, outside.len(), table.len(), boundary.name);
    }

    if config.plots {
        let stem = table.name.replace(' ', "_");
        plot_points(&config.plot_file(iso3, &stem), table, boundary, title, color)?;
        plot_outside_points(
            &config.plot_file(iso3, &format!("{stem}_outside")),
            table,
            boundary,
            &format!("{title} outside {}", boundary.name),
            color,
        )?;
    }
    Ok(())
}

fn log_value_counts(table: &PointTable, column: &str) {
    for (value, count) in table.value_counts(column) {
        info!("{} {column}={value}: {count}", table.name);
    }
}

pub fn run(config: &Config) -> Result<RunReport> {
    let boundaries = fetch_source(&config.source(&config.sources.boundaries), &config.cache_dir)?;
    let boundary = CountryBoundary::load(&boundaries, &config.country)?;
    let bounds = boundary.total_bounds()?;
    let latitude = boundary.centroid_latitude()?;

    let iso3 = iso3_country_code(&config.country).ok_or_else(|| Error::UnknownCountryCode(config.country.clone()))?;
    info!("The ISO3 code for {} is {iso3}", config.country);

    let schools = load_schools(config)?;

    let mobile_tiles = load_tiles(config, Service::Mobile, &bounds)?;
    let fixed_tiles = load_tiles(config, Service::Fixed, &bounds)?;
    let mobile_points = tiles_to_points("mobile tiles", &mobile_tiles);
    tiles_to_points("fixed tiles", &fixed_tiles).log_summary();

    let cell_sites = load_points_csv(
        &fetch_source(&config.source(&config.sources.cell_sites), &config.cache_dir)?,
        "cell sites",
        "lon",
        "lat",
    )?;
    let nodes = load_points_csv(
        &fetch_source(&config.source(&config.sources.transmission_nodes), &config.cache_dir)?,
        "transmission nodes",
        "lon",
        "lat",
    )?;

    let coverage: MultiPolygon = coverage_area(&mobile_points.points(), tile_size_at_latitude(latitude));
    let clipped = clip_coverage(&coverage, &boundary);

    check_points(config, &iso3, &schools, &boundary, "Schools", Palette::SCHOOLS)?;
    check_points(config, &iso3, &cell_sites, &boundary, "Cell Sites", Palette::CELL_SITES)?;
    log_value_counts(&cell_sites, "radio");
    check_points(config, &iso3, &nodes, &boundary, "Transmission Nodes", Palette::NODES)?;
    log_value_counts(&nodes, "type_infr");
    if config.plots {
        plot_coverage(&config.plot_file(&iso3, "mobile_coverage"), &coverage, &boundary, "Mobile Coverage")?;
        plot_coverage(
            &config.plot_file(&iso3, "mobile_coverage_clipped"),
            &clipped,
            &boundary,
            "Clipped Mobile Coverage",
        )?;
    }

    let schools_path = config.output_file(&iso3, "schools", "csv");
    let cell_sites_path = config.output_file(&iso3, "cell_sites", "csv");
    let nodes_path = config.output_file(&iso3, "nodes", "csv");
    let coverage_path = config.output_file(&iso3, "coverage", "geojson");

    let report = RunReport {
        schools: write_pois(&schools_path, &standardize_pois(&schools, &iso3, "school"))?,
        cell_sites: write_cell_sites(&cell_sites_path, &standardize_cell_sites(&cell_sites))?,
        nodes: write_nodes(&nodes_path, &standardize_nodes(&nodes))?,
        coverage_areas: write_geojson(&coverage_path, &standardize_coverage(&disjoint_areas(&clipped)))?,
        mobile_tiles: mobile_tiles.len(),
        fixed_tiles: fixed_tiles.len(),
        files: vec![schools_path, cell_sites_path, nodes_path, coverage_path],
        iso3,
    };
    info!("Wrote {} files under {}", report.files.len(), config.output_dir(&report.iso3).display());
    Ok(report)
}
