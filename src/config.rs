use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::error::Result;

const CONTAINER: &str = "https://zstagigaprodeuw1.blob.core.windows.net/gigainframapkit-public-container";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Country name as it appears in the boundaries layer
    #[arg(short, long, default_value = "Algeria")]
    pub country: String,

    /// Read the live upstream sources instead of the mirrored snapshots
    #[arg(long)]
    pub fetch: bool,

    #[arg(long, default_value_t = 2024)]
    pub year: i32,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=4))]
    pub quarter: u32,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Where downloaded inputs are kept between runs
    #[arg(long, default_value = "data/cache")]
    pub cache_dir: PathBuf,

    /// Render QA maps next to the outputs
    #[arg(long)]
    pub plots: bool,

    /// TOML file overriding source locations
    #[arg(long)]
    pub sources: Option<PathBuf>,

    #[arg(value_enum, short, long, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the full load, check and standardize pipeline (default)
    Run,
    /// Print the output column tables
    Schema,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Source locations. `{country}` is replaced with the country slug, for
/// example `algeria`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub boundaries: String,
    pub schools: String,
    pub mobile_tiles: String,
    pub fixed_tiles: String,
    pub cell_sites: String,
    pub transmission_nodes: String,
    /// Overpass endpoint used for live school queries
    pub overpass: String,
}

impl Default for Sources {
    fn default() -> Self {
        Sources {
            boundaries: format!("{CONTAINER}/country_boundary_data/boundaries.geojson"),
            schools: format!("{CONTAINER}/{{country}}/{{country}}-schools.geojson"),
            mobile_tiles: format!("{CONTAINER}/{{country}}/{{country}}-ookla-mobile-tiles.csv"),
            fixed_tiles: format!("{CONTAINER}/{{country}}/{{country}}-ookla-fixed-tiles.csv"),
            cell_sites: format!("{CONTAINER}/{{country}}/{{country}}-cell-sites.csv"),
            transmission_nodes: format!("{CONTAINER}/{{country}}/{{country}}-transmission-nodes.csv"),
            overpass: "https://overpass-api.de/api/interpreter".to_string(),
        }
    }
}

impl Sources {
    pub fn from_toml_str(text: &str) -> Result<Sources> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Sources> {
        Sources::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn resolve(template: &str, country: &str) -> String {
        template.replace("{country}", &slug(country, "-"))
    }
}

pub fn slug(country: &str, separator: &str) -> String {
    country
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(separator)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub country: String,
    pub fetch: bool,
    pub year: i32,
    pub quarter: u32,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub plots: bool,
    pub sources: Sources,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Config> {
        let sources = match &cli.sources {
            Some(path) => Sources::from_toml_file(path)?,
            None => Sources::default(),
        };
        Ok(Config {
            country: cli.country.clone(),
            fetch: cli.fetch,
            year: cli.year,
            quarter: cli.quarter,
            data_dir: cli.data_dir.clone(),
            cache_dir: cli.cache_dir.clone(),
            plots: cli.plots,
            sources,
        })
    }

    pub fn source(&self, template: &str) -> String {
        Sources::resolve(template, &self.country)
    }

    pub fn output_dir(&self, iso3: &str) -> PathBuf {
        self.data_dir.join(iso3).join("processed")
    }

    pub fn output_file(&self, iso3: &str, dataset: &str, extension: &str) -> PathBuf {
        self.output_dir(iso3)
            .join(format!("formatted_{}_{dataset}.{extension}", slug(&self.country, "_")))
    }

    pub fn plot_file(&self, iso3: &str, name: &str) -> PathBuf {
        self.data_dir.join(iso3).join("plots").join(format!("{name}.png"))
    }
}
