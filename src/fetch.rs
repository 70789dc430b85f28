//! Resolves dataset locations to local files.
//!
//! Remote inputs are plain HTTP(S) URLs or anonymous `s3://` object URLs.
//! They are downloaded once into a cache directory and reused on later runs.

use std::{
    fs::{self, File},
    io::prelude::*,
    path::{Path, PathBuf},
};

use log::{debug, info};
use reqwest::blocking::get;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Http(String),
    S3 { bucket: String, key: String },
}

impl Location {
    pub fn parse(source: &str) -> Result<Location> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Ok(Location::Http(source.to_string()))
        } else if let Some(rest) = source.strip_prefix("s3://") {
            match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Location::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(Error::InvalidLocation(source.to_string())),
            }
        } else if source.is_empty() {
            Err(Error::InvalidLocation(source.to_string()))
        } else {
            Ok(Location::Local(PathBuf::from(source)))
        }
    }

    /// The URL to GET, or `None` for local files. Anonymous S3 reads go through
    /// the bucket's public virtual-hosted endpoint.
    pub fn url(&self) -> Option<String> {
        match self {
            Location::Local(_) => None,
            Location::Http(url) => Some(url.clone()),
            Location::S3 { bucket, key } => Some(format!("https://{bucket}.s3.amazonaws.com/{key}")),
        }
    }

    pub fn file_name(&self) -> Option<String> {
        match self {
            Location::Local(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Location::Http(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|u| u.rsplit('/').next())
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            Location::S3 { key, .. } => key.rsplit('/').next().filter(|n| !n.is_empty()).map(str::to_string),
        }
    }
}

pub fn fetch_bytes(location: &Location) -> Result<Vec<u8>> {
    if let Location::Local(path) = location {
        return Ok(fs::read(path)?);
    }
    match location.url() {
        None => Err(Error::InvalidLocation(format!("{location:?}"))),
        Some(url) => {
            debug!("GET {url}");
            let response = get(&url)?.error_for_status()?;
            Ok(response.bytes()?.to_vec())
        }
    }
}

/// Returns a local path holding the contents of `location`, downloading into
/// `cache_dir` only when the file is not already there.
pub fn fetch_to_cache(location: &Location, cache_dir: &Path) -> Result<PathBuf> {
    if let Location::Local(path) = location {
        return Ok(path.clone());
    }

    let filename = location
        .file_name()
        .ok_or_else(|| Error::InvalidLocation(format!("{location:?}")))?;
    let output_path = cache_dir.join(filename);
    if output_path.exists() {
        debug!("Using cached {}", output_path.display());
        return Ok(output_path);
    }

    let data = fetch_bytes(location)?;
    fs::create_dir_all(cache_dir)?;
    write_cache_file(&output_path, &data)?;
    info!("Downloaded {} bytes to {}", data.len(), output_path.display());

    Ok(output_path)
}

/// Writes next to `path` and renames into place, so an interrupted download
/// never leaves a file the cache check would accept.
fn write_cache_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let mut file = File::create(&partial)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&partial, path)?;
    Ok(())
}

/// Runs an Overpass QL query and returns the decoded JSON response.
pub fn fetch_overpass(endpoint: &str, query: &str) -> Result<serde_json::Value> {
    debug!("POST {endpoint}: {query}");
    let response = reqwest::blocking::Client::new()
        .post(endpoint)
        .form(&[("data", query)])
        .send()?
        .error_for_status()?;
    Ok(response.json()?)
}

pub fn fetch_source(source: &str, cache_dir: &Path) -> Result<PathBuf> {
    fetch_to_cache(&Location::parse(source)?, cache_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_location_kinds() {
        assert_eq!(
            Location::parse("https://example.org/a/b.csv").unwrap(),
            Location::Http("https://example.org/a/b.csv".to_string())
        );
        assert_eq!(
            Location::parse("s3://ookla-open-data/parquet/x.parquet").unwrap(),
            Location::S3 {
                bucket: "ookla-open-data".to_string(),
                key: "parquet/x.parquet".to_string()
            }
        );
        assert_eq!(
            Location::parse("data/local.csv").unwrap(),
            Location::Local(PathBuf::from("data/local.csv"))
        );
        assert!(Location::parse("s3://bucket-only").is_err());
        assert!(Location::parse("").is_err());
    }

    #[test]
    fn s3_maps_to_public_endpoint() {
        let location = Location::parse("s3://ookla-open-data/parquet/performance/tiles.parquet").unwrap();
        assert_eq!(
            location.url().unwrap(),
            "https://ookla-open-data.s3.amazonaws.com/parquet/performance/tiles.parquet"
        );
        assert_eq!(location.file_name().unwrap(), "tiles.parquet");
    }

    #[test]
    fn http_file_name_ignores_query() {
        let location = Location::parse("https://host/container/algeria-cell-sites.csv?sv=1").unwrap();
        assert_eq!(location.file_name().unwrap(), "algeria-cell-sites.csv");
    }

    #[test]
    fn local_files_bypass_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundaries.geojson");
        fs::write(&path, "{}").unwrap();
        let resolved = fetch_source(path.to_str().unwrap(), &dir.path().join("cache")).unwrap();
        assert_eq!(resolved, path);
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn cached_files_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nodes.csv"), "lat,lon\n").unwrap();
        // No network access happens when the cache already has the file.
        let resolved = fetch_source("https://unreachable.invalid/nodes.csv", dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join("nodes.csv"));
    }

    #[test]
    fn cache_writes_replace_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.csv");
        fs::write(dir.path().join("tiles.csv.part"), "tile_x,ti").unwrap();

        write_cache_file(&path, b"tile_x,tile_y\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "tile_x,tile_y\n");
        assert!(!dir.path().join("tiles.csv.part").exists());
    }

    #[test]
    fn partial_downloads_are_not_cache_hits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nodes.csv.part"), "lat,l").unwrap();
        assert!(fetch_source("https://unreachable.invalid/nodes.csv", dir.path()).is_err());
        assert!(!dir.path().join("nodes.csv").exists());
    }
}
