use std::{convert::TryFrom, fs, path::Path};

use geo::{BoundingRect, Centroid, Contains, MultiPolygon, Point, Polygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson};
use isocountry::CountryCode;
use log::{debug, info};

use crate::error::{Error, Result};

/// Property holding the romanized country name in the UN boundaries layer.
pub const NAME_PROPERTY: &str = "romnam";

pub fn load_boundaries(path: &Path) -> Result<FeatureCollection> {
    let geojson_str = fs::read_to_string(path)?;
    let geojson = geojson_str.parse::<GeoJson>()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

pub(crate) fn feature_polygons(feature: &Feature) -> Vec<Polygon> {
    let Some(geometry) = feature.geometry.as_ref() else {
        return vec![];
    };
    if let Ok(polygon) = Polygon::try_from(geometry) {
        return vec![polygon];
    }
    if let Ok(multi_polygon) = MultiPolygon::try_from(geometry) {
        return multi_polygon.0;
    }
    vec![]
}

#[derive(Debug, Clone)]
pub struct CountryBoundary {
    pub name: String,
    pub geometry: MultiPolygon,
}

impl CountryBoundary {
    /// Merges every feature labelled `name` into a single boundary.
    pub fn from_collection(collection: &FeatureCollection, name: &str) -> Result<CountryBoundary> {
        let mut polygons: Vec<Polygon> = vec![];
        let mut matched = 0;
        for feature in collection.features.iter() {
            let label = feature.property(NAME_PROPERTY).and_then(|value| value.as_str());
            if label == Some(name) {
                matched += 1;
                polygons.extend(feature_polygons(feature));
            }
        }

        if polygons.is_empty() {
            return Err(Error::CountryNotFound(name.to_string()));
        }
        debug!("{name}: {matched} features, {} polygons", polygons.len());

        Ok(CountryBoundary {
            name: name.to_string(),
            geometry: MultiPolygon::new(polygons),
        })
    }

    pub fn load(path: &Path, name: &str) -> Result<CountryBoundary> {
        let boundary = CountryBoundary::from_collection(&load_boundaries(path)?, name)?;
        info!("Loaded boundary for {name}");
        Ok(boundary)
    }

    pub fn total_bounds(&self) -> Result<Rect> {
        self.geometry
            .bounding_rect()
            .ok_or_else(|| Error::InvalidGeometry(format!("{} boundary is empty", self.name)))
    }

    pub fn centroid_latitude(&self) -> Result<f64> {
        self.geometry
            .centroid()
            .map(|c| c.y())
            .ok_or_else(|| Error::InvalidGeometry(format!("{} boundary has no centroid", self.name)))
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.geometry.contains(point)
    }
}

/// ISO 3166-1 alpha-3 code for an English short country name, matched
/// without regard to case.
pub fn iso3_country_code(country_name: &str) -> Option<String> {
    let wanted = country_name.trim().to_lowercase();
    CountryCode::iter()
        .find(|code| code.name().to_lowercase() == wanted)
        .map(|code| code.alpha3().to_string())
}
