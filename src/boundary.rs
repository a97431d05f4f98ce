use crate::config::BoundaryConfig;
use crate::types::Region;
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Backdrop geometry source. The remote variant fetches once per run with no
/// retry and no cache; the file variant lets tests and offline runs use a
/// local fixture instead.
#[derive(Debug, Clone)]
pub enum BoundarySource {
    Remote(String),
    File(PathBuf),
}

impl BoundarySource {
    pub fn from_config(config: &BoundaryConfig) -> Result<Self> {
        if let Some(path) = &config.file {
            Ok(BoundarySource::File(path.clone()))
        } else if let Some(url) = &config.url {
            Ok(BoundarySource::Remote(url.clone()))
        } else {
            Err(anyhow!("Boundary config needs either `url` or `file`"))
        }
    }

    pub async fn load(&self) -> Result<Vec<Region>> {
        let text = match self {
            BoundarySource::Remote(url) => {
                info!("Fetching boundary dataset from {}", url);
                let response = reqwest::get(url)
                    .await
                    .with_context(|| format!("Failed to fetch boundary dataset: {}", url))?
                    .error_for_status()
                    .with_context(|| format!("Boundary fetch rejected: {}", url))?;
                response
                    .text()
                    .await
                    .context("Failed to read boundary response body")?
            }
            BoundarySource::File(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read boundary file: {:?}", path))?,
        };

        parse_regions(&text)
    }
}

/// Parses a GeoJSON FeatureCollection into named region outlines. Features
/// without polygon geometry are skipped; the backdrop only draws polygons.
pub fn parse_regions(text: &str) -> Result<Vec<Region>> {
    let geojson: GeoJson = text.parse().context("Failed to parse boundary GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let name = match feature.properties.as_ref().and_then(|props| props.get("name")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let outline = match feature.geometry {
            Some(geom) => {
                let converted: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert boundary geometry: {:?}", e))?;

                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(Region { name, outline });
    }

    info!("Loaded {} boundary regions", regions.len());
    Ok(regions)
}
