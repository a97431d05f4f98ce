use crate::types::{CheckIn, Edge};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Loads the check-in file: tab-separated, no header, one row per
/// observation. Record order is preserved. A row that does not parse into
/// five fields aborts the load.
pub fn load_checkins(path: &Path) -> Result<Vec<CheckIn>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open check-in file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(file);

    let mut checkins = Vec::new();
    for result in rdr.deserialize() {
        let record: CheckIn = result
            .with_context(|| format!("Malformed check-in row in {:?}", path))?;
        checkins.push(record);
    }

    info!("Loaded {} check-in records", checkins.len());
    Ok(checkins)
}

/// Loads the edge file: tab-separated, no header, two user ids per row.
/// Duplicates and self-loops pass through unfiltered.
pub fn load_edges(path: &Path) -> Result<Vec<Edge>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open edge file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(file);

    let mut edges = Vec::new();
    for result in rdr.deserialize() {
        let record: Edge = result
            .with_context(|| format!("Malformed edge row in {:?}", path))?;
        edges.push(record);
    }

    info!("Loaded {} edges", edges.len());
    Ok(edges)
}
