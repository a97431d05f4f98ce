use crate::types::{CheckIn, Coord, CoordinateIndex, Edge};
use std::collections::HashSet;
use tracing::info;

/// Users with at least one check-in record.
pub fn user_set(checkins: &[CheckIn]) -> HashSet<u64> {
    checkins.iter().map(|c| c.user).collect()
}

/// Keeps an edge only when both endpoints have check-in data. Input order is
/// preserved. Duplicates, reversed pairs, and self-loops pass through
/// untouched, so a pair listed twice is drawn twice.
pub fn filter_edges(edges: Vec<Edge>, users: &HashSet<u64>) -> Vec<Edge> {
    let total = edges.len();
    let kept: Vec<Edge> = edges
        .into_iter()
        .filter(|e| users.contains(&e.user1) && users.contains(&e.user2))
        .collect();

    info!("Kept {} of {} edges", kept.len(), total);
    kept
}

/// Builds the user -> coordinate mapping in record order. A repeated user id
/// overwrites the earlier entry, so the last row wins.
pub fn coordinate_index(checkins: &[CheckIn]) -> CoordinateIndex {
    let mut index = CoordinateIndex::new();
    for record in checkins {
        index.insert(
            record.user,
            Coord {
                longitude: record.longitude,
                latitude: record.latitude,
            },
        );
    }
    index
}
