use geo::MultiPolygon;
use serde::Deserialize;
use std::collections::HashMap;

/// One check-in observation. Input rows are tab-separated with no header,
/// fields in this order.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckIn {
    pub user: u64,
    pub check_in_time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
}

/// An undirected social link between two users. Duplicates and self-loops
/// are kept as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Edge {
    pub user1: u64,
    pub user2: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub longitude: f64,
    pub latitude: f64,
}

/// user -> coordinate of that user's last check-in record
pub type CoordinateIndex = HashMap<u64, Coord>;

/// A named administrative region outline, used only as the map backdrop.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub outline: MultiPolygon<f64>,
}
