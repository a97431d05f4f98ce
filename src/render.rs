use crate::config::RenderConfig;
use crate::types::{CheckIn, CoordinateIndex, Edge, Region};
use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::LineString;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size, Blend,
};
use std::fs;
use thiserror::Error;
use tracing::info;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BOUNDARY_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
// scatter blue at alpha 0.7, edges red at alpha 0.5
const POINT_COLOR: Rgba<u8> = Rgba([0, 0, 255, 179]);
const EDGE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 128]);
const GRID_COLOR: Rgba<u8> = Rgba([160, 160, 160, 128]);
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

const POINT_RADIUS: i32 = 2;
const DASH_LEN: f32 = 6.0;
const GAP_LEN: f32 = 4.0;

/// An edge endpoint with no entry in the coordinate index. The edge filter
/// guarantees its own output cannot trigger this; the renderer checks anyway
/// so a violated invariant is diagnosable instead of a panic.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no coordinate for user {user} referenced by edge ({user1}, {user2})")]
    MissingCoordinate { user: u64, user1: u64, user2: u64 },
}

/// Geographic window mapped onto the image, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Extent {
    pub fn from_array(a: [f64; 4]) -> Self {
        Extent {
            min_lon: a[0],
            min_lat: a[1],
            max_lon: a[2],
            max_lat: a[3],
        }
    }

    /// Smallest window covering every region outline and check-in point,
    /// padded so nothing sits on the image border.
    pub fn covering(regions: &[Region], checkins: &[CheckIn]) -> Self {
        let mut extent = Extent {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        };

        for region in regions {
            if let Some(rect) = region.outline.bounding_rect() {
                extent.include(rect.min().x, rect.min().y);
                extent.include(rect.max().x, rect.max().y);
            }
        }
        for record in checkins {
            extent.include(record.longitude, record.latitude);
        }

        if extent.min_lon > extent.max_lon || extent.min_lat > extent.max_lat {
            // nothing to cover, fall back to the whole world
            return Extent {
                min_lon: -180.0,
                min_lat: -90.0,
                max_lon: 180.0,
                max_lat: 90.0,
            };
        }

        extent.padded(0.02)
    }

    fn include(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    fn padded(mut self, fraction: f64) -> Self {
        let lon_span = self.max_lon - self.min_lon;
        let lat_span = self.max_lat - self.min_lat;
        // a degenerate span (single point) still gets a visible window
        let lon_pad = if lon_span > 0.0 { lon_span * fraction } else { 1.0 };
        let lat_pad = if lat_span > 0.0 { lat_span * fraction } else { 1.0 };
        self.min_lon -= lon_pad;
        self.max_lon += lon_pad;
        self.min_lat -= lat_pad;
        self.max_lat += lat_pad;
        self
    }
}

struct Projection {
    extent: Extent,
    width: u32,
    height: u32,
}

impl Projection {
    /// Equirectangular lon/lat -> pixel, y flipped so north is up.
    fn to_pixel(&self, lon: f64, lat: f64) -> (f32, f32) {
        let lon_span = (self.extent.max_lon - self.extent.min_lon).max(f64::EPSILON);
        let lat_span = (self.extent.max_lat - self.extent.min_lat).max(f64::EPSILON);
        let x = (lon - self.extent.min_lon) / lon_span * self.width as f64;
        let y = (self.extent.max_lat - lat) / lat_span * self.height as f64;
        (x as f32, y as f32)
    }
}

/// Composes the figure: dashed graticule, region outlines, one dot per
/// check-in record, one segment per filtered edge, then title and axis
/// labels when a font is configured. The scatter layer is independent of the
/// edge filter, so users with no surviving edges still appear.
pub fn render_map(
    config: &RenderConfig,
    regions: &[Region],
    checkins: &[CheckIn],
    edges: &[Edge],
    index: &CoordinateIndex,
) -> Result<RgbaImage> {
    let extent = match config.extent {
        Some(a) => Extent::from_array(a),
        None => Extent::covering(regions, checkins),
    };
    let projection = Projection {
        extent,
        width: config.width,
        height: config.height,
    };

    info!(
        "Rendering {}x{} map: {} regions, {} points, {} edges",
        config.width,
        config.height,
        regions.len(),
        checkins.len(),
        edges.len()
    );

    let mut canvas = Blend(RgbaImage::from_pixel(config.width, config.height, BACKGROUND));

    draw_grid(&mut canvas, &projection);

    for region in regions {
        draw_region_outline(&mut canvas, &projection, region);
    }

    for record in checkins {
        let (x, y) = projection.to_pixel(record.longitude, record.latitude);
        draw_filled_circle_mut(
            &mut canvas,
            (x.round() as i32, y.round() as i32),
            POINT_RADIUS,
            POINT_COLOR,
        );
    }

    for edge in edges {
        let a = index
            .get(&edge.user1)
            .copied()
            .ok_or(RenderError::MissingCoordinate {
                user: edge.user1,
                user1: edge.user1,
                user2: edge.user2,
            })?;
        let b = index
            .get(&edge.user2)
            .copied()
            .ok_or(RenderError::MissingCoordinate {
                user: edge.user2,
                user1: edge.user1,
                user2: edge.user2,
            })?;

        draw_line_segment_mut(
            &mut canvas,
            projection.to_pixel(a.longitude, a.latitude),
            projection.to_pixel(b.longitude, b.latitude),
            EDGE_COLOR,
        );
    }

    draw_labels(&mut canvas, config)?;

    Ok(canvas.0)
}

/// Encodes the composed figure as PNG at the configured output path.
pub fn write_map(config: &RenderConfig, map: &RgbaImage) -> Result<()> {
    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
    }
    map.save(&config.output)
        .with_context(|| format!("Failed to write map image: {:?}", config.output))?;
    info!("Wrote map to {:?}", config.output);
    Ok(())
}

fn draw_region_outline(canvas: &mut Blend<RgbaImage>, projection: &Projection, region: &Region) {
    for polygon in &region.outline {
        draw_ring(canvas, projection, polygon.exterior());
        for interior in polygon.interiors() {
            draw_ring(canvas, projection, interior);
        }
    }
}

fn draw_ring(canvas: &mut Blend<RgbaImage>, projection: &Projection, ring: &LineString<f64>) {
    for pair in ring.0.windows(2) {
        let start = projection.to_pixel(pair[0].x, pair[0].y);
        let end = projection.to_pixel(pair[1].x, pair[1].y);
        draw_line_segment_mut(canvas, start, end, BOUNDARY_COLOR);
    }
}

fn draw_grid(canvas: &mut Blend<RgbaImage>, projection: &Projection) {
    let extent = projection.extent;
    let lon_step = grid_step(extent.max_lon - extent.min_lon);
    let lat_step = grid_step(extent.max_lat - extent.min_lat);

    let mut lon = (extent.min_lon / lon_step).ceil() * lon_step;
    while lon <= extent.max_lon {
        let (x, _) = projection.to_pixel(lon, extent.max_lat);
        draw_dashed_segment(canvas, (x, 0.0), (x, projection.height as f32), GRID_COLOR);
        lon += lon_step;
    }

    let mut lat = (extent.min_lat / lat_step).ceil() * lat_step;
    while lat <= extent.max_lat {
        let (_, y) = projection.to_pixel(extent.min_lon, lat);
        draw_dashed_segment(canvas, (0.0, y), (projection.width as f32, y), GRID_COLOR);
        lat += lat_step;
    }
}

/// Picks a 1/2/5 x 10^k interval giving roughly eight gridlines across the span.
fn grid_step(span: f64) -> f64 {
    if span <= 0.0 {
        return 1.0;
    }
    let raw = span / 8.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let scaled = raw / magnitude;
    let nice = if scaled < 1.5 {
        1.0
    } else if scaled < 3.5 {
        2.0
    } else if scaled < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn draw_dashed_segment(
    canvas: &mut Blend<RgbaImage>,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgba<u8>,
) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = (dx * dx + dy * dy).sqrt();
    if length <= 0.0 {
        return;
    }
    let ux = dx / length;
    let uy = dy / length;

    let mut t = 0.0;
    while t < length {
        let t_end = (t + DASH_LEN).min(length);
        draw_line_segment_mut(
            canvas,
            (start.0 + ux * t, start.1 + uy * t),
            (start.0 + ux * t_end, start.1 + uy * t_end),
            color,
        );
        t = t_end + GAP_LEN;
    }
}

fn draw_labels(canvas: &mut Blend<RgbaImage>, config: &RenderConfig) -> Result<()> {
    let Some(font_path) = &config.font else {
        return Ok(());
    };

    let bytes = fs::read(font_path)
        .with_context(|| format!("Failed to read font file: {:?}", font_path))?;
    let font = FontArc::try_from_vec(bytes)
        .map_err(|e| anyhow!("Failed to load font {:?}: {:?}", font_path, e))?;

    let title_scale = PxScale::from(28.0);
    let label_scale = PxScale::from(16.0);

    let (tw, _) = text_size(title_scale, &font, &config.title);
    let tx = ((config.width as i32 - tw as i32) / 2).max(0);
    draw_text_mut(canvas, TEXT_COLOR, tx, 8, title_scale, &font, &config.title);

    let (lw, lh) = text_size(label_scale, &font, "Longitude");
    draw_text_mut(
        canvas,
        TEXT_COLOR,
        ((config.width as i32 - lw as i32) / 2).max(0),
        config.height as i32 - lh as i32 - 4,
        label_scale,
        &font,
        "Longitude",
    );
    draw_text_mut(
        canvas,
        TEXT_COLOR,
        4,
        config.height as i32 / 2,
        label_scale,
        &font,
        "Latitude",
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;
    use geo::{polygon, MultiPolygon};
    use std::path::PathBuf;

    fn render_config(extent: Option<[f64; 4]>) -> RenderConfig {
        RenderConfig {
            output: PathBuf::from("out/map.png"),
            width: 100,
            height: 100,
            extent,
            font: None,
            title: "test map".to_string(),
        }
    }

    fn checkin(user: u64, latitude: f64, longitude: f64) -> CheckIn {
        CheckIn {
            user,
            check_in_time: "2010-10-19T23:55:27Z".to_string(),
            latitude,
            longitude,
            country: "US".to_string(),
        }
    }

    fn square_region() -> Region {
        Region {
            name: "Squareland".to_string(),
            outline: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0),
            ]]),
        }
    }

    #[test]
    fn projection_maps_extent_corners_to_image_corners() {
        let projection = Projection {
            extent: Extent::from_array([0.0, 0.0, 10.0, 10.0]),
            width: 100,
            height: 100,
        };

        assert_eq!(projection.to_pixel(0.0, 10.0), (0.0, 0.0));
        assert_eq!(projection.to_pixel(10.0, 0.0), (100.0, 100.0));
        assert_eq!(projection.to_pixel(5.0, 5.0), (50.0, 50.0));
    }

    #[test]
    fn covering_extent_includes_regions_and_points() {
        let regions = vec![square_region()];
        let checkins = vec![checkin(1, -5.0, 20.0)];

        let extent = Extent::covering(&regions, &checkins);
        assert!(extent.min_lon < 0.0);
        assert!(extent.max_lon > 20.0);
        assert!(extent.min_lat < -5.0);
        assert!(extent.max_lat > 10.0);
    }

    #[test]
    fn covering_extent_of_a_single_point_is_not_degenerate() {
        let checkins = vec![checkin(1, 5.0, 5.0)];
        let extent = Extent::covering(&[], &checkins);
        assert!(extent.max_lon - extent.min_lon > 0.0);
        assert!(extent.max_lat - extent.min_lat > 0.0);
    }

    #[test]
    fn grid_step_picks_round_intervals() {
        assert_eq!(grid_step(50.0), 5.0);
        assert_eq!(grid_step(8.0), 1.0);
        assert_eq!(grid_step(0.8), 0.1);
        assert_eq!(grid_step(20.0), 2.0);
    }

    #[test]
    fn scatter_marks_every_checkin_independent_of_edges() {
        let config = render_config(Some([0.0, 0.0, 10.0, 10.0]));
        let checkins = vec![checkin(1, 5.0, 5.0)];
        let index = coordinate_index_of(&checkins);

        let map = render_map(&config, &[], &checkins, &[], &index).unwrap();
        assert_eq!(map.dimensions(), (100, 100));
        // the lone user has no edges but still gets a dot at the center
        assert_ne!(*map.get_pixel(50, 50), BACKGROUND);
    }

    #[test]
    fn every_record_of_a_repeated_user_gets_a_dot() {
        let config = render_config(Some([0.0, 0.0, 10.0, 10.0]));
        // same user at two spots; the index keeps only the later one, the
        // scatter layer keeps both
        let checkins = vec![checkin(1, 2.0, 2.0), checkin(1, 8.0, 8.0)];
        let index = coordinate_index_of(&checkins);

        let map = render_map(&config, &[], &checkins, &[], &index).unwrap();
        assert_ne!(*map.get_pixel(20, 80), BACKGROUND);
        assert_ne!(*map.get_pixel(80, 20), BACKGROUND);
    }

    #[test]
    fn edge_segment_connects_endpoint_coordinates() {
        let config = render_config(Some([0.0, 0.0, 10.0, 10.0]));
        let checkins = vec![checkin(1, 5.0, 1.0), checkin(2, 5.0, 9.0)];
        let index = coordinate_index_of(&checkins);
        let edges = vec![Edge { user1: 1, user2: 2 }];

        let map = render_map(&config, &[], &checkins, &edges, &index).unwrap();
        // midpoint of the segment lies between the two dots
        assert_ne!(*map.get_pixel(50, 50), BACKGROUND);
    }

    #[test]
    fn missing_endpoint_coordinate_is_a_structured_error() {
        let config = render_config(Some([0.0, 0.0, 10.0, 10.0]));
        let checkins = vec![checkin(1, 5.0, 5.0)];
        let index = coordinate_index_of(&checkins);
        let edges = vec![Edge { user1: 1, user2: 99 }];

        let err = render_map(&config, &[], &checkins, &edges, &index).unwrap_err();
        assert!(err.to_string().contains("no coordinate for user 99"));
    }

    #[test]
    fn renders_backdrop_with_scatter_and_edges() {
        let config = render_config(None);
        let regions = vec![square_region()];
        let checkins = vec![checkin(1, 2.0, 2.0), checkin(2, 8.0, 8.0)];
        let index = coordinate_index_of(&checkins);
        let edges = vec![Edge { user1: 1, user2: 2 }];

        let map = render_map(&config, &regions, &checkins, &edges, &index).unwrap();
        assert_eq!(map.dimensions(), (100, 100));
    }

    fn coordinate_index_of(checkins: &[CheckIn]) -> CoordinateIndex {
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
}
