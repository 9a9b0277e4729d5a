//! JSON map file loader.
//!
//! # File format
//!
//! ```json
//! {
//!   "walkable_zones": [
//!     { "outer": [[0,0],[400,0],[400,300],[0,300]], "holes": [] }
//!   ],
//!   "labeled_zones": [
//!     { "name": "cafeteria", "polygon": [[0,0],[200,0],[200,300],[0,300]] }
//!   ],
//!   "obstacles": [
//!     { "x": 80, "y": 90, "width": 60, "height": 40, "corner_radius": 8 }
//!   ]
//! }
//! ```
//!
//! Coordinates are world pixels.  The loader validates ring sizes but does
//! not check for self-intersection; malformed rings simply produce odd
//! containment results.

use serde::Deserialize;

use crew_core::Vec2;

use crate::{MapBuilder, MapError, Polygon, WorldMap};

// ── File-format structs ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MapFile {
    #[serde(default)]
    walkable_zones: Vec<WalkableZoneFile>,
    #[serde(default)]
    labeled_zones: Vec<LabeledZoneFile>,
    #[serde(default)]
    obstacles: Vec<ObstacleFile>,
}

#[derive(Deserialize)]
struct WalkableZoneFile {
    outer: Vec<[f32; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f32; 2]>>,
}

#[derive(Deserialize)]
struct LabeledZoneFile {
    name: String,
    polygon: Vec<[f32; 2]>,
}

#[derive(Deserialize)]
struct ObstacleFile {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(default)]
    corner_radius: f32,
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Parse a JSON map document into a [`WorldMap`].
pub fn load_map_json(json: &str) -> Result<WorldMap, MapError> {
    let file: MapFile = serde_json::from_str(json)?;

    if file.walkable_zones.is_empty() {
        return Err(MapError::Empty);
    }

    let mut builder = MapBuilder::new();

    for (i, zone) in file.walkable_zones.iter().enumerate() {
        let outer = ring_to_polygon(&zone.outer)
            .ok_or_else(|| MapError::BadRing { what: "walkable outer", index: i })?;
        let mut holes = Vec::with_capacity(zone.holes.len());
        for hole in &zone.holes {
            holes.push(
                ring_to_polygon(hole)
                    .ok_or_else(|| MapError::BadRing { what: "walkable hole", index: i })?,
            );
        }
        builder.walkable_zone(outer, holes);
    }

    for (i, zone) in file.labeled_zones.iter().enumerate() {
        let polygon = ring_to_polygon(&zone.polygon)
            .ok_or_else(|| MapError::BadRing { what: "labeled zone", index: i })?;
        builder.labeled_zone(zone.name.clone(), polygon);
    }

    for obs in &file.obstacles {
        let min = Vec2::new(obs.x, obs.y);
        let max = Vec2::new(obs.x + obs.width, obs.y + obs.height);
        builder.obstacle(min, max, obs.corner_radius);
    }

    Ok(builder.build())
}

/// Convert a raw coordinate ring into a polygon; `None` if fewer than 3
/// vertices.
fn ring_to_polygon(ring: &[[f32; 2]]) -> Option<Polygon> {
    if ring.len() < 3 {
        return None;
    }
    Some(Polygon::new(
        ring.iter().map(|&[x, y]| Vec2::new(x, y)).collect(),
    ))
}
