//! `crew-map` — the static world: walkable polygons, labeled rooms, obstacles.
//!
//! # Walkability invariant
//!
//! A point is walkable iff it lies in at least one walkable zone's outer
//! polygon, in none of that zone's holes, and in no obstacle.  Walkability is
//! pure and read-only after load: [`WorldMap`] has no interior mutability and
//! every query takes `&self`.
//!
//! # Modules
//!
//! | Module      | Contents                                         |
//! |-------------|--------------------------------------------------|
//! | [`polygon`] | `Polygon` — containment, centroid, bounds        |
//! | [`map`]     | `WorldMap`, `MapBuilder`, zone/obstacle types    |
//! | [`loader`]  | JSON map file format                             |

pub mod loader;
pub mod map;
pub mod polygon;

mod error;

#[cfg(test)]
mod tests;

pub use error::MapError;
pub use loader::load_map_json;
pub use map::{LabeledZone, MapBuilder, Obstacle, WalkableZone, WorldMap, SAMPLE_STEP};
pub use polygon::Polygon;
