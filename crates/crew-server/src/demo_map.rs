//! The built-in demo ship.
//!
//! Six rooms around a cross of corridors, with a handful of furniture
//! obstacles.  Used whenever no `--map` file is supplied, so the server can
//! run (and be watched) out of the box.

use crew_core::Vec2;
use crew_map::{MapBuilder, Polygon, WorldMap};

/// `(name, min, max)` for each room.
const ROOMS: &[(&str, (f32, f32), (f32, f32))] = &[
    ("medbay", (100.0, 100.0), (500.0, 400.0)),
    ("cafeteria", (600.0, 100.0), (1000.0, 400.0)),
    ("storage", (1100.0, 100.0), (1500.0, 400.0)),
    ("reactor", (100.0, 500.0), (500.0, 800.0)),
    ("engine_room", (600.0, 500.0), (1000.0, 800.0)),
    ("comms", (1100.0, 500.0), (1500.0, 800.0)),
];

/// Corridor rectangles joining adjacent rooms.
const CORRIDORS: &[((f32, f32), (f32, f32))] = &[
    // Upper row, left to right.
    ((500.0, 220.0), (600.0, 280.0)),
    ((1000.0, 220.0), (1100.0, 280.0)),
    // Vertical drops.
    ((270.0, 400.0), (330.0, 500.0)),
    ((770.0, 400.0), (830.0, 500.0)),
    ((1270.0, 400.0), (1330.0, 500.0)),
    // Lower row.
    ((500.0, 620.0), (600.0, 680.0)),
    ((1000.0, 620.0), (1100.0, 680.0)),
];

/// `(min, max, corner_radius)` furniture.
const OBSTACLES: &[((f32, f32), (f32, f32), f32)] = &[
    // Cafeteria tables.
    ((700.0, 200.0), (780.0, 260.0), 10.0),
    ((850.0, 280.0), (930.0, 340.0), 10.0),
    // Reactor core.
    ((250.0, 600.0), (350.0, 700.0), 20.0),
    // Storage crates.
    ((1200.0, 150.0), (1270.0, 220.0), 6.0),
];

pub fn build() -> WorldMap {
    let mut b = MapBuilder::new();
    for &(name, min, max) in ROOMS {
        let rect = Polygon::rect(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1));
        b.walkable_zone(rect.clone(), vec![]);
        b.labeled_zone(name, rect);
    }
    for &(min, max) in CORRIDORS {
        b.walkable_zone(
            Polygon::rect(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1)),
            vec![],
        );
    }
    for &(min, max, r) in OBSTACLES {
        b.obstacle(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1), r);
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_are_labeled_and_walkable() {
        let map = build();
        assert_eq!(map.labeled_count(), 6);
        for &(name, min, max) in ROOMS {
            let center = Vec2::new((min.0 + max.0) * 0.5, (min.1 + max.1) * 0.5);
            let idx = map.zone_at(center).unwrap_or_else(|| panic!("{name} center unlabeled"));
            assert_eq!(map.zone_name(idx), name);
        }
    }

    #[test]
    fn corridors_connect_rooms() {
        let map = build();
        // Medbay ↔ cafeteria through the upper-left corridor.
        assert!(map.segment_walkable(Vec2::new(450.0, 250.0), Vec2::new(650.0, 250.0)));
    }

    #[test]
    fn furniture_blocks() {
        let map = build();
        assert!(!map.is_walkable(Vec2::new(740.0, 230.0)), "cafeteria table");
        assert!(!map.is_walkable(Vec2::new(300.0, 650.0)), "reactor core");
    }
}
