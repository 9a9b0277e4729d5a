//! Unit tests for crew-map geometry and the loader.

use crew_core::Vec2;

use crate::{load_map_json, MapBuilder, MapError, Obstacle, Polygon};

/// 400×300 single-room map with one 60×40 obstacle in the middle.
fn room_with_table() -> crate::WorldMap {
    let mut b = MapBuilder::new();
    b.walkable_zone(Polygon::rect(Vec2::ZERO, Vec2::new(400.0, 300.0)), vec![]);
    b.labeled_zone("cafeteria", Polygon::rect(Vec2::ZERO, Vec2::new(400.0, 300.0)));
    b.obstacle(Vec2::new(170.0, 130.0), Vec2::new(230.0, 170.0), 6.0);
    b.build()
}

#[cfg(test)]
mod polygon {
    use super::*;

    #[test]
    fn rect_contains_interior_not_exterior() {
        let p = Polygon::rect(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert!(p.contains(Vec2::new(5.0, 5.0)));
        assert!(!p.contains(Vec2::new(15.0, 5.0)));
        assert!(!p.contains(Vec2::new(5.0, -1.0)));
    }

    #[test]
    fn concave_polygon_containment() {
        // L-shape: the notch at top-right is outside.
        let l = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(5.0, 5.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]);
        assert!(l.contains(Vec2::new(2.0, 8.0)));
        assert!(l.contains(Vec2::new(8.0, 2.0)));
        assert!(!l.contains(Vec2::new(8.0, 8.0)));
    }

    #[test]
    fn centroid_of_rect_is_center() {
        let p = Polygon::rect(Vec2::ZERO, Vec2::new(10.0, 20.0));
        let c = p.centroid();
        assert!((c.x - 5.0).abs() < 1e-4);
        assert!((c.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let p = Polygon::new(vec![Vec2::ZERO, Vec2::new(1.0, 1.0)]);
        assert!(!p.contains(Vec2::new(0.5, 0.5)));
    }
}

#[cfg(test)]
mod obstacle {
    use super::*;

    #[test]
    fn square_corners_rounded_off() {
        let o = Obstacle {
            min: Vec2::ZERO,
            max: Vec2::new(100.0, 100.0),
            corner_radius: 20.0,
        };
        // Center and edge midpoints are inside.
        assert!(o.contains(Vec2::new(50.0, 50.0)));
        assert!(o.contains(Vec2::new(50.0, 1.0)));
        // The extreme corner is shaved off by the radius.
        assert!(!o.contains(Vec2::new(1.0, 1.0)));
        // Just inside the rounded corner arc.
        assert!(o.contains(Vec2::new(20.0, 20.0)));
    }

    #[test]
    fn zero_radius_is_plain_rect() {
        let o = Obstacle {
            min: Vec2::ZERO,
            max: Vec2::new(10.0, 10.0),
            corner_radius: 0.0,
        };
        assert!(o.contains(Vec2::new(0.1, 0.1)));
        assert!(!o.contains(Vec2::new(-0.1, 5.0)));
    }
}

#[cfg(test)]
mod walkability {
    use super::*;

    #[test]
    fn obstacle_blocks_walkability() {
        let map = room_with_table();
        assert!(map.is_walkable(Vec2::new(50.0, 50.0)));
        assert!(!map.is_walkable(Vec2::new(200.0, 150.0)), "table interior");
        assert!(!map.is_walkable(Vec2::new(450.0, 50.0)), "outside the room");
    }

    #[test]
    fn holes_are_not_walkable() {
        let mut b = MapBuilder::new();
        b.walkable_zone(
            Polygon::rect(Vec2::ZERO, Vec2::new(100.0, 100.0)),
            vec![Polygon::rect(Vec2::new(40.0, 40.0), Vec2::new(60.0, 60.0))],
        );
        let map = b.build();
        assert!(map.is_walkable(Vec2::new(10.0, 10.0)));
        assert!(!map.is_walkable(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn segment_walkable_detects_blockers() {
        let map = room_with_table();
        // Clear line along the top edge.
        assert!(map.segment_walkable(Vec2::new(10.0, 20.0), Vec2::new(390.0, 20.0)));
        // Straight through the table.
        assert!(!map.segment_walkable(Vec2::new(100.0, 150.0), Vec2::new(300.0, 150.0)));
    }

    #[test]
    fn segment_endpoints_are_sampled() {
        let map = room_with_table();
        // End point sits inside the obstacle.
        assert!(!map.segment_walkable(Vec2::new(100.0, 150.0), Vec2::new(200.0, 150.0)));
    }

    #[test]
    fn zone_lookup() {
        let map = room_with_table();
        let idx = map.zone_at(Vec2::new(10.0, 10.0)).expect("inside cafeteria");
        assert_eq!(map.zone_name(idx), "cafeteria");
        assert_eq!(map.zone_at(Vec2::new(999.0, 999.0)), None);
        assert_eq!(map.zone_by_name("cafeteria"), Some(idx));
        assert_eq!(map.zone_by_name("reactor"), None);
    }

    #[test]
    fn bounds_cover_walkable_area() {
        let map = room_with_table();
        let (min, max) = map.bounds();
        assert_eq!(min, Vec2::ZERO);
        assert_eq!(max, Vec2::new(400.0, 300.0));
    }
}

#[cfg(test)]
mod loader {
    use super::*;

    const GOOD: &str = r#"{
        "walkable_zones": [
            { "outer": [[0,0],[400,0],[400,300],[0,300]], "holes": [] }
        ],
        "labeled_zones": [
            { "name": "cafeteria", "polygon": [[0,0],[200,0],[200,300],[0,300]] },
            { "name": "storage",   "polygon": [[200,0],[400,0],[400,300],[200,300]] }
        ],
        "obstacles": [
            { "x": 80, "y": 90, "width": 60, "height": 40, "corner_radius": 8 }
        ]
    }"#;

    #[test]
    fn loads_zones_and_obstacles() {
        let map = load_map_json(GOOD).unwrap();
        assert_eq!(map.labeled_count(), 2);
        assert!(map.is_walkable(Vec2::new(10.0, 10.0)));
        assert!(!map.is_walkable(Vec2::new(100.0, 100.0)), "inside obstacle");
        let idx = map.zone_at(Vec2::new(300.0, 150.0)).unwrap();
        assert_eq!(map.zone_name(idx), "storage");
    }

    #[test]
    fn empty_map_rejected() {
        let err = load_map_json(r#"{ "walkable_zones": [] }"#).unwrap_err();
        assert!(matches!(err, MapError::Empty));
    }

    #[test]
    fn short_ring_rejected() {
        let json = r#"{ "walkable_zones": [ { "outer": [[0,0],[1,0]] } ] }"#;
        let err = load_map_json(json).unwrap_err();
        assert!(matches!(err, MapError::BadRing { .. }));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(load_map_json("not json"), Err(MapError::Json(_))));
    }
}
