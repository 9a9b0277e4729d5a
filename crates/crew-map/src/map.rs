//! The immutable world map and its builder.

use crew_core::Vec2;

use crate::Polygon;

/// Spacing of walkability samples along a segment, in world units.  Shared by
/// line-of-sight checks here and visibility-graph edge construction in
/// crew-nav.
pub const SAMPLE_STEP: f32 = 8.0;

// ── Zone and obstacle types ───────────────────────────────────────────────────

/// A walkable region: one outer polygon minus any number of hole polygons.
#[derive(Clone, Debug)]
pub struct WalkableZone {
    pub outer: Polygon,
    pub holes: Vec<Polygon>,
}

impl WalkableZone {
    /// `true` if `p` is inside the outer ring and outside every hole.
    pub fn contains(&self, p: Vec2) -> bool {
        self.outer.contains(p) && !self.holes.iter().any(|h| h.contains(p))
    }
}

/// A named room polygon.  Labeled zones are purely descriptive — they do not
/// affect walkability.
#[derive(Clone, Debug)]
pub struct LabeledZone {
    pub name: String,
    pub polygon: Polygon,
}

/// An axis-aligned rounded-rectangle blocker (tables, consoles, engines).
#[derive(Clone, Debug)]
pub struct Obstacle {
    pub min: Vec2,
    pub max: Vec2,
    pub corner_radius: f32,
}

impl Obstacle {
    /// Rounded-rect containment: distance from the radius-inset core
    /// rectangle must not exceed `corner_radius`.
    pub fn contains(&self, p: Vec2) -> bool {
        if p.x < self.min.x || p.x > self.max.x || p.y < self.min.y || p.y > self.max.y {
            return false;
        }
        let r = self
            .corner_radius
            .min((self.max.x - self.min.x) * 0.5)
            .min((self.max.y - self.min.y) * 0.5);
        if r <= 0.0 {
            return true;
        }
        let center = (self.min + self.max) * 0.5;
        let half_core = Vec2::new(
            (self.max.x - self.min.x) * 0.5 - r,
            (self.max.y - self.min.y) * 0.5 - r,
        );
        let d = Vec2::new(
            ((p.x - center.x).abs() - half_core.x).max(0.0),
            ((p.y - center.y).abs() - half_core.y).max(0.0),
        );
        d.length_sq() <= r * r
    }
}

// ── WorldMap ──────────────────────────────────────────────────────────────────

/// The static world.  Built once (via [`MapBuilder`] or the JSON loader) and
/// then queried read-only by every other crate.
#[derive(Clone, Debug)]
pub struct WorldMap {
    pub walkable: Vec<WalkableZone>,
    pub labeled: Vec<LabeledZone>,
    pub obstacles: Vec<Obstacle>,
    /// Bounding box over all walkable outers — used by the nav sampler.
    bounds: (Vec2, Vec2),
}

impl WorldMap {
    /// `true` iff `p` lies in at least one walkable zone and in no obstacle.
    pub fn is_walkable(&self, p: Vec2) -> bool {
        if !self.walkable.iter().any(|z| z.contains(p)) {
            return false;
        }
        !self.obstacles.iter().any(|o| o.contains(p))
    }

    /// `true` iff every [`SAMPLE_STEP`]-spaced sample along `a..b` (endpoints
    /// included) is walkable.
    pub fn segment_walkable(&self, a: Vec2, b: Vec2) -> bool {
        let dist = a.distance(b);
        let steps = (dist / SAMPLE_STEP).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            if !self.is_walkable(a.lerp(b, t)) {
                return false;
            }
        }
        true
    }

    /// Index of the labeled zone containing `p`, or `None` in a hallway.
    ///
    /// Overlapping labeled zones resolve to the first match in declaration
    /// order.
    pub fn zone_at(&self, p: Vec2) -> Option<usize> {
        self.labeled.iter().position(|z| z.polygon.contains(p))
    }

    /// Name of a labeled zone by index.
    pub fn zone_name(&self, idx: usize) -> &str {
        &self.labeled[idx].name
    }

    /// Index of a labeled zone by name (case-sensitive).
    pub fn zone_by_name(&self, name: &str) -> Option<usize> {
        self.labeled.iter().position(|z| z.name == name)
    }

    /// `(min, max)` of the walkable area.  Empty maps report a zero box.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        self.bounds
    }

    pub fn labeled_count(&self) -> usize {
        self.labeled.len()
    }
}

// ── MapBuilder ────────────────────────────────────────────────────────────────

/// Construct a [`WorldMap`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use crew_core::Vec2;
/// use crew_map::{MapBuilder, Polygon};
///
/// let mut b = MapBuilder::new();
/// b.walkable_zone(Polygon::rect(Vec2::ZERO, Vec2::new(400.0, 300.0)), vec![]);
/// b.labeled_zone("cafeteria", Polygon::rect(Vec2::ZERO, Vec2::new(200.0, 300.0)));
/// let map = b.build();
/// assert!(map.is_walkable(Vec2::new(100.0, 100.0)));
/// assert!(!map.is_walkable(Vec2::new(500.0, 100.0)));
/// ```
#[derive(Default)]
pub struct MapBuilder {
    walkable: Vec<WalkableZone>,
    labeled: Vec<LabeledZone>,
    obstacles: Vec<Obstacle>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a walkable zone (outer polygon minus holes).
    pub fn walkable_zone(&mut self, outer: Polygon, holes: Vec<Polygon>) -> &mut Self {
        self.walkable.push(WalkableZone { outer, holes });
        self
    }

    /// Add a named room polygon.
    pub fn labeled_zone(&mut self, name: impl Into<String>, polygon: Polygon) -> &mut Self {
        self.labeled.push(LabeledZone { name: name.into(), polygon });
        self
    }

    /// Add a rounded-rectangle obstacle.
    pub fn obstacle(&mut self, min: Vec2, max: Vec2, corner_radius: f32) -> &mut Self {
        self.obstacles.push(Obstacle { min, max, corner_radius });
        self
    }

    /// Finalize.  Computes the walkable bounding box.
    pub fn build(self) -> WorldMap {
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for zone in &self.walkable {
            let (lo, hi) = zone.outer.bounds();
            min.x = min.x.min(lo.x);
            min.y = min.y.min(lo.y);
            max.x = max.x.max(hi.x);
            max.y = max.y.max(hi.y);
        }
        if self.walkable.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }
        WorldMap {
            walkable: self.walkable,
            labeled: self.labeled,
            obstacles: self.obstacles,
            bounds: (min, max),
        }
    }
}
