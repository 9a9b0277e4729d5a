//! Simple polygon type with containment and centroid queries.

use crew_core::Vec2;

/// A closed polygon given as a vertex ring (no explicit closing vertex).
///
/// Winding order does not matter for any query here.  Degenerate polygons
/// (< 3 vertices) contain nothing and have a centroid equal to their vertex
/// average.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle helper — common enough in room layouts to
    /// deserve a shorthand.
    pub fn rect(min: Vec2, max: Vec2) -> Self {
        Self {
            points: vec![
                min,
                Vec2::new(max.x, min.y),
                max,
                Vec2::new(min.x, max.y),
            ],
        }
    }

    /// Even-odd ray-crossing containment test.
    ///
    /// Points exactly on an edge may land on either side; the 8-unit
    /// walkability sampling makes that ambiguity harmless in practice.
    pub fn contains(&self, p: Vec2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Area-weighted centroid (shoelace).  Falls back to the vertex average
    /// for degenerate (zero-area) rings.
    pub fn centroid(&self) -> Vec2 {
        let n = self.points.len();
        if n == 0 {
            return Vec2::ZERO;
        }
        let mut area2 = 0.0f32;
        let mut cx = 0.0f32;
        let mut cy = 0.0f32;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[j];
            let b = self.points[i];
            let cross = a.x * b.y - b.x * a.y;
            area2 += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
            j = i;
        }
        if area2.abs() < f32::EPSILON {
            let sum = self
                .points
                .iter()
                .fold(Vec2::ZERO, |acc, &p| acc + p);
            return sum * (1.0 / n as f32);
        }
        let inv = 1.0 / (3.0 * area2);
        Vec2::new(cx * inv, cy * inv)
    }

    /// `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}
