//! Waypoint-chain resampling for the steering controller.

use crew_core::Vec2;

/// Maximum chord length of a smoothed path segment, in world units.
pub const MAX_CHORD: f32 = 20.0;

/// Resample a coarse waypoint chain into a polyline whose chords are at most
/// [`MAX_CHORD`] units, by linear interpolation between consecutive
/// waypoints.
///
/// Endpoints are preserved exactly.  The operation is deterministic and
/// idempotent: a path whose chords already satisfy the bound passes through
/// unchanged.
pub fn smooth_path(waypoints: &[Vec2]) -> Vec<Vec2> {
    if waypoints.len() < 2 {
        return waypoints.to_vec();
    }

    let mut out = Vec::with_capacity(waypoints.len() * 2);
    out.push(waypoints[0]);

    for pair in waypoints.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dist = a.distance(b);
        let steps = (dist / MAX_CHORD).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            // Push the exact endpoint on the final step so float error never
            // accumulates into the waypoint positions.
            out.push(if i == steps { b } else { a.lerp(b, t) });
        }
    }

    out
}
