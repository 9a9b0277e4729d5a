//! The steering update.
//!
//! Per tick, for one walking agent:
//!
//! 1. Advance the waypoint cursor (snap radius), then line-of-sight skip up
//!    to `look_ahead_steps` further.
//! 2. Desired velocity toward the current target, slowing linearly inside
//!    the arrival radius on the final segment.
//! 3. Whisker obstacle probes add an avoidance force.
//! 4. Steering = (desired − velocity) + 1.4 × avoidance, gain-scaled and
//!    clamped to the force ceiling.
//! 5. Integrate and clamp speed.
//! 6. Bisect back to walkable ground if the step lands in a wall.
//! 7. Snap to the goal when the final step would overshoot it.
//! 8. Update facing above the facing threshold.
//! 9. Track progress for stuck detection.

use crew_agent::Agent;
use crew_core::Vec2;
use crew_map::WorldMap;

use crate::MotionParams;

/// Five forward whiskers: `(angle offset radians, length factor)`.
const WHISKERS: [(f32, f32); 5] = [
    (0.0, 1.0),
    (0.628_318_5, 0.75),  //  36°
    (-0.628_318_5, 0.75), // -36°
    (0.226_892_8, 0.5),   //  13°
    (-0.226_892_8, 0.5),  // -13°
];

/// Relative weight of avoidance vs. path-following in the steering sum.
const AVOIDANCE_WEIGHT: f32 = 1.4;

/// What happened during one movement update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MotionStep {
    /// The agent reached the end of its path this update.
    pub arrived: bool,
    /// The agent made less than `stuck_distance` of progress for at least
    /// `stuck_time_s` — the caller should replan.
    pub stuck: bool,
}

/// Per-agent steering state.  Holds only what must persist between ticks
/// (the stuck detector); everything else is derived per update.
pub struct MovementController {
    params: MotionParams,
    progress_point: Vec2,
    time_since_progress: f32,
}

impl MovementController {
    pub fn new(params: MotionParams, start: Vec2) -> Self {
        Self {
            params,
            progress_point: start,
            time_since_progress: 0.0,
        }
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Reset the stuck detector — call whenever a new path is assigned.
    pub fn reset(&mut self, position: Vec2) {
        self.progress_point = position;
        self.time_since_progress = 0.0;
    }

    /// Advance `agent` along its path by `dt` seconds.
    ///
    /// The caller guarantees `agent.path.len() >= 2` (the walking
    /// invariant); an empty path returns an immediate arrival.
    pub fn update(&mut self, agent: &mut Agent, map: &WorldMap, dt: f32) -> MotionStep {
        let p = &self.params;
        if agent.path.len() < 2 {
            return MotionStep { arrived: true, stuck: false };
        }
        let last = agent.path.len() - 1;
        let pos = agent.position;

        // ── 1. Waypoint advance + look-ahead skip ─────────────────────────
        while agent.path_index < last
            && pos.distance(agent.path[agent.path_index]) <= p.snap_radius
        {
            agent.path_index += 1;
        }
        let skip_limit = (agent.path_index + p.look_ahead_steps).min(last);
        for j in (agent.path_index + 1..=skip_limit).rev() {
            if map.segment_walkable(pos, agent.path[j]) {
                agent.path_index = j;
                break;
            }
        }

        let target = agent.path[agent.path_index];
        let goal = agent.path[last];
        let on_final = agent.path_index == last;

        // Arrived already?
        let goal_dist = pos.distance(goal);
        if on_final && goal_dist <= p.snap_radius {
            agent.position = goal;
            agent.velocity = Vec2::ZERO;
            return MotionStep { arrived: true, stuck: false };
        }

        // ── 2. Desired velocity ───────────────────────────────────────────
        let to_target = target - pos;
        let mut speed = p.cruise_speed;
        if on_final && goal_dist < p.arrival_radius {
            speed *= goal_dist / p.arrival_radius;
        }
        let desired = to_target.normalized() * speed;

        // ── 3. Whisker avoidance ──────────────────────────────────────────
        let heading = if agent.velocity.length() > 1.0 {
            agent.velocity.normalized()
        } else {
            to_target.normalized()
        };
        let avoidance = self.whisker_force(map, pos, heading);

        // ── 4–5. Steering and integration ─────────────────────────────────
        let steer = ((desired - agent.velocity) + avoidance * AVOIDANCE_WEIGHT) * p.damping;
        let force = steer.clamp_length(p.max_force);
        agent.velocity = (agent.velocity + force * dt).clamp_length(p.cruise_speed);
        let mut next = pos + agent.velocity * dt;

        // ── 6. Collision resolve ──────────────────────────────────────────
        if !map.is_walkable(next) {
            next = bisect_walkable(map, pos, next, p.collision_iterations);
            if next.distance_sq(pos) < 1e-6 {
                agent.velocity = Vec2::ZERO;
                next = pos;
            }
        }

        // ── 7. Overshoot clamp on the final segment ───────────────────────
        if on_final {
            let before = goal - pos;
            let after = goal - next;
            if before.dot(after) < 0.0 {
                next = goal;
                agent.velocity = Vec2::ZERO;
            }
        }

        // ── 8. Facing ─────────────────────────────────────────────────────
        if agent.velocity.length() > p.facing_min_speed {
            agent.facing = agent.velocity.angle();
        }

        agent.distance_traveled += next.distance(pos);
        agent.position = next;

        let arrived = on_final && next.distance(goal) <= p.snap_radius;
        if arrived {
            agent.velocity = Vec2::ZERO;
        }

        // ── 9. Stuck detection ────────────────────────────────────────────
        let mut stuck = false;
        if next.distance(self.progress_point) >= p.stuck_distance {
            self.progress_point = next;
            self.time_since_progress = 0.0;
        } else if !arrived {
            self.time_since_progress += dt;
            if self.time_since_progress >= p.stuck_time_s {
                stuck = true;
                // Re-arm so the next walk starts with a clean detector.
                self.time_since_progress = 0.0;
                self.progress_point = next;
            }
        }

        MotionStep { arrived, stuck }
    }

    /// Sum of push-away forces from the five whiskers.
    ///
    /// Each whisker is sampled every `whisker_step` units; the first
    /// non-walkable sample contributes `proximity² × cruise_speed` away from
    /// the blocked point, where proximity ∈ (0, 1] grows as the obstacle
    /// nears.
    fn whisker_force(&self, map: &WorldMap, pos: Vec2, heading: Vec2) -> Vec2 {
        let p = &self.params;
        if heading == Vec2::ZERO {
            return Vec2::ZERO;
        }
        let base_angle = heading.angle();
        let mut total = Vec2::ZERO;

        for &(offset, len_factor) in &WHISKERS {
            let dir = Vec2::from_angle(base_angle + offset);
            let len = p.whisker_base_len * len_factor;
            let steps = (len / p.whisker_step).ceil() as usize;
            for s in 1..=steps {
                let d = (s as f32 * p.whisker_step).min(len);
                let sample = pos + dir * d;
                if !map.is_walkable(sample) {
                    let proximity = 1.0 - d / len;
                    let away = (pos - sample).normalized();
                    total += away * (proximity * proximity * p.cruise_speed);
                    break;
                }
            }
        }
        total
    }
}

/// Binary-search the last walkable point on `[from, to]`.
fn bisect_walkable(map: &WorldMap, from: Vec2, to: Vec2, iterations: u32) -> Vec2 {
    let mut lo = 0.0f32; // known walkable
    let mut hi = 1.0f32; // known blocked
    for _ in 0..iterations {
        let mid = (lo + hi) * 0.5;
        if map.is_walkable(from.lerp(to, mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    from.lerp(to, lo)
}
