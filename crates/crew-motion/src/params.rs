//! Steering constants.

/// Tunables for the movement controller.  The defaults are the canonical
/// values; tests occasionally shrink radii to force edge cases.
#[derive(Clone, Debug)]
pub struct MotionParams {
    /// Nominal walking speed, u/s.
    pub cruise_speed: f32,
    /// Waypoint is considered reached within this distance.
    pub snap_radius: f32,
    /// Linear slow-down starts inside this distance of the goal.
    pub arrival_radius: f32,
    /// How many waypoints ahead the line-of-sight skip may jump.
    pub look_ahead_steps: usize,
    /// Length of the central whisker; side whiskers scale off it.
    pub whisker_base_len: f32,
    /// Sample spacing along each whisker.
    pub whisker_step: f32,
    /// Steering-force ceiling (12 × cruise speed by default).
    pub max_force: f32,
    /// Gain on the velocity-error term; also the avoidance weight base.
    pub damping: f32,
    /// Bisection iterations when a step lands in a wall.
    pub collision_iterations: u32,
    /// Displacement below this over `stuck_time_s` marks the agent stuck.
    pub stuck_distance: f32,
    pub stuck_time_s: f32,
    /// Facing only updates above this speed, u/s.
    pub facing_min_speed: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        let cruise_speed = 100.0;
        Self {
            cruise_speed,
            snap_radius: 18.0,
            arrival_radius: 28.0,
            look_ahead_steps: 4,
            whisker_base_len: 60.0,
            whisker_step: 6.0,
            max_force: 12.0 * cruise_speed,
            damping: 6.0,
            collision_iterations: 6,
            stuck_distance: 6.0,
            stuck_time_s: 1.2,
            facing_min_speed: 5.0,
        }
    }
}
