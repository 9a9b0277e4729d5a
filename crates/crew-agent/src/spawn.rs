//! Deterministic fleet generation: identities, roles, tasks, placement.

use rustc_hash::FxHashSet;
use tracing::info;

use crew_core::{AgentId, SimRng, Vec2};
use crew_map::WorldMap;

use crate::{ActivityState, Agent, AgentStore, AssignedTask, RecentEvents, Role};

/// Color-word identities.  Order matters: the first `num_agents` entries are
/// used, so small fleets always get the classic colors.
const PALETTE: &[(&str, u32)] = &[
    ("Red", 0xC5_11_11),
    ("Blue", 0x13_2E_D1),
    ("Green", 0x11_7F_2D),
    ("Pink", 0xED_54_BA),
    ("Orange", 0xEF_7D_0D),
    ("Yellow", 0xF5_F5_57),
    ("Black", 0x3F_47_4E),
    ("White", 0xD6_E0_F0),
    ("Purple", 0x6B_2F_BB),
    ("Brown", 0x71_49_1E),
    ("Cyan", 0x38_FE_DC),
    ("Lime", 0x50_EF_39),
];

/// Task catalogue.  `(task_type, duration_ms)`; the room is drawn from the
/// map's labeled zones at generation time.
const TASK_TABLE: &[(&str, u64)] = &[
    ("fix_wiring", 5_000),
    ("download_data", 7_000),
    ("fuel_engines", 6_000),
    ("calibrate_distributor", 4_000),
    ("empty_garbage", 3_000),
    ("align_engine", 5_000),
    ("chart_course", 4_000),
    ("stabilize_steering", 3_000),
];

/// Tasks assigned to each crewmate.
const TASKS_PER_CREWMATE: usize = 4;

/// Knobs the spawner needs from the resolved configuration.
#[derive(Clone, Debug)]
pub struct SpawnParams {
    pub num_agents: usize,
    pub vision_radius: f32,
    pub action_radius: f32,
    /// Used to desynchronize initial thought clocks across the fleet.
    pub thought_cooldown_ms: u64,
    pub speech_cooldown_ms: u64,
    pub random_thought_interval_ms: [u64; 2],
}

/// Generate the full fleet deterministically from `rng`.
///
/// - Names/colors come from the palette (wrapping with a numeric suffix past
///   12 agents).
/// - One impostor per 5 agents (minimum 1 once the fleet has 4+ members).
/// - Crewmates get [`TASKS_PER_CREWMATE`] tasks at random labeled zones;
///   impostors get none.
/// - Initial trigger clocks are jittered so a fleet of N does not think in
///   lockstep.
pub fn spawn_fleet(
    params: &SpawnParams,
    map: &WorldMap,
    rng: &mut SimRng,
    now_ms: u64,
) -> AgentStore {
    let n = params.num_agents;

    // ── Role assignment ───────────────────────────────────────────────────
    let impostor_count = if n >= 4 { (n / 5).max(1) } else { 0 };
    let mut indices: Vec<usize> = (0..n).collect();
    rng.shuffle(&mut indices);
    let impostors: FxHashSet<usize> = indices.into_iter().take(impostor_count).collect();

    let mut agents = Vec::with_capacity(n);
    for i in 0..n {
        let (base_name, color) = PALETTE[i % PALETTE.len()];
        let name = if i < PALETTE.len() {
            base_name.to_string()
        } else {
            format!("{base_name}{}", i / PALETTE.len() + 1)
        };
        let role = if impostors.contains(&i) { Role::Impostor } else { Role::Crewmate };

        let position = random_walkable_point(map, rng);
        let assigned_tasks = match role {
            Role::Crewmate => generate_tasks(map, rng),
            Role::Impostor => Vec::new(),
        };

        let [lo, hi] = params.random_thought_interval_ms;
        let agent = Agent {
            id: AgentId(i as u32),
            name,
            color,
            role,
            position,
            velocity: Vec2::ZERO,
            facing: 0.0,
            distance_traveled: 0.0,
            path: Vec::new(),
            path_index: 0,
            activity_state: ActivityState::Idle,
            current_zone: map.zone_at(position),
            assigned_tasks,
            current_task_index: None,
            vision_radius: params.vision_radius,
            action_radius: params.action_radius,
            is_thinking: false,
            // Backdate clocks by a random fraction of the cooldown so the
            // fleet's first thoughts spread out over the window.
            last_thought_ms: now_ms.saturating_sub(rng.gen_range(0..params.thought_cooldown_ms.max(1))),
            last_speech_ms: now_ms.saturating_sub(rng.gen_range(0..params.speech_cooldown_ms.max(1))),
            next_random_thought_ms: now_ms + rng.gen_range(lo..=hi),
            current_thought: None,
            recent_speech: None,
            current_goal: None,
            previously_visible: FxHashSet::default(),
            recent_events: RecentEvents::new(),
            conversation: None,
        };
        agents.push(agent);
    }

    info!(
        agents = n,
        impostors = impostor_count,
        "fleet spawned"
    );
    AgentStore::new(agents)
}

/// Rejection-sample a walkable point; falls back to the first labeled zone's
/// centroid if the map is hostile to sampling.
fn random_walkable_point(map: &WorldMap, rng: &mut SimRng) -> Vec2 {
    let (min, max) = map.bounds();
    for _ in 0..256 {
        let p = Vec2::new(
            rng.gen_range(min.x..=max.x),
            rng.gen_range(min.y..=max.y),
        );
        if map.is_walkable(p) {
            return p;
        }
    }
    map.labeled
        .first()
        .map(|z| z.polygon.centroid())
        .unwrap_or(Vec2::ZERO)
}

/// Draw [`TASKS_PER_CREWMATE`] tasks at distinct random rooms (rooms repeat
/// only when the map has fewer rooms than tasks).
fn generate_tasks(map: &WorldMap, rng: &mut SimRng) -> Vec<AssignedTask> {
    if map.labeled.is_empty() {
        return Vec::new();
    }
    let mut rooms: Vec<usize> = (0..map.labeled.len()).collect();
    rng.shuffle(&mut rooms);

    let mut tasks = Vec::with_capacity(TASKS_PER_CREWMATE);
    for k in 0..TASKS_PER_CREWMATE {
        let room_idx = rooms[k % rooms.len()];
        let zone = &map.labeled[room_idx];
        let (task_type, duration_ms) = TASK_TABLE[rng.gen_range(0..TASK_TABLE.len())];
        let position = point_in_zone(map, room_idx, rng);
        tasks.push(AssignedTask::new(task_type, zone.name.clone(), position, duration_ms));
    }
    tasks
}

/// Walkable point inside the zone, preferring samples near the centroid.
fn point_in_zone(map: &WorldMap, zone_idx: usize, rng: &mut SimRng) -> Vec2 {
    let zone = &map.labeled[zone_idx];
    let centroid = zone.polygon.centroid();
    let (min, max) = zone.polygon.bounds();
    for _ in 0..64 {
        let p = Vec2::new(
            rng.gen_range(min.x..=max.x),
            rng.gen_range(min.y..=max.y),
        );
        if zone.polygon.contains(p) && map.is_walkable(p) {
            return p;
        }
    }
    centroid
}
