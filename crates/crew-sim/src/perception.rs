//! Per-agent perception: who can be seen, who can be spoken to.
//!
//! Sight and hearing both require an unbroken line (8-unit walkability
//! samples, so walls occlude) plus a range check — `vision_radius` per
//! viewer for sight, the global `speech_range` for hearing.  Only living
//! agents appear in either set.

use crew_agent::AgentStore;
use crew_core::AgentId;
use crew_map::WorldMap;

/// One agent's view of the world this tick.
#[derive(Clone, Debug, Default)]
pub struct PerceptionView {
    /// `(id, name, distance)` of every visible living agent.
    pub visible: Vec<(AgentId, String, f32)>,
    /// `(id, name)` of every agent in unoccluded speech range.
    pub can_speak_to: Vec<(AgentId, String)>,
}

impl PerceptionView {
    pub fn sees(&self, id: AgentId) -> bool {
        self.visible.iter().any(|(v, _, _)| *v == id)
    }

    pub fn can_speak_names(&self) -> Vec<String> {
        self.can_speak_to.iter().map(|(_, n)| n.clone()).collect()
    }
}

/// Recompute perception for every agent.
///
/// Pairwise work is shared: distance and occlusion are evaluated once per
/// unordered pair, then applied in both directions (vision radii may differ
/// per viewer).  O(N² · L/8) worst case, far below the tick budget at fleet
/// sizes this server runs.
pub fn compute_perception(
    map: &WorldMap,
    agents: &AgentStore,
    speech_range: f32,
) -> Vec<PerceptionView> {
    let n = agents.len();
    let mut views = vec![PerceptionView::default(); n];

    for i in 0..n {
        let a = match agents.get(AgentId(i as u32)) {
            Some(a) if a.is_alive() => a,
            _ => continue,
        };
        for j in (i + 1)..n {
            let b = match agents.get(AgentId(j as u32)) {
                Some(b) if b.is_alive() => b,
                _ => continue,
            };

            let dist = a.position.distance(b.position);
            let max_range = a.vision_radius.max(b.vision_radius).max(speech_range);
            if dist > max_range {
                continue;
            }
            if !map.segment_walkable(a.position, b.position) {
                continue;
            }

            if dist <= a.vision_radius {
                views[i].visible.push((b.id, b.name.clone(), dist));
            }
            if dist <= b.vision_radius {
                views[j].visible.push((a.id, a.name.clone(), dist));
            }
            if dist <= speech_range {
                views[i].can_speak_to.push((b.id, b.name.clone()));
                views[j].can_speak_to.push((a.id, a.name.clone()));
            }
        }
    }

    views
}
