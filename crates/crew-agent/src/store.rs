//! The agent store.

use crew_core::AgentId;

use crate::Agent;

/// Owns every agent for the run, indexed by `AgentId`.
///
/// Agents are created at simulation start and never removed, so `AgentId`
/// doubles as a stable `Vec` index for the whole run.
pub struct AgentStore {
    agents: Vec<Agent>,
}

impl AgentStore {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    /// All living agents.
    pub fn living(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|a| a.is_alive())
    }

    /// Ids of all agents, in index order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.agents.len()).map(|i| AgentId(i as u32))
    }

    /// Resolve an agent by display name (case-insensitive).
    pub fn by_name(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Disjoint mutable borrows of two distinct agents.
    ///
    /// # Panics
    /// Panics if `a == b` or either index is out of bounds.
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> (&mut Agent, &mut Agent) {
        assert_ne!(a, b, "pair_mut requires distinct agents");
        let (lo, hi, swapped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (head, tail) = self.agents.split_at_mut(hi.index());
        let first = &mut head[lo.index()];
        let second = &mut tail[0];
        if swapped { (second, first) } else { (first, second) }
    }
}
