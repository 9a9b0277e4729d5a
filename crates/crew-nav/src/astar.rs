//! A* over the visibility graph with per-query dynamic endpoints.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crew_core::{NodeId, Vec2};
use crew_map::WorldMap;

use crate::{NavError, NavGraph};

// ── Heap entry ────────────────────────────────────────────────────────────────

/// Min-heap entry ordered by `(f, g, node)`.
///
/// The secondary key makes ties resolve toward the **lower g-cost** branch;
/// the tertiary key keeps expansion order deterministic.
struct HeapEntry {
    f: f32,
    g: f32,
    node: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest f first.
        other
            .f
            .total_cmp(&self.f)
            .then(other.g.total_cmp(&self.g))
            .then(other.node.cmp(&self.node))
    }
}

// ── find_path ─────────────────────────────────────────────────────────────────

/// Compute a waypoint path from `start` to `end`.
///
/// Temporary start/end nodes are connected to every static node they can see;
/// a direct edge is added when the endpoints see each other.  The output is
/// `[start, intermediate node positions…, end]`.
///
/// Fails with [`NavError::Unconnected`] when either endpoint sees no static
/// node (and no direct line exists), or [`NavError::NoPath`] when the graph
/// search exhausts without reaching the goal.
pub fn find_path(
    map: &WorldMap,
    graph: &NavGraph,
    start: Vec2,
    end: Vec2,
) -> Result<Vec<Vec2>, NavError> {
    if start == end {
        return Ok(vec![start, end]);
    }

    // Direct sight line dominates any detour by the triangle inequality.
    if map.segment_walkable(start, end) {
        return Ok(vec![start, end]);
    }

    let n = graph.node_count();
    // Virtual indices for the per-query endpoints.
    let start_idx = n;
    let end_idx = n + 1;

    // Connect the dynamic endpoints to every visible static node.
    let mut start_links: Vec<(usize, f32)> = Vec::new();
    let mut end_link_cost: Vec<f32> = vec![f32::INFINITY; n];
    let mut end_connected = false;
    for i in 0..n {
        let pos = graph.node_pos[i];
        if map.segment_walkable(start, pos) {
            start_links.push((i, start.distance(pos)));
        }
        if map.segment_walkable(pos, end) {
            end_link_cost[i] = pos.distance(end);
            end_connected = true;
        }
    }
    if start_links.is_empty() {
        return Err(NavError::Unconnected { endpoint: "start" });
    }
    if !end_connected {
        return Err(NavError::Unconnected { endpoint: "end" });
    }

    let pos_of = |idx: usize| -> Vec2 {
        if idx == start_idx {
            start
        } else if idx == end_idx {
            end
        } else {
            graph.node_pos[idx]
        }
    };
    let heuristic = |idx: usize| pos_of(idx).distance(end);

    let mut dist = vec![f32::INFINITY; n + 2];
    let mut prev = vec![usize::MAX; n + 2];
    let mut heap = BinaryHeap::new();

    dist[start_idx] = 0.0;
    heap.push(HeapEntry { f: heuristic(start_idx), g: 0.0, node: start_idx });

    while let Some(HeapEntry { g, node, .. }) = heap.pop() {
        if node == end_idx {
            return Ok(reconstruct(&prev, end_idx, &pos_of));
        }
        // Skip stale heap entries.
        if g > dist[node] {
            continue;
        }

        let relax = |next: usize, cost: f32, dist: &mut Vec<f32>, prev: &mut Vec<usize>,
                     heap: &mut BinaryHeap<HeapEntry>| {
            let ng = g + cost;
            if ng < dist[next] {
                dist[next] = ng;
                prev[next] = node;
                heap.push(HeapEntry { f: ng + heuristic(next), g: ng, node: next });
            }
        };

        if node == start_idx {
            for &(next, cost) in &start_links {
                relax(next, cost, &mut dist, &mut prev, &mut heap);
            }
        } else {
            for (next, cost) in graph.neighbors(NodeId(node as u32)) {
                relax(next.index(), cost, &mut dist, &mut prev, &mut heap);
            }
            if end_link_cost[node].is_finite() {
                relax(end_idx, end_link_cost[node], &mut dist, &mut prev, &mut heap);
            }
        }
    }

    Err(NavError::NoPath)
}

fn reconstruct(prev: &[usize], end_idx: usize, pos_of: &impl Fn(usize) -> Vec2) -> Vec<Vec2> {
    let mut indices = vec![end_idx];
    let mut cur = end_idx;
    while prev[cur] != usize::MAX {
        cur = prev[cur];
        indices.push(cur);
    }
    indices.reverse();
    indices.into_iter().map(pos_of).collect()
}
