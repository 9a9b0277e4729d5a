//! Visibility-graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for edges.  Given a
//! `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! `edge_to` and `edge_cost` are sorted by source node, so iterating one
//! node's neighbors is a contiguous memory scan — ideal for A*'s inner loop.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps positions to the nearest `NodeId`.  Used for
//! wander-target selection and diagnostics; the pathfinder itself connects
//! dynamic endpoints by line-of-sight, not proximity.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crew_core::{NodeId, Vec2};
use crew_map::WorldMap;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D point with the associated
/// `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2],
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── NavGraph ──────────────────────────────────────────────────────────────────

/// Dense static visibility graph over nav nodes.
///
/// All fields are `pub(crate)` for direct indexed access from the A*
/// implementation.  Do not construct directly; use [`NavGraphBuilder`].
pub struct NavGraph {
    /// Position of each node.  Indexed by `NodeId`.
    pub(crate) node_pos: Vec<Vec2>,

    /// CSR row pointer.  Length = `node_count + 1`.
    pub(crate) node_out_start: Vec<u32>,

    /// Destination node of each edge, sorted by source node.
    pub(crate) edge_to: Vec<NodeId>,

    /// Euclidean cost of each edge, parallel to `edge_to`.
    pub(crate) edge_cost: Vec<f32>,

    spatial_idx: RTree<NodeEntry>,
}

impl NavGraph {
    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    #[inline]
    pub fn position(&self, node: NodeId) -> Vec2 {
        self.node_pos[node.index()]
    }

    /// Iterator over `(neighbor, cost)` pairs for `node`.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f32)> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| (self.edge_to[i], self.edge_cost[i]))
    }

    /// The nav node nearest to `pos`; `None` only for an empty graph.
    pub fn nearest_node(&self, pos: Vec2) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.x, pos.y])
            .map(|e| e.id)
    }

    /// Up to `k` nearest nodes to `pos`, ascending by distance.
    pub fn k_nearest_nodes(&self, pos: Vec2, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.x, pos.y])
            .take(k)
            .map(|e| e.id)
            .collect()
    }
}

// ── NavGraphBuilder ───────────────────────────────────────────────────────────

/// Samples nav nodes from a map and links mutually visible pairs.
///
/// Node sources, in order:
/// 1. The centroid of every labeled zone (when walkable).
/// 2. A corridor grid over the walkable bounding box at `spacing` units,
///    skipping samples that crowd an existing node.
///
/// Edge rule: an edge exists iff the straight segment between two node
/// positions is fully walkable (8-unit samples, via
/// [`WorldMap::segment_walkable`]).  Edge cost is Euclidean distance.
pub struct NavGraphBuilder {
    spacing: f32,
}

impl NavGraphBuilder {
    /// Default corridor-grid spacing, in world units.
    pub const DEFAULT_SPACING: f32 = 80.0;

    pub fn new() -> Self {
        Self { spacing: Self::DEFAULT_SPACING }
    }

    /// Override the corridor sample spacing (minimum 16).
    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing.max(16.0);
        self
    }

    /// Sample nodes and build the visibility graph.
    ///
    /// Time complexity: O(N² · L/8) edge probes for N nodes and typical
    /// sight-line length L — paid once at load.
    pub fn from_map(self, map: &WorldMap) -> NavGraph {
        let mut nodes: Vec<Vec2> = Vec::new();

        // Zone centroids first: rooms always get a node, which keeps paths
        // flowing through door-to-room-center chains.
        for zone in &map.labeled {
            let c = zone.polygon.centroid();
            if map.is_walkable(c) {
                nodes.push(c);
            }
        }

        // Corridor grid over the walkable bounds.
        let (min, max) = map.bounds();
        let min_sep_sq = (self.spacing * 0.5) * (self.spacing * 0.5);
        let mut y = min.y + self.spacing * 0.5;
        while y < max.y {
            let mut x = min.x + self.spacing * 0.5;
            while x < max.x {
                let p = Vec2::new(x, y);
                if map.is_walkable(p)
                    && !nodes.iter().any(|&n| n.distance_sq(p) < min_sep_sq)
                {
                    nodes.push(p);
                }
                x += self.spacing;
            }
            y += self.spacing;
        }

        // All-pairs line-of-sight probe.
        let n = nodes.len();
        let mut raw_edges: Vec<(NodeId, NodeId, f32)> = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if map.segment_walkable(nodes[i], nodes[j]) {
                    let cost = nodes[i].distance(nodes[j]);
                    raw_edges.push((NodeId(i as u32), NodeId(j as u32), cost));
                    raw_edges.push((NodeId(j as u32), NodeId(i as u32), cost));
                }
            }
        }
        raw_edges.sort_unstable_by_key(|&(from, to, _)| (from, to));

        // CSR construction.
        let mut node_out_start = vec![0u32; n + 1];
        for &(from, _, _) in &raw_edges {
            node_out_start[from.index() + 1] += 1;
        }
        for i in 1..=n {
            node_out_start[i] += node_out_start[i - 1];
        }
        let edge_to: Vec<NodeId> = raw_edges.iter().map(|&(_, to, _)| to).collect();
        let edge_cost: Vec<f32> = raw_edges.iter().map(|&(_, _, c)| c).collect();

        // Bulk-load the R-tree (faster than N inserts).
        let entries: Vec<NodeEntry> = nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: [pos.x, pos.y], id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        NavGraph {
            node_pos: nodes,
            node_out_start,
            edge_to,
            edge_cost,
            spatial_idx,
        }
    }
}

impl Default for NavGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
