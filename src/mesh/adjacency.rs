//! Shared-edge triangle adjacency.

use std::collections::HashMap;

/// Adjacency graph over a triangle list.
///
/// Two triangles are adjacent when they share an edge, i.e. the same
/// unordered pair of vertex indices. The graph is built once per mesh and
/// reused by the cluster detector's breadth-first growth.
#[derive(Debug, Clone)]
pub struct TriangleAdjacency {
    neighbors: Vec<Vec<usize>>,
}

impl TriangleAdjacency {
    /// Build the adjacency graph for a triangle list.
    ///
    /// Non-manifold edges (more than two incident triangles) are accepted:
    /// every triangle sharing the edge becomes mutually adjacent. This keeps
    /// the detector usable on the messy meshes that show up in practice.
    pub fn build(triangles: &[[usize; 3]]) -> Self {
        // Map from undirected edge to the triangles containing it.
        let mut edge_map: HashMap<(usize, usize), Vec<usize>> = HashMap::new();

        for (ti, tri) in triangles.iter().enumerate() {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let edge = (a.min(b), a.max(b));
                edge_map.entry(edge).or_default().push(ti);
            }
        }

        let mut neighbors = vec![Vec::new(); triangles.len()];
        for incident in edge_map.values() {
            for &a in incident {
                for &b in incident {
                    if a != b {
                        neighbors[a].push(b);
                    }
                }
            }
        }

        // Deterministic neighbor order, no duplicates.
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self { neighbors }
    }

    /// Number of triangles in the graph.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The triangles sharing an edge with `triangle`, in ascending order.
    pub fn neighbors(&self, triangle: usize) -> &[usize] {
        &self.neighbors[triangle]
    }

    /// Whether two triangles share an edge.
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbors[a].binary_search(&b).is_ok()
    }
}
