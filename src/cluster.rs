//! Surface cluster detection.
//!
//! Given a query point near a mesh's rest surface, this module locates the
//! best local triangle neighborhood ("cluster") to attach to: the nearest
//! triangle seeds the cluster, which is then grown outward over the
//! shared-edge adjacency graph until it reaches the requested size.
//!
//! The cluster carries precomputed rest-pose area weights so the sampler
//! can aggregate deformed positions and normals without re-deriving areas
//! at every weight.
//!
//! # Example
//!
//! ```
//! use limpet::cluster::{detect_cluster, DetectOptions};
//! use limpet::mesh::TriMesh;
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(1.0, 0.0, 1.0),
//! ];
//! let mesh = TriMesh::new(positions, vec![[0, 1, 2], [1, 3, 2]]).unwrap();
//!
//! let options = DetectOptions::default()
//!     .with_target_triangle_count(2)
//!     .with_search_radius(0.5);
//! let cluster = detect_cluster(&mesh, &Point3::new(0.5, 0.1, 0.5), &options).unwrap();
//! assert_eq!(cluster.len(), 2);
//! ```

use std::collections::VecDeque;

use nalgebra::Point3;

use crate::adapter::DeformableMesh;
use crate::error::{AttachError, Result};
use crate::mesh::{triangle_area, triangle_centroid, TriangleAdjacency};

/// Options for cluster detection.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Number of triangles to collect. The cluster may be smaller if the
    /// seed's connected component is exhausted first.
    pub target_triangle_count: usize,

    /// Maximum point-to-triangle distance for automatic seed selection.
    pub search_radius: f64,

    /// Manual seed triangle index. When set (and valid), it overrides the
    /// nearest-triangle search entirely.
    pub seed_triangle: Option<usize>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            target_triangle_count: 8,
            search_radius: 0.1,
            seed_triangle: None,
        }
    }
}

impl DetectOptions {
    /// Set the number of triangles to collect.
    pub fn with_target_triangle_count(mut self, count: usize) -> Self {
        self.target_triangle_count = count;
        self
    }

    /// Set the search radius for automatic seed selection.
    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius.max(0.0);
        self
    }

    /// Set a manual seed triangle, bypassing the nearest-triangle search.
    pub fn with_seed_triangle(mut self, index: usize) -> Self {
        self.seed_triangle = Some(index);
        self
    }
}

/// A connected neighborhood of triangles used as the local surface sample
/// region.
///
/// Invariants: non-empty, all anchor indices valid in the source mesh,
/// anchors connected under shared-edge adjacency (grown outward from the
/// seed), and area weights normalized to sum to 1.
#[derive(Debug, Clone)]
pub struct SurfaceCluster {
    anchors: Vec<usize>,
    weights: Vec<f64>,
    seed: usize,
}

impl SurfaceCluster {
    /// The anchor triangle indices, in growth order (seed first).
    pub fn anchors(&self) -> &[usize] {
        &self.anchors
    }

    /// Normalized rest-pose area weight per anchor, aligned with
    /// [`anchors`](SurfaceCluster::anchors).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The seed triangle index.
    pub fn seed(&self) -> usize {
        self.seed
    }

    /// Number of anchor triangles.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the cluster is empty. Always `false` for clusters produced
    /// by [`detect_cluster`]; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Find the best local triangle cluster of the rest surface near a query
/// point.
///
/// Seeding: a valid manual override in `options` wins; otherwise the
/// triangle nearest to `query_point` by exact point-to-triangle distance,
/// within `search_radius`. Growth: breadth-first over shared-edge
/// adjacency, ring by ring, until `target_triangle_count` triangles are
/// collected or the connected component runs out (a partial cluster is
/// valid — downstream only needs one triangle). Within a ring, candidates
/// are taken closest-to-seed-centroid first so repeated runs produce
/// identical clusters.
///
/// # Errors
///
/// - [`AttachError::EmptyMesh`] if the mesh has no triangles.
/// - [`AttachError::InvalidSeedTriangle`] for an out-of-range manual seed.
/// - [`AttachError::NoTriangleInRange`] if no triangle lies within the
///   search radius.
/// - [`AttachError::InvalidParameter`] for a zero target count.
pub fn detect_cluster<M: DeformableMesh>(
    mesh: &M,
    query_point: &Point3<f64>,
    options: &DetectOptions,
) -> Result<SurfaceCluster> {
    let positions = mesh.rest_positions();
    let triangles = mesh.triangles();

    if triangles.is_empty() {
        return Err(AttachError::EmptyMesh);
    }
    if options.target_triangle_count == 0 {
        return Err(AttachError::invalid_param(
            "target_triangle_count",
            0,
            "cluster must contain at least one triangle",
        ));
    }

    let seed = match options.seed_triangle {
        Some(index) => {
            if index >= triangles.len() {
                return Err(AttachError::InvalidSeedTriangle {
                    index,
                    count: triangles.len(),
                });
            }
            index
        }
        None => nearest_triangle(positions, triangles, query_point, options.search_radius)?,
    };

    let adjacency = TriangleAdjacency::build(triangles);
    let anchors = grow_cluster(
        positions,
        triangles,
        &adjacency,
        seed,
        options.target_triangle_count,
    );

    // Normalized rest-pose area weights per anchor.
    let areas: Vec<f64> = anchors
        .iter()
        .map(|&ti| {
            let [a, b, c] = triangles[ti];
            triangle_area(&positions[a], &positions[b], &positions[c])
        })
        .collect();
    let total: f64 = areas.iter().sum();
    let weights = if total > 1e-12 {
        areas.iter().map(|a| a / total).collect()
    } else {
        // All-degenerate cluster; fall back to uniform weights so the
        // sampler can still aggregate (and report degeneracy per sample).
        vec![1.0 / anchors.len() as f64; anchors.len()]
    };

    Ok(SurfaceCluster {
        anchors,
        weights,
        seed,
    })
}

/// Find the triangle nearest to the query point, by exact point-to-triangle
/// distance, within `radius`.
fn nearest_triangle(
    positions: &[Point3<f64>],
    triangles: &[[usize; 3]],
    query: &Point3<f64>,
    radius: f64,
) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (ti, tri) in triangles.iter().enumerate() {
        let closest = closest_point_on_triangle(
            query,
            &positions[tri[0]],
            &positions[tri[1]],
            &positions[tri[2]],
        );
        let dist = (query - closest).norm();
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((ti, dist)),
        }
    }

    match best {
        Some((ti, dist)) if dist <= radius => Ok(ti),
        _ => Err(AttachError::NoTriangleInRange { radius }),
    }
}

/// Breadth-first cluster growth from a seed triangle.
///
/// Rings are expanded one adjacency step at a time; within a ring,
/// candidates are sorted by (centroid distance to the seed centroid,
/// triangle index) before being taken, which makes the result independent
/// of hash-map iteration order.
fn grow_cluster(
    positions: &[Point3<f64>],
    triangles: &[[usize; 3]],
    adjacency: &TriangleAdjacency,
    seed: usize,
    target_count: usize,
) -> Vec<usize> {
    let centroid_of = |ti: usize| {
        let [a, b, c] = triangles[ti];
        triangle_centroid(&positions[a], &positions[b], &positions[c])
    };
    let seed_centroid = centroid_of(seed);

    let mut collected = vec![seed];
    let mut visited = vec![false; triangles.len()];
    visited[seed] = true;

    let mut ring: VecDeque<usize> = VecDeque::new();
    ring.push_back(seed);

    while collected.len() < target_count && !ring.is_empty() {
        // Gather the next ring of unvisited neighbors.
        let mut candidates: Vec<usize> = Vec::new();
        while let Some(ti) = ring.pop_front() {
            for &n in adjacency.neighbors(ti) {
                if !visited[n] {
                    visited[n] = true;
                    candidates.push(n);
                }
            }
        }

        // Closest-to-seed first; index as the final tie-break.
        candidates.sort_by(|&a, &b| {
            let da = (centroid_of(a) - seed_centroid).norm();
            let db = (centroid_of(b) - seed_centroid).norm();
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        for &ti in &candidates {
            if collected.len() >= target_count {
                break;
            }
            collected.push(ti);
        }
        ring.extend(candidates);
    }

    collected
}

/// Closest point on a triangle to a query point.
///
/// Standard Voronoi-region case analysis over the triangle's vertices,
/// edges, and interior.
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + v * ab;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + w * ac;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + w * (c - b);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
