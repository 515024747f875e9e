//! Pose sampling over a deformation channel.
//!
//! The sampler evaluates the mesh at a schedule of deformation weights and
//! reduces each deformed pose to a single aggregate observation of the
//! cluster: its area-weighted position, its area-weighted normal, and a raw
//! tangent candidate taken from the seed triangle's leading edge. Sign and
//! drift correction of the tangent happen later, in
//! [`frame`](crate::frame); the sampler stays stateless.
//!
//! Per-weight evaluations are independent, so the sampler can fan them out
//! with rayon when the host mesh is expensive to evaluate.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::adapter::{DeformableMesh, EvaluatedPose};
use crate::cluster::SurfaceCluster;
use crate::error::{AttachError, Result};
use crate::mesh::{triangle_centroid, triangle_normal};

const EPS: f64 = 1e-10;

/// Options for pose sampling.
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Number of samples, evenly spaced over weights [0, 100] inclusive.
    ///
    /// A count of 1 degenerates to a single sample at weight 100 (the fully
    /// applied channel); a count of 0 is invalid.
    pub sample_count: usize,

    /// Whether to evaluate weights in parallel (default: false — host
    /// evaluators are cheap for typical cluster sizes).
    pub parallel: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            sample_count: 10,
            parallel: false,
        }
    }
}

impl SampleOptions {
    /// Set the number of samples.
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    /// Set whether to evaluate weights in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// One observation of the cluster at a single deformation weight.
///
/// The normal and tangent are unit vectors when the geometry permits; a
/// collapsed cluster yields zero vectors, which downstream stages treat as
/// a degenerate sample.
#[derive(Debug, Clone, Copy)]
pub struct PoseSample {
    /// Deformation weight (0-100) this sample was evaluated at.
    pub weight: f64,
    /// Area-weighted centroid of the cluster's deformed triangle centroids.
    pub position: Point3<f64>,
    /// Area-weighted average of deformed triangle normals, renormalized.
    pub normal: Vector3<f64>,
    /// Raw tangent candidate (seed-triangle edge projected orthogonal to
    /// the normal); not yet continuity-resolved.
    pub tangent: Vector3<f64>,
}

/// The evenly spaced weight schedule for `sample_count` samples.
///
/// Weights are strictly increasing by construction. `sample_count == 1`
/// yields `[100.0]`.
pub fn weight_schedule(sample_count: usize) -> Vec<f64> {
    if sample_count == 1 {
        return vec![100.0];
    }
    (0..sample_count)
        .map(|i| 100.0 * i as f64 / (sample_count - 1) as f64)
        .collect()
}

/// Sample a deformation channel over the weight schedule.
///
/// Each returned [`PoseSample`] is computed from a fresh evaluation of the
/// mesh at that weight; the sequence is ordered by strictly increasing
/// weight.
///
/// # Errors
///
/// - [`AttachError::InvalidParameter`] for a zero sample count.
/// - [`AttachError::UnknownChannel`] from the mesh evaluator.
pub fn sample_channel<M: DeformableMesh + Sync>(
    mesh: &M,
    channel: &str,
    cluster: &SurfaceCluster,
    options: &SampleOptions,
) -> Result<Vec<PoseSample>> {
    if options.sample_count == 0 {
        return Err(AttachError::invalid_param(
            "sample_count",
            0,
            "at least one sample is required",
        ));
    }

    let schedule = weight_schedule(options.sample_count);

    if options.parallel {
        schedule
            .par_iter()
            .map(|&weight| sample_at(mesh, channel, cluster, weight))
            .collect()
    } else {
        schedule
            .iter()
            .map(|&weight| sample_at(mesh, channel, cluster, weight))
            .collect()
    }
}

/// Sample a channel at a single deformation weight.
///
/// Used by [`sample_channel`] for every schedule entry, and by the pipeline
/// to obtain the explicit weight-0 rest sample when the schedule does not
/// start at zero (the single-sample edge case).
///
/// # Errors
///
/// Returns [`AttachError::UnknownChannel`] from the mesh evaluator.
pub fn sample_at<M: DeformableMesh + ?Sized>(
    mesh: &M,
    channel: &str,
    cluster: &SurfaceCluster,
    weight: f64,
) -> Result<PoseSample> {
    let pose = mesh.evaluate(channel, weight)?;
    Ok(aggregate_sample(mesh, cluster, &pose, weight))
}

/// Reduce one deformed pose to the cluster's aggregate observation.
fn aggregate_sample<M: DeformableMesh + ?Sized>(
    mesh: &M,
    cluster: &SurfaceCluster,
    pose: &EvaluatedPose,
    weight: f64,
) -> PoseSample {
    let triangles = mesh.triangles();

    let mut position = Vector3::zeros();
    let mut normal_sum = Vector3::zeros();

    for (&ti, &w) in cluster.anchors().iter().zip(cluster.weights()) {
        let [a, b, c] = triangles[ti];
        let p0 = &pose.positions[a];
        let p1 = &pose.positions[b];
        let p2 = &pose.positions[c];

        position += w * triangle_centroid(p0, p1, p2).coords;

        // Degenerate triangles contribute nothing to the normal.
        if let Some(n) = triangle_normal(p0, p1, p2) {
            normal_sum += w * n;
        }
    }

    let normal = {
        let len = normal_sum.norm();
        if len > EPS {
            normal_sum / len
        } else {
            Vector3::zeros()
        }
    };

    // Tangent candidate from the seed triangle's leading edge, projected
    // into the plane of the aggregate normal.
    let [a, b, _] = triangles[cluster.seed()];
    let edge = pose.positions[b] - pose.positions[a];
    let projected = edge - normal * normal.dot(&edge);
    let tangent = {
        let len = projected.norm();
        if len > EPS {
            projected / len
        } else {
            Vector3::zeros()
        }
    };

    PoseSample {
        weight,
        position: Point3::from(position),
        normal,
        tangent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{detect_cluster, DetectOptions};
    use crate::mesh::TriMesh;

    /// Flat unit quad in the xz plane, two triangles.
    fn quad_mesh() -> TriMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
        ];
        TriMesh::new(positions, vec![[0, 2, 1], [1, 2, 3]]).unwrap()
    }

    fn quad_cluster(mesh: &TriMesh) -> SurfaceCluster {
        let options = DetectOptions::default()
            .with_target_triangle_count(2)
            .with_search_radius(1.0);
        detect_cluster(mesh, &Point3::new(0.5, 0.0, 0.5), &options).unwrap()
    }

    #[test]
    fn test_weight_schedule() {
        assert_eq!(weight_schedule(1), vec![100.0]);
        assert_eq!(weight_schedule(2), vec![0.0, 100.0]);
        assert_eq!(weight_schedule(3), vec![0.0, 50.0, 100.0]);

        let schedule = weight_schedule(11);
        assert_eq!(schedule.len(), 11);
        assert_eq!(schedule[0], 0.0);
        assert_eq!(schedule[10], 100.0);
        for pair in schedule.windows(2) {
            assert!(pair[1] > pair[0], "weights must be strictly increasing");
        }
    }

    #[test]
    fn test_zero_sample_count_rejected() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::zeros(); 4], None).unwrap();
        let cluster = quad_cluster(&mesh);

        let options = SampleOptions::default().with_sample_count(0);
        let result = sample_channel(&mesh, "Test", &cluster, &options);
        assert!(matches!(result, Err(AttachError::InvalidParameter { .. })));
    }

    #[test]
    fn test_rest_sample_aggregates_quad() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::zeros(); 4], None).unwrap();
        let cluster = quad_cluster(&mesh);

        let options = SampleOptions::default().with_sample_count(2);
        let samples = sample_channel(&mesh, "Test", &cluster, &options).unwrap();
        assert_eq!(samples.len(), 2);

        // Equal-area triangles: cluster position is the quad centroid.
        let rest = &samples[0];
        assert!((rest.position - Point3::new(0.5, 0.0, 0.5)).norm() < 1e-10);
        assert!((rest.normal - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-10);
        assert!((rest.tangent.norm() - 1.0).abs() < 1e-10);
        assert!(rest.tangent.dot(&rest.normal).abs() < 1e-10);
    }

    #[test]
    fn test_translating_channel_moves_position() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::new(0.0, 1.0, 0.0); 4], None)
            .unwrap();
        let cluster = quad_cluster(&mesh);

        let options = SampleOptions::default().with_sample_count(3);
        let samples = sample_channel(&mesh, "Test", &cluster, &options).unwrap();

        let expected = [0.0, 0.5, 1.0];
        for (sample, y) in samples.iter().zip(expected) {
            assert!((sample.position - Point3::new(0.5, y, 0.5)).norm() < 1e-10);
            assert!((sample.normal - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-10);
        }
    }

    #[test]
    fn test_collapsed_geometry_yields_zero_normal() {
        // Channel that collapses the whole quad onto a line at weight 100.
        let mut mesh = quad_mesh();
        let deltas = vec![
            Vector3::zeros(),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(-1.0, 0.0, -1.0),
        ];
        mesh.add_channel("Collapse", deltas, None).unwrap();
        let cluster = quad_cluster(&mesh);

        let options = SampleOptions::default().with_sample_count(2);
        let samples = sample_channel(&mesh, "Collapse", &cluster, &options).unwrap();

        assert!(samples[0].normal.norm() > 0.5);
        assert!(samples[1].normal.norm() < EPS);
        assert!(samples[1].tangent.norm() < EPS);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut mesh = quad_mesh();
        let deltas = vec![
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        mesh.add_channel("Tilt", deltas, None).unwrap();
        let cluster = quad_cluster(&mesh);

        let sequential = sample_channel(
            &mesh,
            "Tilt",
            &cluster,
            &SampleOptions::default().with_sample_count(7),
        )
        .unwrap();
        let parallel = sample_channel(
            &mesh,
            "Tilt",
            &cluster,
            &SampleOptions::default().with_sample_count(7).with_parallel(true),
        )
        .unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.weight, p.weight);
            assert!((s.position - p.position).norm() < 1e-12);
            assert!((s.normal - p.normal).norm() < 1e-12);
            assert!((s.tangent - p.tangent).norm() < 1e-12);
        }
    }
}
