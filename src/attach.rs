//! The full attachment pipeline.
//!
//! Orchestrates the solver stages per (attachment point, channel) pair:
//! detect a cluster near the attachment, sample the channel over the
//! weight schedule, build the rest context at weight 0, solve each sample
//! with tangent and rotation continuity, then synthesize curves.
//!
//! Failures are scoped to the smallest unit: a degenerate sample is
//! dropped, a channel whose every sample degenerates yields no curves (and
//! a warning), and an unreachable attachment aborts only that attachment.
//! The continuity accumulators live on this module's stack frames, so they
//! cannot leak between channels or between attachment points.
//!
//! # Example
//!
//! ```
//! use limpet::attach::{solve_all_channels, AttachOptions};
//! use limpet::adapter::RestTransforms;
//! use limpet::mesh::TriMesh;
//! use nalgebra::{Isometry3, Point3, Vector3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(1.0, 0.0, 1.0),
//! ];
//! let mut mesh = TriMesh::new(positions, vec![[0, 2, 1], [1, 2, 3]]).unwrap();
//! mesh.add_channel("Raise", vec![Vector3::new(0.0, 1.0, 0.0); 4], None).unwrap();
//!
//! let transforms = RestTransforms::new(Isometry3::identity(), Isometry3::identity());
//! let options = AttachOptions::default();
//!
//! let animations = solve_all_channels(
//!     &mesh,
//!     &Point3::new(0.5, 0.0, 0.5),
//!     &transforms,
//!     &options,
//! ).unwrap();
//! assert_eq!(animations.len(), 1);
//! assert_eq!(animations[0].channel, "Raise");
//! ```

use nalgebra::Point3;

use crate::adapter::{AnimationSink, DeformableMesh, RestTransforms};
use crate::cluster::{detect_cluster, DetectOptions, SurfaceCluster};
use crate::curve::{synthesize, AttachmentCurves, SolvedKeyframe};
use crate::error::{AttachError, Result};
use crate::sample::{sample_at, sample_channel, SampleOptions};
use crate::solve::{solve_sample, RestContext, SolveOptions};

/// Options for the whole attachment pipeline.
#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    /// Cluster detection options.
    pub detect: DetectOptions,
    /// Pose sampling options.
    pub sample: SampleOptions,
    /// Solver options.
    pub solve: SolveOptions,
}

impl AttachOptions {
    /// Set the cluster detection options.
    pub fn with_detect(mut self, detect: DetectOptions) -> Self {
        self.detect = detect;
        self
    }

    /// Set the pose sampling options.
    pub fn with_sample(mut self, sample: SampleOptions) -> Self {
        self.sample = sample;
        self
    }

    /// Set the solver options.
    pub fn with_solve(mut self, solve: SolveOptions) -> Self {
        self.solve = solve;
        self
    }
}

/// The synthesized animation for one deformation channel.
#[derive(Debug, Clone)]
pub struct ChannelAnimation {
    /// The deformation channel name.
    pub channel: String,
    /// The seven synthesized curves.
    pub curves: AttachmentCurves,
}

/// Solve one channel against an already detected cluster.
///
/// The rest context is built from an explicit weight-0 sample (not the
/// first schedule entry, which is 100 in the single-sample edge case).
/// Degenerate samples are dropped with a warning; the tangent and rotation
/// accumulators skip them untouched.
///
/// # Errors
///
/// - [`AttachError::UnknownChannel`] if the channel does not exist.
/// - [`AttachError::DegenerateSample`] if the weight-0 rest geometry is
///   itself degenerate (no rest frame, nothing can be solved).
/// - [`AttachError::NoValidSamples`] if every sample was dropped.
pub fn solve_channel<M: DeformableMesh + Sync>(
    mesh: &M,
    cluster: &SurfaceCluster,
    channel: &str,
    transforms: &RestTransforms,
    options: &AttachOptions,
) -> Result<AttachmentCurves> {
    let samples = sample_channel(mesh, channel, cluster, &options.sample)?;

    let rest_sample = sample_at(mesh, channel, cluster, 0.0)?;
    let rest = RestContext::new(&rest_sample, transforms)?;

    // Continuity accumulators, local to this channel's pass.
    let mut previous_tangent = None;
    let mut previous_rotation = None;

    let mut keyframes: Vec<SolvedKeyframe> = Vec::with_capacity(samples.len());
    for sample in &samples {
        match solve_sample(
            sample,
            previous_tangent.as_ref(),
            previous_rotation.as_ref(),
            &rest,
            &options.solve,
        ) {
            Ok(solved) => {
                previous_tangent = Some(solved.tangent);
                previous_rotation = Some(solved.rotation);
                keyframes.push(SolvedKeyframe {
                    weight: sample.weight,
                    position: solved.position,
                    rotation: solved.rotation,
                });
            }
            Err(err) => {
                log::warn!(
                    "dropping sample at weight {} on channel {:?}: {}",
                    sample.weight,
                    channel,
                    err
                );
            }
        }
    }

    synthesize(channel, &keyframes)
}

/// Solve every channel of the mesh for one attachment point.
///
/// The cluster is detected once and shared by all channels. A channel that
/// fails (unknown data, all samples degenerate) is skipped with a warning;
/// the remaining channels still produce animations. Errors that make the
/// whole attachment unsolvable — no channels at all, or no surface within
/// the search radius — are returned to the caller, which is expected to
/// skip this attachment and continue with others.
pub fn solve_all_channels<M: DeformableMesh + Sync>(
    mesh: &M,
    query_point: &Point3<f64>,
    transforms: &RestTransforms,
    options: &AttachOptions,
) -> Result<Vec<ChannelAnimation>> {
    if !mesh.has_channels() {
        return Err(AttachError::NoChannels);
    }

    let cluster = detect_cluster(mesh, query_point, &options.detect)?;
    log::debug!(
        "detected cluster of {} triangles (seed {}) for attachment at {:?}",
        cluster.len(),
        cluster.seed(),
        query_point
    );

    let mut animations = Vec::new();
    for channel in mesh.channel_names() {
        match solve_channel(mesh, &cluster, &channel, transforms, options) {
            Ok(curves) => animations.push(ChannelAnimation { channel, curves }),
            Err(err) => {
                log::warn!("skipping channel {:?}: {}", channel, err);
            }
        }
    }

    Ok(animations)
}

/// Solve every channel and bind the resulting curves into a sink.
///
/// Convenience wrapper over [`solve_all_channels`] for hosts that want the
/// curves delivered straight to their animation backend.
pub fn bind_attachment<M: DeformableMesh + Sync, S: AnimationSink>(
    mesh: &M,
    query_point: &Point3<f64>,
    transforms: &RestTransforms,
    options: &AttachOptions,
    target_path: &str,
    sink: &mut S,
) -> Result<usize> {
    let animations = solve_all_channels(mesh, query_point, transforms, options)?;
    for animation in &animations {
        sink.bind(target_path, &animation.channel, &animation.curves)?;
    }
    Ok(animations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriMesh;
    use crate::solve::SolvePolicy;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

    /// Flat unit quad in the xz plane (normals +y), two triangles.
    fn quad_mesh() -> TriMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
        ];
        TriMesh::new(positions, vec![[0, 2, 1], [1, 2, 3]]).unwrap()
    }

    fn centroid_transforms() -> RestTransforms {
        let object = Isometry3::from_parts(
            Translation3::new(0.5, 0.0, 0.5),
            UnitQuaternion::identity(),
        );
        RestTransforms::new(object, Isometry3::identity())
    }

    fn quad_options(sample_count: usize) -> AttachOptions {
        AttachOptions::default()
            .with_detect(
                DetectOptions::default()
                    .with_target_triangle_count(2)
                    .with_search_radius(0.5),
            )
            .with_sample(SampleOptions::default().with_sample_count(sample_count))
            .with_solve(SolveOptions::default().with_align_rotation(false))
    }

    #[test]
    fn test_translated_quad_tracks_centroid() {
        // Channel translating the whole quad by (0, 1, 0) at weight 100,
        // sampled at 0 / 50 / 100, object rest-attached at the centroid.
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::new(0.0, 1.0, 0.0); 4], None)
            .unwrap();

        let animations = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &quad_options(3),
        )
        .unwrap();

        assert_eq!(animations.len(), 1);
        let curves = &animations[0].curves;
        assert_eq!(curves.num_keys(), 3);

        let expected = [(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)];
        for (key, (t, y)) in curves.position_y.keys().iter().zip(expected) {
            assert!((key.t - t).abs() < 1e-10);
            assert!((key.value - y).abs() < 1e-10);
        }
        // x and z stay put; the motion is pure translation.
        for key in curves.position_x.keys() {
            assert!((key.value - 0.5).abs() < 1e-10);
        }
        for key in curves.position_z.keys() {
            assert!((key.value - 0.5).abs() < 1e-10);
        }
        // Rotation alignment off: identity rotation throughout.
        for key in curves.rotation_w.keys() {
            assert!((key.value.abs() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_identity_round_trip_constant_channel() {
        // Constant (non-deforming) channel: every solved keyframe equals
        // the object's rest transform.
        let mut mesh = quad_mesh();
        mesh.add_channel("Still", vec![Vector3::zeros(); 4], None).unwrap();

        let animations = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &quad_options(3),
        )
        .unwrap();

        let curves = &animations[0].curves;
        for key in curves.position_x.keys() {
            assert!((key.value - 0.5).abs() < 1e-10);
        }
        for key in curves.position_y.keys() {
            assert!(key.value.abs() < 1e-10);
        }
        for key in curves.position_z.keys() {
            assert!((key.value - 0.5).abs() < 1e-10);
        }
    }

    #[test]
    fn test_degenerate_weight_drops_one_key() {
        // Single triangle collapsing to a line exactly at weight 70: that
        // sample is dropped, the synthesized curves carry N-1 keys, and no
        // error escapes.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let mut mesh = TriMesh::new(positions, vec![[0, 2, 1]]).unwrap();
        let deltas = vec![
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, -1.0 / 0.7),
        ];
        mesh.add_channel("Collapse", deltas, None).unwrap();

        let options = AttachOptions::default()
            .with_detect(
                DetectOptions::default()
                    .with_target_triangle_count(1)
                    .with_search_radius(0.5),
            )
            .with_sample(SampleOptions::default().with_sample_count(11))
            .with_solve(SolveOptions::default().with_align_rotation(false));

        let transforms =
            RestTransforms::new(Isometry3::identity(), Isometry3::identity());
        let animations = solve_all_channels(
            &mesh,
            &Point3::new(0.3, 0.0, 0.3),
            &transforms,
            &options,
        )
        .unwrap();

        assert_eq!(animations.len(), 1);
        let curves = &animations[0].curves;
        assert_eq!(curves.num_keys(), 10, "the weight-70 key must be dropped");
        for key in curves.position_x.keys() {
            assert!((key.t - 0.7).abs() > 1e-6, "no key at the dropped weight");
        }
    }

    #[test]
    fn test_no_channels_rejected() {
        let mesh = quad_mesh();
        let result = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &quad_options(3),
        );
        assert!(matches!(result, Err(AttachError::NoChannels)));
    }

    #[test]
    fn test_unreachable_attachment_rejected() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::zeros(); 4], None).unwrap();

        let result = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 50.0, 0.5),
            &centroid_transforms(),
            &quad_options(3),
        );
        assert!(matches!(result, Err(AttachError::NoTriangleInRange { .. })));
    }

    #[test]
    fn test_failed_channel_does_not_block_others() {
        // "Bad" collapses the quad at weight 100; with a single-sample
        // schedule every sample degenerates and the channel yields nothing,
        // while "Good" still animates.
        let mut mesh = quad_mesh();
        let collapse = vec![
            Vector3::zeros(),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(-1.0, 0.0, -1.0),
        ];
        mesh.add_channel("Bad", collapse, None).unwrap();
        mesh.add_channel("Good", vec![Vector3::new(0.0, 1.0, 0.0); 4], None)
            .unwrap();

        let animations = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &quad_options(1),
        )
        .unwrap();

        assert_eq!(animations.len(), 1);
        assert_eq!(animations[0].channel, "Good");
        assert_eq!(animations[0].curves.num_keys(), 1);
        // The single-sample schedule degenerates to weight 100.
        assert!((animations[0].curves.position_y.keys()[0].t - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_rigid_normal_offset_keeps_object_proud() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Still", vec![Vector3::zeros(); 4], None).unwrap();

        let options = quad_options(2).with_solve(
            SolveOptions::default()
                .with_policy(SolvePolicy::RigidNormalOffset { offset: 0.1 })
                .with_align_rotation(false),
        );
        let animations = solve_all_channels(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &options,
        )
        .unwrap();

        // Quad normal is +y: the object floats 0.1 above its rest height.
        for key in animations[0].curves.position_y.keys() {
            assert!((key.value - 0.1).abs() < 1e-10);
        }
    }

    struct RecordingSink {
        bound: Vec<(String, String, usize)>,
    }

    impl AnimationSink for RecordingSink {
        fn bind(
            &mut self,
            target_path: &str,
            channel: &str,
            curves: &AttachmentCurves,
        ) -> crate::error::Result<()> {
            self.bound
                .push((target_path.to_string(), channel.to_string(), curves.num_keys()));
            Ok(())
        }
    }

    #[test]
    fn test_bind_attachment_delivers_curves() {
        let mut mesh = quad_mesh();
        mesh.add_channel("Test", vec![Vector3::new(0.0, 1.0, 0.0); 4], None)
            .unwrap();

        let mut sink = RecordingSink { bound: Vec::new() };
        let count = bind_attachment(
            &mesh,
            &Point3::new(0.5, 0.0, 0.5),
            &centroid_transforms(),
            &quad_options(4),
            "Armature/Chest/Pin",
            &mut sink,
        )
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            sink.bound,
            vec![("Armature/Chest/Pin".to_string(), "Test".to_string(), 4)]
        );
    }
}
