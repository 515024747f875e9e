//! Host adapter interfaces.
//!
//! The solver core never touches engine types directly. Everything it needs
//! from the host — mesh evaluation, rest transforms, and an animation
//! backend — comes in through the narrow contracts in this module:
//!
//! - [`DeformableMesh`]: black-box evaluation of a mesh at a (channel,
//!   weight) pair, plus channel enumeration and rest-pose topology.
//! - [`RestTransforms`]: the attached object's and the mesh node's world
//!   transforms at rest pose, as plain values.
//! - [`AnimationSink`]: receives synthesized curves and binds them into a
//!   playable asset; opaque to the core.
//!
//! [`TriMesh`](crate::mesh::TriMesh) is the built-in [`DeformableMesh`]
//! implementation and doubles as the reference for evaluator semantics.

use nalgebra::{Isometry3, Point3, Vector3};

use crate::curve::AttachmentCurves;
use crate::error::Result;

/// A deformed snapshot of a mesh at one (channel, weight) evaluation.
#[derive(Debug, Clone)]
pub struct EvaluatedPose {
    /// Deformed per-vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Deformed per-vertex unit normals.
    pub normals: Vec<Vector3<f64>>,
}

/// A triangle mesh that can be evaluated under named deformation channels.
///
/// This is the only operation the sampler needs from the host mesh engine;
/// how the host blends deltas internally (GPU skinning, cached CPU blends,
/// per-channel delta normals) is invisible to the solver as long as
/// [`evaluate`](DeformableMesh::evaluate) returns the deformed vertices.
pub trait DeformableMesh {
    /// Rest-pose vertex positions.
    fn rest_positions(&self) -> &[Point3<f64>];

    /// The triangle list as vertex-index triples.
    fn triangles(&self) -> &[[usize; 3]];

    /// Names of all deformation channels, in host order.
    fn channel_names(&self) -> Vec<String>;

    /// Whether the mesh has any deformation channels.
    fn has_channels(&self) -> bool {
        !self.channel_names().is_empty()
    }

    /// Evaluate the deformed surface at `weight` (0-100) on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::UnknownChannel`](crate::error::AttachError)
    /// if the channel does not exist.
    fn evaluate(&self, channel: &str, weight: f64) -> Result<EvaluatedPose>;
}

/// Rest-pose world transforms of the attachment pair.
///
/// The narrowest possible "transform provider": two values captured by the
/// host before the solve pass starts.
#[derive(Debug, Clone, Copy)]
pub struct RestTransforms {
    /// World transform of the attached object at rest pose.
    pub object: Isometry3<f64>,
    /// World transform of the mesh's owning node at rest pose.
    pub mesh: Isometry3<f64>,
}

impl RestTransforms {
    /// Create rest transforms from the two world isometries.
    pub fn new(object: Isometry3<f64>, mesh: Isometry3<f64>) -> Self {
        Self { object, mesh }
    }
}

/// Receives synthesized curves and binds them into a playable asset.
///
/// The `target_path` is an opaque host path string (e.g. a transform path
/// inside an animation hierarchy); the core only forwards it.
pub trait AnimationSink {
    /// Bind one channel's worth of curves to the target.
    fn bind(&mut self, target_path: &str, channel: &str, curves: &AttachmentCurves)
        -> Result<()>;
}
