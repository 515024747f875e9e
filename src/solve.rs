//! Blendshape attachment solving.
//!
//! Given the cluster's observation at one deformation weight, the solver
//! computes where the attached object must move for it to stay glued to the
//! local surface patch. All policies share one entry point,
//! [`solve_sample`], and differ only in how they map the deformed local
//! frame back onto the object:
//!
//! - [`SolvePolicy::Rigid`]: the object's rest offset relative to the rest
//!   cluster frame is re-applied on the deformed frame.
//! - [`SolvePolicy::RigidNormalOffset`]: Rigid, plus a constant displacement
//!   along the deformed normal (keeps the object slightly proud of the
//!   surface, e.g. cloth-over-skin avoidance).
//! - [`SolvePolicy::Affine`]: the rotational delta between the base-sample
//!   frame and the deformed frame is applied to the object's rest
//!   transform; degenerates exactly to Rigid when the base sample is the
//!   rest sample.
//! - [`SolvePolicy::CageRbf`]: with a single cluster, radial-basis
//!   weighting collapses to the Rigid case. The collapse is deliberate and
//!   documented on the variant; a true multi-cluster blend is a different
//!   feature, not a bug fix.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

use crate::adapter::RestTransforms;
use crate::error::Result;
use crate::frame::LocalFrame;
use crate::sample::PoseSample;

/// The transform-fitting policy used per solved sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolvePolicy {
    /// Fixed rest-relative offset carried along with the moving frame.
    Rigid,

    /// [`Rigid`](SolvePolicy::Rigid) plus a constant displacement along the
    /// deformed surface normal.
    RigidNormalOffset {
        /// Signed displacement along the deformed normal, in world units.
        offset: f64,
    },

    /// Rotational delta between the base-sample frame and the deformed
    /// frame, applied to the object's rest transform. Accommodates base
    /// samples that are not exactly at zero deformation.
    Affine,

    /// Radial-basis-function weighting over driver clusters.
    ///
    /// With the single cluster this solver operates on, the weighting
    /// collapses to [`Rigid`](SolvePolicy::Rigid); that degenerate behavior
    /// is preserved as shipped rather than silently expanded into a
    /// multi-control-point blend.
    CageRbf,
}

/// Options shared by every solving policy.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// The transform-fitting policy.
    pub policy: SolvePolicy,

    /// Whether the solved rotation follows the surface frame. When `false`,
    /// only position tracks the surface and the object keeps its original
    /// rotation.
    pub align_rotation: bool,

    /// Frame-to-frame rotation damping (0.0 to 1.0): spherical
    /// interpolation toward the previous sample's solved rotation.
    /// 0 = no smoothing, 1 = fully locked to the previous rotation.
    pub smoothing: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            policy: SolvePolicy::Rigid,
            align_rotation: true,
            smoothing: 0.0,
        }
    }
}

impl SolveOptions {
    /// Set the solving policy.
    pub fn with_policy(mut self, policy: SolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set whether rotation follows the surface frame.
    pub fn with_align_rotation(mut self, align: bool) -> Self {
        self.align_rotation = align;
        self
    }

    /// Set the rotation smoothing factor (clamped to [0, 1]).
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }
}

/// One solved sample: the attached object's new world transform, plus the
/// resolved tangent to thread into the next sample's solve.
#[derive(Debug, Clone, Copy)]
pub struct Solved {
    /// New world position of the attached object.
    pub position: Point3<f64>,
    /// New world rotation of the attached object.
    pub rotation: UnitQuaternion<f64>,
    /// The continuity-resolved tangent of this sample's frame.
    pub tangent: Vector3<f64>,
}

/// Rest-pose context shared by every sample of one channel's solve pass.
///
/// Computed once from the base sample (typically the weight-0 sample) using
/// the same frame-construction procedure as the deformed samples, so the
/// rest offset and the per-sample frames are consistent by construction.
#[derive(Debug, Clone)]
pub struct RestContext {
    object_rest: Isometry3<f64>,
    mesh_rest: Isometry3<f64>,
    /// Base cluster frame mapped into world space.
    base_frame_world: Isometry3<f64>,
    /// Fixed rest offset: base-frame-inverse composed with the object rest
    /// transform.
    offset: Isometry3<f64>,
}

impl RestContext {
    /// Build the rest context from the base sample and the host-provided
    /// rest transforms.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::DegenerateSample`](crate::error::AttachError)
    /// if the base sample's geometry is degenerate — without a valid rest
    /// frame nothing can be solved for the channel.
    pub fn new(base_sample: &PoseSample, transforms: &RestTransforms) -> Result<Self> {
        let base_frame = LocalFrame::from_sample(base_sample, None)?;
        let base_frame_world = transforms.mesh * base_frame.to_isometry();
        let offset = base_frame_world.inverse() * transforms.object;

        Ok(Self {
            object_rest: transforms.object,
            mesh_rest: transforms.mesh,
            base_frame_world,
            offset,
        })
    }

    /// The attached object's rest world transform.
    pub fn object_rest(&self) -> &Isometry3<f64> {
        &self.object_rest
    }

    /// The base cluster frame in world space.
    pub fn base_frame_world(&self) -> &Isometry3<f64> {
        &self.base_frame_world
    }
}

/// Solve one sample: build the deformed frame (with tangent continuity),
/// apply the policy, then damp the rotation toward the previous solve.
///
/// `previous_tangent` and `previous_rotation` are the continuity
/// accumulators for one channel's sequence; both start as `None` and must
/// be reset between channels and between attachment points.
///
/// # Errors
///
/// Returns [`AttachError::DegenerateSample`](crate::error::AttachError)
/// when the sample's normal (or, transitively, its tangent construction)
/// is degenerate. The caller drops the sample and continues; the error is
/// scoped to this sample only.
pub fn solve_sample(
    sample: &PoseSample,
    previous_tangent: Option<&Vector3<f64>>,
    previous_rotation: Option<&UnitQuaternion<f64>>,
    rest: &RestContext,
    options: &SolveOptions,
) -> Result<Solved> {
    let frame = LocalFrame::from_sample(sample, previous_tangent)?;
    let deformed_world = rest.mesh_rest * frame.to_isometry();

    let (position, rotation) = match options.policy {
        // Single-cluster RBF weighting collapses to the rigid case.
        SolvePolicy::Rigid | SolvePolicy::CageRbf => {
            solve_rigid(&deformed_world, rest, options.align_rotation)
        }
        SolvePolicy::RigidNormalOffset { offset } => {
            let (mut position, rotation) =
                solve_rigid(&deformed_world, rest, options.align_rotation);
            let world_normal = rest.mesh_rest.rotation * frame.normal;
            position += offset * world_normal;
            (position, rotation)
        }
        SolvePolicy::Affine => solve_affine(&deformed_world, rest, options.align_rotation),
    };

    let rotation = match previous_rotation {
        Some(prev) if options.smoothing > 0.0 => prev
            .try_slerp(&rotation, 1.0 - options.smoothing, 1e-9)
            // Antipodal rotations have no unique interpolant; keep the
            // newly solved one.
            .unwrap_or(rotation),
        _ => rotation,
    };

    Ok(Solved {
        position,
        rotation,
        tangent: frame.tangent,
    })
}

fn solve_rigid(
    deformed_world: &Isometry3<f64>,
    rest: &RestContext,
    align_rotation: bool,
) -> (Point3<f64>, UnitQuaternion<f64>) {
    let world = deformed_world * rest.offset;
    let position = Point3::from(world.translation.vector);
    let rotation = if align_rotation {
        world.rotation
    } else {
        rest.object_rest.rotation
    };
    (position, rotation)
}

fn solve_affine(
    deformed_world: &Isometry3<f64>,
    rest: &RestContext,
    align_rotation: bool,
) -> (Point3<f64>, UnitQuaternion<f64>) {
    // Rotational delta between the base frame and the deformed frame; any
    // non-rigid skew between the two is ignored.
    let delta = deformed_world * rest.base_frame_world.inverse();
    let position = delta.transform_point(&Point3::from(rest.object_rest.translation.vector));
    let rotation = if align_rotation {
        delta.rotation * rest.object_rest.rotation
    } else {
        rest.object_rest.rotation
    };
    (position, rotation)
}
