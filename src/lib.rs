//! # Limpet
//!
//! A surface-attachment solver for blendshape-driven triangle meshes.
//!
//! Given a deformable mesh with named scalar deformation channels
//! ("blendshapes") and a rigid object positioned near the mesh's rest
//! surface, limpet computes how that object's position and orientation must
//! change, as a function of deformation weight, to stay glued to the local
//! surface patch — producing keyframed curves usable as a parametrized
//! animation.
//!
//! ## Pipeline
//!
//! The solve runs as a plain, single-threaded function-call sequence per
//! (attachment point, channel) pair:
//!
//! 1. **Cluster detection** ([`cluster`]): find a connected triangle
//!    neighborhood of the rest surface nearest the attachment point.
//! 2. **Pose sampling** ([`sample`]): evaluate the mesh at a schedule of
//!    deformation weights and reduce each pose to the cluster's aggregate
//!    position, normal, and tangent candidate.
//! 3. **Frame building** ([`frame`]): orthonormalize each sample into a
//!    local frame, resolving tangent sign against the previous sample to
//!    prevent frame flips.
//! 4. **Solving** ([`solve`]): fit a rigid (or affine) transform mapping
//!    the attached object from its rest frame to each deformed frame.
//! 5. **Curve synthesis** ([`curve`]): collect the solved keyframes into
//!    seven scalar curves keyed by normalized deformation weight.
//!
//! The [`attach`] module wires the stages together and scopes failures to
//! the smallest unit (one sample, one channel, or one attachment).
//!
//! ## Quick start
//!
//! ```
//! use limpet::prelude::*;
//! use nalgebra::{Isometry3, Point3, Vector3};
//!
//! // A flat quad with one channel lifting it along +y.
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(1.0, 0.0, 1.0),
//! ];
//! let mut mesh = TriMesh::new(positions, vec![[0, 2, 1], [1, 2, 3]]).unwrap();
//! mesh.add_channel("Lift", vec![Vector3::new(0.0, 1.0, 0.0); 4], None).unwrap();
//!
//! // Attach an object at the quad's centroid.
//! let transforms = RestTransforms::new(Isometry3::identity(), Isometry3::identity());
//! let animations = solve_all_channels(
//!     &mesh,
//!     &Point3::new(0.5, 0.0, 0.5),
//!     &transforms,
//!     &AttachOptions::default(),
//! ).unwrap();
//!
//! let curves = &animations[0].curves;
//! assert_eq!(curves.num_keys(), 10);
//! ```
//!
//! ## Host integration
//!
//! The core never touches engine types. Hosts plug in through the three
//! adapter contracts in [`adapter`]: a [`DeformableMesh`](adapter::DeformableMesh)
//! evaluator, plain [`RestTransforms`](adapter::RestTransforms) values, and
//! an [`AnimationSink`](adapter::AnimationSink) that binds synthesized
//! curves into a playable asset. [`TriMesh`](mesh::TriMesh) is the built-in
//! evaluator used throughout the tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod attach;
pub mod cluster;
pub mod curve;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod sample;
pub mod solve;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use limpet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{AnimationSink, DeformableMesh, RestTransforms};
    pub use crate::attach::{
        bind_attachment, solve_all_channels, solve_channel, AttachOptions, ChannelAnimation,
    };
    pub use crate::cluster::{detect_cluster, DetectOptions, SurfaceCluster};
    pub use crate::curve::{synthesize, AttachmentCurves, ScalarCurve, SolvedKeyframe};
    pub use crate::error::{AttachError, Result};
    pub use crate::frame::{resolve_frames, LocalFrame};
    pub use crate::mesh::{TriMesh, TriangleAdjacency};
    pub use crate::sample::{sample_channel, PoseSample, SampleOptions};
    pub use crate::solve::{solve_sample, RestContext, SolveOptions, SolvePolicy, Solved};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
