//! Local frame construction and tangent continuity.
//!
//! A [`PoseSample`] carries a position, a normal, and a raw tangent
//! candidate. This module turns that triple into a right-handed orthonormal
//! [`LocalFrame`], resolving the two ambiguities tangent construction is
//! prone to:
//!
//! - **Orthogonalization**: the candidate is Gram-Schmidt-projected against
//!   the normal; a candidate that is degenerate or near-parallel to the
//!   normal falls back to a fixed world axis instead of failing.
//! - **Sign**: projected tangents can flip 180° between adjacent samples as
//!   the surface deforms, which would show up as a visible snap in the
//!   generated animation. The resolved tangent is sign-corrected against
//!   the previous sample's resolved tangent.
//!
//! The continuity dependency is loop-carried, so frames for a sample
//! sequence are produced by an explicit fold ([`resolve_frames`]) that
//! threads the previous resolved tangent as accumulator state. Samples must
//! be processed in increasing-weight order for continuity to hold; the
//! accumulator is local to one channel's sequence and must not leak across
//! channels or attachment points.

use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};

use crate::error::{AttachError, Result};
use crate::sample::PoseSample;

const EPS: f64 = 1e-10;

/// A right-handed orthonormal basis anchored at a surface point.
///
/// Invariant: `tangent`, `bitangent`, and `normal` are mutually orthogonal
/// unit vectors with `bitangent = normal × tangent`.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    /// The frame's anchor point (the cluster position).
    pub origin: Point3<f64>,
    /// Unit tangent, continuity-resolved.
    pub tangent: Vector3<f64>,
    /// Unit bitangent (`normal × tangent`).
    pub bitangent: Vector3<f64>,
    /// Unit surface normal.
    pub normal: Vector3<f64>,
}

impl LocalFrame {
    /// Build a frame from a pose sample, resolving tangent sign against the
    /// previous sample's resolved tangent when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::DegenerateSample`] if the sample's normal has
    /// near-zero magnitude. A degenerate *tangent* candidate is not an
    /// error: a world-axis fallback is substituted so that isolated bad
    /// candidates cannot kill an otherwise healthy sample.
    pub fn from_sample(
        sample: &PoseSample,
        previous_tangent: Option<&Vector3<f64>>,
    ) -> Result<Self> {
        let normal_len = sample.normal.norm();
        if normal_len < EPS {
            return Err(AttachError::DegenerateSample {
                weight: sample.weight,
            });
        }
        let normal = sample.normal / normal_len;

        // A unit normal cannot be parallel to both world axes, so the
        // fallback chain always terminates; the guard keeps the invariant
        // local instead of panicking.
        let mut tangent = match orthogonalize(&sample.tangent, &normal)
            .or_else(|| orthogonalize(&Vector3::y(), &normal))
            .or_else(|| orthogonalize(&Vector3::x(), &normal))
        {
            Some(t) => t,
            None => {
                return Err(AttachError::DegenerateSample {
                    weight: sample.weight,
                })
            }
        };

        // Continuity: keep the tangent on the same side as the previous
        // sample's resolved tangent.
        if let Some(prev) = previous_tangent {
            if tangent.dot(prev) < 0.0 {
                tangent = -tangent;
            }
        }

        let bitangent = normal.cross(&tangent);

        Ok(Self {
            origin: sample.position,
            tangent,
            bitangent,
            normal,
        })
    }

    /// The frame's orientation as a rotation, with basis columns
    /// (tangent, bitangent, normal).
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let m = Matrix3::from_columns(&[self.tangent, self.bitangent, self.normal]);
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
    }

    /// The frame as a rigid transform (rotation + origin translation).
    pub fn to_isometry(&self) -> nalgebra::Isometry3<f64> {
        nalgebra::Isometry3::from_parts(self.origin.coords.into(), self.rotation())
    }
}

/// Gram-Schmidt-orthogonalize `candidate` against the unit `normal`.
///
/// Returns `None` when the projection collapses (candidate near zero or
/// near-parallel to the normal).
fn orthogonalize(candidate: &Vector3<f64>, normal: &Vector3<f64>) -> Option<Vector3<f64>> {
    let projected = candidate - normal * normal.dot(candidate);
    let len = projected.norm();
    if len > EPS {
        Some(projected / len)
    } else {
        None
    }
}

/// Resolve frames for an ordered sample sequence.
///
/// This is the explicit fold over the loop-carried tangent: each resolved
/// tangent becomes the reference for the next sample. Degenerate samples
/// yield `None` and leave the accumulator untouched, so a single collapsed
/// weight cannot flip the frames on either side of it.
///
/// The input must be ordered by increasing weight.
pub fn resolve_frames(samples: &[PoseSample]) -> Vec<Option<LocalFrame>> {
    let mut previous_tangent: Option<Vector3<f64>> = None;

    samples
        .iter()
        .map(|sample| match LocalFrame::from_sample(sample, previous_tangent.as_ref()) {
            Ok(frame) => {
                previous_tangent = Some(frame.tangent);
                Some(frame)
            }
            Err(_) => None,
        })
        .collect()
}
