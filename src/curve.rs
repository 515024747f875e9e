//! Curve synthesis from solved keyframes.
//!
//! The final stage of the pipeline: an ordered sequence of solved
//! (weight, position, rotation) keyframes becomes seven scalar curves —
//! position x/y/z and rotation quaternion x/y/z/w — keyed by the
//! deformation weight normalized to [0, 1]. How the host interpolates
//! between keys (linear, spline) is a host concern; the synthesizer only
//! guarantees the key values themselves.
//!
//! Quaternions double-cover rotation space: `q` and `-q` are the same
//! rotation but interpolate through opposite hemispheres once split into
//! per-component scalar curves. Keys are therefore sign-aligned against
//! the previous key before the split.

use nalgebra::{Point3, UnitQuaternion};

use crate::error::{AttachError, Result};

/// One solved keyframe, as produced by the solver stage.
#[derive(Debug, Clone, Copy)]
pub struct SolvedKeyframe {
    /// Deformation weight (0-100) this keyframe was solved at.
    pub weight: f64,
    /// Solved world position of the attached object.
    pub position: Point3<f64>,
    /// Solved world rotation of the attached object.
    pub rotation: UnitQuaternion<f64>,
}

/// A single key on a scalar curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveKey {
    /// Normalized deformation weight in [0, 1].
    pub t: f64,
    /// The scalar value at this key.
    pub value: f64,
}

/// A scalar curve: keys ordered by strictly increasing `t`.
#[derive(Debug, Clone, Default)]
pub struct ScalarCurve {
    keys: Vec<CurveKey>,
}

impl ScalarCurve {
    /// The keys, ordered by strictly increasing `t`.
    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the curve has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn push(&mut self, t: f64, value: f64) {
        self.keys.push(CurveKey { t, value });
    }
}

/// The seven synthesized curves for one (attachment, channel) pair.
#[derive(Debug, Clone, Default)]
pub struct AttachmentCurves {
    /// Position x component.
    pub position_x: ScalarCurve,
    /// Position y component.
    pub position_y: ScalarCurve,
    /// Position z component.
    pub position_z: ScalarCurve,
    /// Rotation quaternion x component.
    pub rotation_x: ScalarCurve,
    /// Rotation quaternion y component.
    pub rotation_y: ScalarCurve,
    /// Rotation quaternion z component.
    pub rotation_z: ScalarCurve,
    /// Rotation quaternion w component.
    pub rotation_w: ScalarCurve,
}

impl AttachmentCurves {
    /// All seven curves paired with conventional property names, in a fixed
    /// order (position x/y/z, then rotation x/y/z/w).
    pub fn iter(&self) -> [(&'static str, &ScalarCurve); 7] {
        [
            ("localPosition.x", &self.position_x),
            ("localPosition.y", &self.position_y),
            ("localPosition.z", &self.position_z),
            ("localRotation.x", &self.rotation_x),
            ("localRotation.y", &self.rotation_y),
            ("localRotation.z", &self.rotation_z),
            ("localRotation.w", &self.rotation_w),
        ]
    }

    /// Number of keys per curve (identical across all seven).
    pub fn num_keys(&self) -> usize {
        self.position_x.len()
    }
}

/// Synthesize the seven scalar curves from an ordered keyframe sequence.
///
/// Each keyframe contributes exactly one key per curve at
/// `weight / 100`. The input must be ordered by strictly increasing
/// weight (the sampler guarantees this for sequences it produced).
///
/// # Errors
///
/// Returns [`AttachError::NoValidSamples`] for an empty sequence — a
/// channel whose every sample was dropped yields no animation at all
/// rather than a zero-key asset.
pub fn synthesize(channel: &str, keyframes: &[SolvedKeyframe]) -> Result<AttachmentCurves> {
    if keyframes.is_empty() {
        return Err(AttachError::NoValidSamples {
            name: channel.to_string(),
        });
    }

    let mut curves = AttachmentCurves::default();
    let mut previous_quat: Option<[f64; 4]> = None;

    for key in keyframes {
        let t = key.weight / 100.0;

        curves.position_x.push(t, key.position.x);
        curves.position_y.push(t, key.position.y);
        curves.position_z.push(t, key.position.z);

        let q = key.rotation.coords;
        let mut q = [q.x, q.y, q.z, q.w];

        // Sign-align against the previous key so component-wise
        // interpolation stays on one hemisphere.
        if let Some(prev) = previous_quat {
            let dot: f64 = q.iter().zip(&prev).map(|(a, b)| a * b).sum();
            if dot < 0.0 {
                for c in &mut q {
                    *c = -*c;
                }
            }
        }
        previous_quat = Some(q);

        curves.rotation_x.push(t, q[0]);
        curves.rotation_y.push(t, q[1]);
        curves.rotation_z.push(t, q[2]);
        curves.rotation_w.push(t, q[3]);
    }

    Ok(curves)
}
