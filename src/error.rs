//! Error types for limpet.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`AttachError`].
pub type Result<T> = std::result::Result<T, AttachError>;

/// Errors that can occur while solving a surface attachment.
#[derive(Error, Debug)]
pub enum AttachError {
    /// The mesh has no triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// A triangle references an invalid vertex index.
    #[error("triangle {triangle} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index.
        triangle: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A triangle has duplicate vertex indices.
    #[error("triangle {triangle} is degenerate (has duplicate vertices)")]
    DegenerateTriangle {
        /// The triangle index.
        triangle: usize,
    },

    /// A manually supplied seed triangle index is out of range.
    #[error("seed triangle index {index} is out of range (mesh has {count} triangles)")]
    InvalidSeedTriangle {
        /// The supplied index.
        index: usize,
        /// Number of triangles in the mesh.
        count: usize,
    },

    /// No triangle was found within the search radius of the query point.
    #[error("no triangle within search radius {radius} of the query point")]
    NoTriangleInRange {
        /// The search radius that was exhausted.
        radius: f64,
    },

    /// The named deformation channel does not exist on the mesh.
    #[error("mesh has no deformation channel named {name:?}")]
    UnknownChannel {
        /// The requested channel name.
        name: String,
    },

    /// The mesh has no deformation channels at all.
    #[error("mesh has no deformation channels")]
    NoChannels,

    /// A channel's delta field does not match the mesh vertex count.
    #[error("channel {name:?} has {deltas} deltas but the mesh has {vertices} vertices")]
    ChannelSizeMismatch {
        /// The channel name.
        name: String,
        /// Number of deltas in the channel.
        deltas: usize,
        /// Number of vertices in the mesh.
        vertices: usize,
    },

    /// Geometry at a specific sample collapsed (near-zero normal or tangent).
    #[error("degenerate geometry at deformation weight {weight}")]
    DegenerateSample {
        /// The deformation weight (0-100) at which the geometry collapsed.
        weight: f64,
    },

    /// Every sample of a channel was degenerate; no curve can be produced.
    #[error("channel {name:?} produced no valid samples")]
    NoValidSamples {
        /// The channel name.
        name: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl AttachError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        AttachError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
