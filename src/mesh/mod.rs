//! Mesh data structures and geometry helpers.
//!
//! This module provides [`TriMesh`], an immutable triangle-soup mesh with
//! named morph channels (blendshapes), and the [`TriangleAdjacency`] graph
//! used by the cluster detector.
//!
//! # Overview
//!
//! A [`TriMesh`] stores per-vertex rest positions and normals, a triangle
//! list, and zero or more [`MorphChannel`]s. Each channel is a full
//! per-vertex displacement field at weight 100; intermediate weights blend
//! linearly. Evaluating the mesh at a (channel, weight) pair yields an
//! [`EvaluatedPose`](crate::adapter::EvaluatedPose) snapshot, which is all
//! the downstream solver stages need.
//!
//! # Construction
//!
//! ```
//! use limpet::mesh::TriMesh;
//! use nalgebra::{Point3, Vector3};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let triangles = vec![[0, 1, 2]];
//!
//! let mut mesh = TriMesh::new(positions, triangles).unwrap();
//! mesh.add_channel("Raise", vec![Vector3::new(0.0, 0.0, 1.0); 3], None).unwrap();
//! ```

mod adjacency;
mod trimesh;

pub use adjacency::TriangleAdjacency;
pub use trimesh::{
    triangle_area, triangle_centroid, triangle_normal, MorphChannel, TriMesh,
};
