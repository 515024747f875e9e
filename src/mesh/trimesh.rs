//! Triangle-soup mesh with named morph channels.

use nalgebra::{Point3, Vector3};

use crate::adapter::{DeformableMesh, EvaluatedPose};
use crate::error::{AttachError, Result};

/// A named per-vertex displacement field ("blendshape").
///
/// The deltas describe the full displacement at weight 100; intermediate
/// weights scale the deltas linearly. Normal deltas are optional in the
/// constructor and default to zero, matching channels authored without
/// per-frame normals.
#[derive(Debug, Clone)]
pub struct MorphChannel {
    name: String,
    position_deltas: Vec<Vector3<f64>>,
    normal_deltas: Vec<Vector3<f64>>,
}

impl MorphChannel {
    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-vertex position deltas at weight 100.
    pub fn position_deltas(&self) -> &[Vector3<f64>] {
        &self.position_deltas
    }

    /// Per-vertex normal deltas at weight 100.
    pub fn normal_deltas(&self) -> &[Vector3<f64>] {
        &self.normal_deltas
    }
}

/// An immutable triangle mesh with per-vertex positions, normals, and zero
/// or more named morph channels.
///
/// Unlike a half-edge structure, a plain triangle soup is sufficient here:
/// the solver only ever reads positions, triangle corners, and the derived
/// shared-edge adjacency graph. Vertices may be shared between triangles or
/// not; adjacency is defined purely by shared vertex-index edges.
#[derive(Debug, Clone)]
pub struct TriMesh {
    positions: Vec<Point3<f64>>,
    normals: Vec<Vector3<f64>>,
    triangles: Vec<[usize; 3]>,
    channels: Vec<MorphChannel>,
}

impl TriMesh {
    /// Build a mesh from vertex positions and a triangle list.
    ///
    /// Vertex normals are computed as area-weighted averages of incident
    /// face normals. Use [`TriMesh::with_normals`] to supply authored
    /// normals instead.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::EmptyMesh`] for an empty triangle list,
    /// [`AttachError::InvalidVertexIndex`] for an out-of-range corner, and
    /// [`AttachError::DegenerateTriangle`] for repeated corners.
    ///
    /// # Example
    ///
    /// ```
    /// use limpet::mesh::TriMesh;
    /// use nalgebra::Point3;
    ///
    /// let positions = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.5, 1.0, 0.0),
    /// ];
    /// let mesh = TriMesh::new(positions, vec![[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.num_triangles(), 1);
    /// ```
    pub fn new(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        validate_triangles(&positions, &triangles)?;
        let normals = compute_vertex_normals(&positions, &triangles);
        Ok(Self {
            positions,
            normals,
            triangles,
            channels: Vec::new(),
        })
    }

    /// Build a mesh with authored per-vertex normals.
    ///
    /// # Errors
    ///
    /// Same validation as [`TriMesh::new`], plus an
    /// [`AttachError::InvalidParameter`] if the normal count does not match
    /// the vertex count.
    pub fn with_normals(
        positions: Vec<Point3<f64>>,
        normals: Vec<Vector3<f64>>,
        triangles: Vec<[usize; 3]>,
    ) -> Result<Self> {
        validate_triangles(&positions, &triangles)?;
        if normals.len() != positions.len() {
            return Err(AttachError::invalid_param(
                "normals",
                normals.len(),
                "normal count must match vertex count",
            ));
        }
        Ok(Self {
            positions,
            normals,
            triangles,
            channels: Vec::new(),
        })
    }

    /// Add a morph channel.
    ///
    /// `normal_deltas` may be `None` for channels that only displace
    /// positions; zero normal deltas are substituted.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::ChannelSizeMismatch`] if a delta field does
    /// not match the vertex count.
    pub fn add_channel(
        &mut self,
        name: impl Into<String>,
        position_deltas: Vec<Vector3<f64>>,
        normal_deltas: Option<Vec<Vector3<f64>>>,
    ) -> Result<()> {
        let name = name.into();
        if position_deltas.len() != self.positions.len() {
            return Err(AttachError::ChannelSizeMismatch {
                name,
                deltas: position_deltas.len(),
                vertices: self.positions.len(),
            });
        }
        let normal_deltas = match normal_deltas {
            Some(deltas) => {
                if deltas.len() != self.positions.len() {
                    return Err(AttachError::ChannelSizeMismatch {
                        name,
                        deltas: deltas.len(),
                        vertices: self.positions.len(),
                    });
                }
                deltas
            }
            None => vec![Vector3::zeros(); self.positions.len()],
        };
        self.channels.push(MorphChannel {
            name,
            position_deltas,
            normal_deltas,
        });
        Ok(())
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The morph channels on this mesh.
    pub fn channels(&self) -> &[MorphChannel] {
        &self.channels
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&MorphChannel> {
        self.channels.iter().find(|c| c.name == name)
    }
}

impl DeformableMesh for TriMesh {
    fn rest_positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    fn evaluate(&self, channel: &str, weight: f64) -> Result<EvaluatedPose> {
        let channel = self
            .channel(channel)
            .ok_or_else(|| AttachError::UnknownChannel {
                name: channel.to_string(),
            })?;

        // Host semantics: weight 100 applies the full delta field,
        // intermediate weights blend linearly.
        let alpha = weight / 100.0;

        let positions: Vec<Point3<f64>> = self
            .positions
            .iter()
            .zip(&channel.position_deltas)
            .map(|(p, d)| p + alpha * d)
            .collect();

        let normals: Vec<Vector3<f64>> = self
            .normals
            .iter()
            .zip(&channel.normal_deltas)
            .map(|(n, d)| {
                let blended = n + alpha * d;
                let len = blended.norm();
                if len > 1e-10 {
                    blended / len
                } else {
                    *n
                }
            })
            .collect();

        Ok(EvaluatedPose { positions, normals })
    }
}

/// Compute the area of a triangle.
pub fn triangle_area(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    e1.cross(&e2).norm() * 0.5
}

/// Compute the centroid of a triangle.
pub fn triangle_centroid(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Point3<f64> {
    Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
}

/// Compute the unit normal of a triangle.
///
/// Returns `None` for a degenerate (zero-area) triangle.
pub fn triangle_normal(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> Option<Vector3<f64>> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let cross = e1.cross(&e2);
    let len = cross.norm();
    if len > 1e-10 {
        Some(cross / len)
    } else {
        None
    }
}

fn validate_triangles(positions: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<()> {
    if triangles.is_empty() {
        return Err(AttachError::EmptyMesh);
    }
    for (ti, tri) in triangles.iter().enumerate() {
        for &vi in tri {
            if vi >= positions.len() {
                return Err(AttachError::InvalidVertexIndex {
                    triangle: ti,
                    vertex: vi,
                });
            }
        }
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            return Err(AttachError::DegenerateTriangle { triangle: ti });
        }
    }
    Ok(())
}

/// Compute vertex normals as area-weighted averages of incident face normals.
fn compute_vertex_normals(
    positions: &[Point3<f64>],
    triangles: &[[usize; 3]],
) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); positions.len()];

    for tri in triangles {
        let p0 = &positions[tri[0]];
        let p1 = &positions[tri[1]];
        let p2 = &positions[tri[2]];

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let face_normal = e1.cross(&e2); // Area-weighted

        normals[tri[0]] += face_normal;
        normals[tri[1]] += face_normal;
        normals[tri[2]] += face_normal;
    }

    for n in &mut normals {
        let len = n.norm();
        if len > 1e-10 {
            *n /= len;
        }
    }

    normals
}
