// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::BoundingBox;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    pub fn at(position: Point3<f64>) -> Self {
        Self::new(position, Vector3::zeros())
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals transform by the inverse transpose
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        let normal = normal_matrix.transform_vector(&self.normal);
        self.normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Build a mesh from a point list and polygonal faces.
    ///
    /// Faces with more than three corners are fan-triangulated around their
    /// first corner. Faces referencing points out of range are rejected.
    pub fn from_polygons(points: &[Point3<f64>], faces: &[Vec<usize>]) -> Result<Self, String> {
        let mut mesh = Self::with_capacity(points.len(), faces.len());
        for point in points {
            mesh.add_vertex(Vertex::at(*point));
        }

        for (face_index, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(format!("face {} has fewer than three corners", face_index));
            }
            if let Some(bad) = face.iter().find(|&&i| i >= points.len()) {
                return Err(format!(
                    "face {} references point {} but only {} points exist",
                    face_index,
                    bad,
                    points.len()
                ));
            }
            for k in 1..face.len() - 1 {
                mesh.add_triangle(Triangle::new([face[0], face[k], face[k + 1]]));
            }
        }

        mesh.recompute_normals();
        Ok(mesh)
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }

        // Mirroring flips orientation; restore outward winding
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        if linear.determinant() < 0.0 {
            for triangle in &mut self.triangles {
                triangle.indices.swap(1, 2);
            }
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of a triangle
    pub fn corners(&self, triangle: &Triangle) -> [Point3<f64>; 3] {
        triangle.indices.map(|i| self.vertices[i].position)
    }

    /// Unit facet normal from winding order, zero for degenerate triangles
    pub fn facet_normal(&self, triangle: &Triangle) -> Vector3<f64> {
        let [a, b, c] = self.corners(triangle);
        (b - a)
            .cross(&(c - a))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Merge with another mesh (simple union without CSG)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle::new([
                triangle.indices[0] + offset,
                triangle.indices[1] + offset,
                triangle.indices[2] + offset,
            ]));
        }
    }

    /// Weld vertices whose positions agree after snapping to a grid of size
    /// `epsilon`. Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() || epsilon <= 0.0 {
            return 0;
        }

        let original_count = self.vertices.len();
        let mut lookup: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut new_vertices: Vec<Vertex> = Vec::with_capacity(original_count);
        let mut remap: Vec<usize> = Vec::with_capacity(original_count);

        for vertex in &self.vertices {
            let key = (
                (vertex.position.x / epsilon).round() as i64,
                (vertex.position.y / epsilon).round() as i64,
                (vertex.position.z / epsilon).round() as i64,
            );
            let index = *lookup.entry(key).or_insert_with(|| {
                new_vertices.push(*vertex);
                new_vertices.len() - 1
            });
            remap.push(index);
        }

        for triangle in &mut self.triangles {
            triangle.indices = triangle.indices.map(|i| remap[i]);
        }
        self.vertices = new_vertices;

        original_count - self.vertices.len()
    }

    /// Recompute per-vertex normals as area-weighted facet normals
    pub fn recompute_normals(&mut self) {
        let mut accumulated = vec![Vector3::zeros(); self.vertices.len()];
        for triangle in &self.triangles {
            let [a, b, c] = self.corners(triangle);
            let weighted = (b - a).cross(&(c - a));
            for &i in &triangle.indices {
                accumulated[i] += weighted;
            }
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            vertex.normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Mesh {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::from_polygons(&points, &[vec![0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_fan_triangulation() {
        let mesh = unit_square();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles[1].indices, [0, 2, 3]);
        assert_eq!(mesh.facet_normal(&mesh.triangles[0]), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_from_polygons_rejects_bad_index() {
        let points = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(Mesh::from_polygons(&points, &[vec![0, 1, 5]]).is_err());
        assert!(Mesh::from_polygons(&points, &[vec![0, 1]]).is_err());
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = unit_square();
        let b = unit_square();
        a.merge(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.triangles[2].indices, [4, 5, 6]);
    }

    #[test]
    fn test_weld_vertices() {
        let mut mesh = unit_square();
        let copy = mesh.clone();
        mesh.merge(&copy);
        let removed = mesh.weld_vertices(1e-9);
        assert_eq!(removed, 4);
        assert_eq!(mesh.triangles[2].indices, [0, 1, 2]);
    }

    #[test]
    fn test_mirror_keeps_outward_winding() {
        let mut mesh = unit_square();
        mesh.transform(&Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0)));
        assert_eq!(mesh.facet_normal(&mesh.triangles[0]), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.bounding_box().min.x, -1.0);
    }
}
