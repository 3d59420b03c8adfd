// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh comparison used for round-trip equivalence

use crate::geometry::Mesh;
use serde::{Deserialize, Serialize};

/// Result of mesh comparison
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshComparison {
    pub triangle_count_match: bool,
    pub bbox_match: bool,
    /// Informational only: formats such as STL do not share vertices
    pub vertex_count_diff: i64,
    pub triangle_count_diff: i64,
    pub bbox_tolerance: f64,
    pub passed: bool,
}

/// Compare two meshes. They pass when triangle counts are equal and the
/// bounding boxes agree within `tolerance`.
pub fn compare_meshes(mesh_a: &Mesh, mesh_b: &Mesh, tolerance: f64) -> MeshComparison {
    let triangle_count_diff = mesh_a.triangle_count() as i64 - mesh_b.triangle_count() as i64;
    let bbox_match = mesh_a
        .bounding_box()
        .approx_eq(&mesh_b.bounding_box(), tolerance);

    MeshComparison {
        triangle_count_match: triangle_count_diff == 0,
        bbox_match,
        vertex_count_diff: mesh_a.vertex_count() as i64 - mesh_b.vertex_count() as i64,
        triangle_count_diff,
        bbox_tolerance: tolerance,
        passed: triangle_count_diff == 0 && bbox_match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_compare_identical_meshes() {
        let mesh_a = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        let mesh_b = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();

        let comparison = compare_meshes(&mesh_a, &mesh_b, 0.001);
        assert!(comparison.passed);
        assert!(comparison.triangle_count_match);
        assert!(comparison.bbox_match);
    }

    #[test]
    fn test_compare_different_sizes() {
        let mesh_a = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        let mesh_b = Primitive::cube(Vector3::new(20.0, 20.0, 20.0), true).to_mesh();

        let comparison = compare_meshes(&mesh_a, &mesh_b, 0.001);
        assert!(!comparison.bbox_match);
        assert!(!comparison.passed);
    }

    #[test]
    fn test_welding_does_not_break_equivalence() {
        let mesh_a = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        let mut mesh_b = mesh_a.clone();
        mesh_b.weld_vertices(1e-9);

        let comparison = compare_meshes(&mesh_a, &mesh_b, 1e-6);
        assert!(comparison.passed);
        assert_eq!(comparison.vertex_count_diff, 16);
    }
}
