// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL decoding and ASCII/binary encoding

use crate::error::{ConvertError, Result};
use crate::geometry::{Mesh, Triangle, Vertex};
use crate::model::{Metadata, Model, NamedParameters};
use nalgebra::Point3;
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

const HEADER_LEN: usize = 80;

/// Decode ASCII or binary STL. Shared corners stay shared.
pub fn decode(bytes: &[u8], _input: &Path, _output: &Path) -> Result<Model> {
    let stl = stl_io::read_stl(&mut Cursor::new(bytes)).map_err(|e| ConvertError::decode("stl", e))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.add_vertex(Vertex::at(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)));
    }
    for face in &stl.faces {
        mesh.add_triangle(Triangle::new(face.vertices));
    }
    mesh.recompute_normals();

    Ok(Model::Mesh(mesh))
}

/// Solid name embedded in ASCII output
fn solid_name(metadata: &Metadata) -> String {
    format!("{} {}", metadata.producer, metadata.date_string())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

pub fn encode_ascii(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    let mesh = model.to_mesh(params)?;
    let name = solid_name(metadata);

    let mut out = String::with_capacity(64 + mesh.triangle_count() * 256);
    // Writing to a String cannot fail
    let _ = writeln!(out, "solid {}", name);
    for triangle in &mesh.triangles {
        let n = mesh.facet_normal(triangle);
        let _ = writeln!(out, "  facet normal {} {} {}", n.x, n.y, n.z);
        let _ = writeln!(out, "    outer loop");
        for p in mesh.corners(triangle) {
            let _ = writeln!(out, "      vertex {} {} {}", p.x, p.y, p.z);
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }
    let _ = writeln!(out, "endsolid {}", name);

    Ok(out.into_bytes())
}

/// Binary STL. The header never starts with `solid`, so readers cannot
/// mistake it for ASCII.
pub fn encode_binary(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    let mesh = model.to_mesh(params)?;

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|triangle| {
            let n = mesh.facet_normal(triangle);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: mesh
                    .corners(triangle)
                    .map(|p| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])),
            }
        })
        .collect();

    let mut out = Vec::with_capacity(HEADER_LEN + 4 + triangles.len() * 50);
    stl_io::write_stl(&mut out, triangles.iter()).map_err(|e| ConvertError::encode("stlb", e))?;

    let header = binary_header(metadata);
    out[..HEADER_LEN].copy_from_slice(&header);
    Ok(out)
}

fn binary_header(metadata: &Metadata) -> [u8; HEADER_LEN] {
    let text = format!("Produced by {} {}", metadata.producer, metadata.date_string());
    let mut header = [b' '; HEADER_LEN];
    let len = text.len().min(HEADER_LEN);
    header[..len].copy_from_slice(&text.as_bytes()[..len]);
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use chrono::{TimeZone, Utc};
    use nalgebra::Vector3;

    fn metadata() -> Metadata {
        Metadata::new("polyconvert test", Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
    }

    fn cube() -> Model {
        Model::Mesh(Primitive::cube(Vector3::new(2.0, 3.0, 4.0), false).to_mesh())
    }

    #[test]
    fn test_ascii_layout() {
        let bytes = encode_ascii(&cube(), &metadata(), &NamedParameters::new()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("solid polyconvert_test_2025-03-01T12:00:00Z\n"));
        assert_eq!(text.matches("facet normal").count(), 12);
        assert!(text.trim_end().ends_with("endsolid polyconvert_test_2025-03-01T12:00:00Z"));
    }

    #[test]
    fn test_binary_layout() {
        let bytes = encode_binary(&cube(), &metadata(), &NamedParameters::new()).unwrap();
        assert_eq!(bytes.len(), 84 + 12 * 50);
        assert!(bytes.starts_with(b"Produced by polyconvert test 2025-03-01"));
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 12);
    }

    #[test]
    fn test_decode_both_encodings() {
        let path = Path::new("part.stl");
        for bytes in [
            encode_ascii(&cube(), &metadata(), &NamedParameters::new()).unwrap(),
            encode_binary(&cube(), &metadata(), &NamedParameters::new()).unwrap(),
        ] {
            let decoded = decode(&bytes, path, path).unwrap();
            assert!(decoded.is_equivalent(&cube()));
        }
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode(b"not an stl", Path::new("x.stl"), Path::new("y.stl")).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }
}
