// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ decoder (`v` and `f` records)

use crate::error::{ConvertError, Result};
use crate::geometry::Mesh;
use crate::model::Model;
use nalgebra::Point3;
use std::path::Path;

pub fn decode(bytes: &[u8], _input: &Path, _output: &Path) -> Result<Model> {
    let text = String::from_utf8_lossy(bytes);
    let mut points: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<Vec<usize>> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let coords: Vec<f64> = fields
                    .take(3)
                    .map(str::parse)
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| ConvertError::decode("obj", format!("line {}: {}", number + 1, e)))?;
                let [x, y, z] = coords[..] else {
                    return Err(ConvertError::decode(
                        "obj",
                        format!("line {}: vertex needs three coordinates", number + 1),
                    ));
                };
                points.push(Point3::new(x, y, z));
            }
            Some("f") => {
                let face = fields
                    .map(|corner| resolve_index(corner, points.len()))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        ConvertError::decode("obj", format!("line {}: invalid face index", number + 1))
                    })?;
                faces.push(face);
            }
            // Normals, texture coordinates, groups and materials carry no geometry
            _ => {}
        }
    }

    let mesh = Mesh::from_polygons(&points, &faces).map_err(|e| ConvertError::decode("obj", e))?;
    Ok(Model::Mesh(mesh))
}

/// `7`, `7/1/2`, `7//2` or a negative index relative to the vertices read so far
fn resolve_index(corner: &str, defined: usize) -> Option<usize> {
    let index: i64 = corner.split('/').next()?.parse().ok()?;
    match index {
        i if i > 0 => Some(i as usize - 1),
        i if i < 0 => defined.checked_sub(i.unsigned_abs() as usize),
        _ => None,
    }
}
