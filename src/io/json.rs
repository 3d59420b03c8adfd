// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! JSON polygon soup decoder

use crate::error::{ConvertError, Result};
use crate::geometry::Mesh;
use crate::model::Model;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PolygonSoup {
    polygons: Vec<SoupPolygon>,
}

#[derive(Debug, Deserialize)]
struct SoupPolygon {
    vertices: Vec<SoupVertex>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SoupVertex {
    Array([f64; 3]),
    Object { x: f64, y: f64, z: f64 },
}

impl SoupVertex {
    fn point(&self) -> Point3<f64> {
        match *self {
            SoupVertex::Array([x, y, z]) | SoupVertex::Object { x, y, z } => Point3::new(x, y, z),
        }
    }
}

/// `{"polygons": [{"vertices": [[x, y, z], ...]}, ...]}`; corners may also be
/// `{"x": .., "y": .., "z": ..}` objects. Polygons are counter-clockwise
/// seen from outside.
pub fn decode(bytes: &[u8], _input: &Path, _output: &Path) -> Result<Model> {
    let soup: PolygonSoup = serde_json::from_slice(bytes).map_err(|e| ConvertError::decode("json", e))?;

    let mut points = Vec::new();
    let mut faces = Vec::with_capacity(soup.polygons.len());
    for polygon in &soup.polygons {
        let start = points.len();
        points.extend(polygon.vertices.iter().map(SoupVertex::point));
        faces.push((start..points.len()).collect::<Vec<_>>());
    }

    let mut mesh = Mesh::from_polygons(&points, &faces).map_err(|e| ConvertError::decode("json", e))?;
    mesh.weld_vertices(1e-9);
    mesh.recompute_normals();
    Ok(Model::Mesh(mesh))
}
