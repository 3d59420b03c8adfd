// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AMF (Additive Manufacturing Format) 1.1

use super::xml::XmlWriter;
use crate::error::{ConvertError, Result};
use crate::geometry::{Mesh, Triangle, Vertex};
use crate::model::{Metadata, Model, NamedParameters};
use nalgebra::Point3;
use serde::Deserialize;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

const ZIP_SIGNATURE: &[u8] = b"PK";

#[derive(Debug, Deserialize)]
#[serde(rename = "amf")]
struct AmfDocument {
    #[serde(rename = "@unit", default)]
    unit: Option<String>,
    #[serde(rename = "object", default)]
    objects: Vec<AmfObject>,
}

#[derive(Debug, Deserialize)]
struct AmfObject {
    mesh: AmfMesh,
}

#[derive(Debug, Deserialize)]
struct AmfMesh {
    vertices: AmfVertices,
    #[serde(rename = "volume", default)]
    volumes: Vec<AmfVolume>,
}

#[derive(Debug, Deserialize)]
struct AmfVertices {
    #[serde(rename = "vertex", default)]
    vertices: Vec<AmfVertex>,
}

#[derive(Debug, Deserialize)]
struct AmfVertex {
    coordinates: AmfCoordinates,
}

#[derive(Debug, Deserialize)]
struct AmfCoordinates {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct AmfVolume {
    #[serde(rename = "triangle", default)]
    triangles: Vec<AmfTriangle>,
}

#[derive(Debug, Deserialize)]
struct AmfTriangle {
    v1: usize,
    v2: usize,
    v3: usize,
}

/// Scale from an AMF unit to millimeters
fn unit_scale(unit: Option<&str>) -> Result<f64> {
    match unit.map(str::to_ascii_lowercase).as_deref() {
        None | Some("millimeter") => Ok(1.0),
        Some("inch") => Ok(25.4),
        Some("feet") => Ok(304.8),
        Some("meter") => Ok(1000.0),
        Some("micron") => Ok(0.001),
        Some(other) => Err(ConvertError::decode("amf", format!("unknown unit `{}`", other))),
    }
}

/// Inflate zip-packaged AMF; plain XML passes through
fn xml_text(bytes: &[u8]) -> Result<String> {
    if !bytes.starts_with(ZIP_SIGNATURE) {
        return String::from_utf8(bytes.to_vec()).map_err(|e| ConvertError::decode("amf", e));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ConvertError::decode("amf", e))?;
    if archive.is_empty() {
        return Err(ConvertError::decode("amf", "zip archive is empty"));
    }
    let mut entry = archive.by_index(0).map_err(|e| ConvertError::decode("amf", e))?;
    debug!(entry = entry.name(), "inflating compressed amf");
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| ConvertError::decode("amf", e))?;
    Ok(text)
}

pub fn decode(bytes: &[u8], _input: &Path, _output: &Path) -> Result<Model> {
    let text = xml_text(bytes)?;
    let document: AmfDocument = quick_xml::de::from_str(&text).map_err(|e| ConvertError::decode("amf", e))?;
    let scale = unit_scale(document.unit.as_deref())?;

    let mut mesh = Mesh::new();
    for object in &document.objects {
        let base = mesh.vertex_count();
        let count = object.mesh.vertices.vertices.len();
        for vertex in &object.mesh.vertices.vertices {
            let c = &vertex.coordinates;
            mesh.add_vertex(Vertex::at(Point3::new(c.x, c.y, c.z) * scale));
        }
        for triangle in object.mesh.volumes.iter().flat_map(|v| &v.triangles) {
            let indices = [triangle.v1, triangle.v2, triangle.v3];
            if let Some(bad) = indices.iter().find(|&&i| i >= count) {
                return Err(ConvertError::decode(
                    "amf",
                    format!("triangle references vertex {} but the object has {}", bad, count),
                ));
            }
            mesh.add_triangle(Triangle::new(indices.map(|i| i + base)));
        }
    }
    mesh.recompute_normals();

    Ok(Model::Mesh(mesh))
}

pub fn encode(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    let mut mesh = model.to_mesh(params)?;
    mesh.weld_vertices(1e-9);

    let mut xml = XmlWriter::new("amf");
    xml.declaration()?;
    xml.start("amf", &[("unit", "millimeter"), ("version", "1.1")])?;
    xml.text_element("metadata", &[("type", "producer")], &metadata.producer)?;
    xml.text_element("metadata", &[("type", "date")], &metadata.date_string())?;

    xml.start("object", &[("id", "0")])?;
    xml.start("mesh", &[])?;
    xml.start("vertices", &[])?;
    for vertex in &mesh.vertices {
        let p = vertex.position;
        xml.start("vertex", &[])?;
        xml.start("coordinates", &[])?;
        xml.text_element("x", &[], &p.x.to_string())?;
        xml.text_element("y", &[], &p.y.to_string())?;
        xml.text_element("z", &[], &p.z.to_string())?;
        xml.end("coordinates")?;
        xml.end("vertex")?;
    }
    xml.end("vertices")?;

    xml.start("volume", &[])?;
    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices;
        xml.start("triangle", &[])?;
        xml.text_element("v1", &[], &a.to_string())?;
        xml.text_element("v2", &[], &b.to_string())?;
        xml.text_element("v3", &[], &c.to_string())?;
        xml.end("triangle")?;
    }
    xml.end("volume")?;
    xml.end("mesh")?;
    xml.end("object")?;
    xml.end("amf")?;

    Ok(xml.finish())
}
