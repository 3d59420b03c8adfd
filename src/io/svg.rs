// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SVG encoder: top view (XY projection) of the mesh

use super::xml::XmlWriter;
use crate::error::Result;
use crate::model::{Metadata, Model, NamedParameters};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

pub fn encode(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    let mesh = model.to_mesh(params)?;
    let bbox = mesh.bounding_box();

    let (min_x, min_y, width, height) = if bbox.is_empty() {
        (0.0, 0.0, 1.0, 1.0)
    } else {
        let size = bbox.size();
        (bbox.min.x, bbox.min.y, size.x.max(1e-6), size.y.max(1e-6))
    };
    // SVG y grows downwards; the group flips it back
    let view_box = format!("{} {} {} {}", min_x, -(min_y + height), width, height);
    let stroke = format!("{}", width.max(height) / 500.0);

    let mut xml = XmlWriter::new("svg");
    xml.declaration()?;
    xml.comment(&format!("producer: {}, date: {}", metadata.producer, metadata.date_string()))?;
    xml.start(
        "svg",
        &[
            ("xmlns", SVG_NAMESPACE),
            ("version", "1.1"),
            ("width", &format!("{}mm", width)),
            ("height", &format!("{}mm", height)),
            ("viewBox", &view_box),
        ],
    )?;
    xml.start(
        "g",
        &[
            ("transform", "scale(1,-1)"),
            ("fill", "none"),
            ("stroke", "black"),
            ("stroke-width", &stroke),
        ],
    )?;

    for triangle in &mesh.triangles {
        let [a, b, c] = mesh.corners(triangle);
        let area = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        // Faces seen edge-on project to a line
        if area.abs() < f64::EPSILON {
            continue;
        }
        let points = format!("{},{} {},{} {},{}", a.x, a.y, b.x, b.y, c.x, c.y);
        xml.empty("polygon", &[("points", &points)])?;
    }

    xml.end("g")?;
    xml.end("svg")?;
    Ok(xml.finish())
}
