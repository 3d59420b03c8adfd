// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! ASCII DXF encoder, one `3DFACE` per triangle

use crate::error::Result;
use crate::model::{Metadata, Model, NamedParameters};
use std::fmt::Write as _;

const LAYER: &str = "0";

fn group(out: &mut String, code: u16, value: impl std::fmt::Display) {
    // Writing to a String cannot fail
    let _ = write!(out, "{}\n{}\n", code, value);
}

pub fn encode(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    let mesh = model.to_mesh(params)?;
    let mut out = String::with_capacity(128 + mesh.triangle_count() * 160);

    group(&mut out, 999, format!("{} {}", metadata.producer, metadata.date_string()));
    group(&mut out, 0, "SECTION");
    group(&mut out, 2, "ENTITIES");

    for triangle in &mesh.triangles {
        let [a, b, c] = mesh.corners(triangle);
        group(&mut out, 0, "3DFACE");
        group(&mut out, 8, LAYER);
        // The fourth corner repeats the third for triangular faces
        for (slot, p) in [a, b, c, c].iter().enumerate() {
            let slot = slot as u16;
            group(&mut out, 10 + slot, p.x);
            group(&mut out, 20 + slot, p.y);
            group(&mut out, 30 + slot, p.z);
        }
    }

    group(&mut out, 0, "ENDSEC");
    group(&mut out, 0, "EOF");
    Ok(out.into_bytes())
}
