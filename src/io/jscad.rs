// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Script formats: OpenJSCAD and OpenSCAD decoders, OpenJSCAD encoder

use crate::error::{ConvertError, Result};
use crate::model::{Metadata, Model, ModelScript, NamedParameters, ScriptLanguage};
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;

fn script_model(format: &str, language: ScriptLanguage, bytes: &[u8], input: &Path) -> Result<Model> {
    let source = std::str::from_utf8(bytes).map_err(|e| ConvertError::decode(format, e))?;
    let root = input
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(Model::Script(
        ModelScript::new(language, source).with_include_root(root),
    ))
}

pub fn decode_jscad(bytes: &[u8], input: &Path, _output: &Path) -> Result<Model> {
    script_model("jscad", ScriptLanguage::Jscad, bytes, input)
}

pub fn decode_scad(bytes: &[u8], input: &Path, _output: &Path) -> Result<Model> {
    script_model("scad", ScriptLanguage::OpenScad, bytes, input)
}

/// OpenJSCAD output. JSCAD sources pass through untouched; anything else is
/// evaluated and written as a `polyhedron` literal.
pub fn encode(model: &Model, metadata: &Metadata, params: &NamedParameters) -> Result<Vec<u8>> {
    if let Model::Script(script) = model {
        if script.language == ScriptLanguage::Jscad {
            return Ok(script.source.clone().into_bytes());
        }
    }

    let mut mesh = model.to_mesh(params)?;
    mesh.weld_vertices(1e-9);

    let points: Vec<[f64; 3]> = mesh
        .vertices
        .iter()
        .map(|v| [v.position.x, v.position.y, v.position.z])
        .collect();
    // polyhedron() expects clockwise faces
    let triangles: Vec<[usize; 3]> = mesh
        .triangles
        .iter()
        .map(|t| [t.indices[2], t.indices[1], t.indices[0]])
        .collect();
    let literal = json!({ "points": points, "triangles": triangles });

    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "// producer: {}", metadata.producer);
    let _ = writeln!(out, "// date: {}", metadata.date_string());
    let _ = writeln!(out, "// source: {}", model.kind());
    let _ = writeln!(out);

    if !params.is_empty() {
        let _ = writeln!(out, "function getParameterDefinitions() {{");
        let _ = writeln!(out, "  return [");
        for (name, value) in params {
            let definition = json!({ "name": name, "type": "text", "initial": value, "caption": name });
            let _ = writeln!(out, "    {},", definition);
        }
        let _ = writeln!(out, "  ];");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "function main() {{");
    let _ = writeln!(out, "  return polyhedron({});", literal);
    let _ = writeln!(out, "}}");

    Ok(out.into_bytes())
}
