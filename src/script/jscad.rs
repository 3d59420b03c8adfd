// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenJSCAD subset: `polyhedron({...})` literals and `include("...")`.
//!
//! Nothing is executed. The evaluator scans the source for polyhedron calls
//! whose argument is a JSON object and merges them into one mesh.

use super::sandbox::IncludeSandbox;
use super::ScriptEngine;
use crate::error::{ConvertError, Result};
use crate::geometry::Mesh;
use crate::model::NamedParameters;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const POLYHEDRON_CALL: &str = "polyhedron(";
const INCLUDE_CALL: &str = "include(";

#[derive(Debug, Deserialize)]
struct PolyhedronLiteral {
    points: Vec<[f64; 3]>,
    #[serde(default)]
    triangles: Option<Vec<Vec<usize>>>,
    #[serde(default)]
    polygons: Option<Vec<Vec<usize>>>,
}

impl PolyhedronLiteral {
    fn into_mesh(self) -> Result<Mesh> {
        let points: Vec<Point3<f64>> = self.points.iter().map(|p| Point3::from(*p)).collect();
        let mut faces = self
            .triangles
            .or(self.polygons)
            .ok_or_else(|| ConvertError::evaluation("polyhedron needs `triangles` or `polygons`"))?;
        // Same clockwise convention as OpenSCAD
        for face in &mut faces {
            face.reverse();
        }
        Mesh::from_polygons(&points, &faces).map_err(ConvertError::evaluation)
    }
}

/// Evaluator for OpenJSCAD sources made of polyhedron literals
#[derive(Debug, Default, Clone, Copy)]
pub struct JscadEngine;

impl ScriptEngine for JscadEngine {
    fn evaluate(&self, source: &str, sandbox: &IncludeSandbox, params: &NamedParameters) -> Result<Mesh> {
        if !params.is_empty() {
            debug!(count = params.len(), "polyhedron literals ignore named parameters");
        }

        let mut mesh = Mesh::new();
        let found = collect(source, None, 0, sandbox, &mut mesh)?;
        if found == 0 {
            return Err(ConvertError::evaluation(
                "OpenJSCAD script contains no polyhedron literal; only literal geometry can be evaluated",
            ));
        }
        debug!(polyhedra = found, triangles = mesh.triangle_count(), "evaluated jscad model");
        Ok(mesh)
    }
}

fn collect(
    source: &str,
    origin: Option<&Path>,
    depth: usize,
    sandbox: &IncludeSandbox,
    mesh: &mut Mesh,
) -> Result<usize> {
    let mut found = 0;

    let code = code_view(source);

    for name in include_targets(source, &code)? {
        let file = sandbox.read_include(&name, origin, depth)?;
        found += collect(&file.source, Some(&file.path), depth + 1, sandbox, mesh)?;
    }

    for offset in call_sites(&code, POLYHEDRON_CALL) {
        let rest = source[offset + POLYHEDRON_CALL.len()..].trim_start();
        if !rest.starts_with('{') {
            return Err(ConvertError::evaluation(
                "polyhedron arguments must be a JSON object literal",
            ));
        }
        let literal = serde_json::Deserializer::from_str(rest)
            .into_iter::<PolyhedronLiteral>()
            .next()
            .ok_or_else(|| ConvertError::evaluation("polyhedron call is missing its argument"))?
            .map_err(|e| ConvertError::evaluation(format!("invalid polyhedron literal: {}", e)))?;
        mesh.merge(&literal.into_mesh()?);
        found += 1;
    }

    Ok(found)
}

/// `source` with comments and string literal contents blanked out. Byte
/// offsets are the same as in `source`.
fn code_view(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut code = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        let (start, end, next) = match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = bytes[i..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |n| i + n);
                (i, end, end)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                (i, end, end)
            }
            quote @ (b'"' | b'\'' | b'`') => {
                // Quotes stay so the literal is still visible as one token
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote {
                    j += if bytes[j] == b'\\' { 2 } else { 1 };
                }
                let end = j.min(bytes.len());
                (i + 1, end, end + 1)
            }
            _ => {
                i += 1;
                continue;
            }
        };
        code[start..end].fill(b' ');
        i = next;
    }

    // Only whole characters were blanked, so this never fails
    String::from_utf8(code).unwrap_or_default()
}

/// Offsets of `call` in code, skipping longer identifiers that end with it
fn call_sites<'a>(code: &'a str, call: &'a str) -> impl Iterator<Item = usize> + 'a {
    code.match_indices(call).map(|(offset, _)| offset).filter(move |&offset| {
        !code[..offset]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
    })
}

/// Quoted file names passed to `include(...)`
fn include_targets(source: &str, code: &str) -> Result<Vec<String>> {
    let mut targets = Vec::new();
    for offset in call_sites(code, INCLUDE_CALL) {
        let rest = source[offset + INCLUDE_CALL.len()..].trim_start();
        let mut chars = rest.chars();
        let quote = match chars.next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(ConvertError::evaluation("include() expects a quoted file name")),
        };
        let name: String = chars.by_ref().take_while(|&c| c != quote).collect();
        if name.is_empty() {
            return Err(ConvertError::evaluation("include() expects a quoted file name"));
        }
        targets.push(name);
    }
    Ok(targets)
}
