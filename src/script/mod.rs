// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Sandboxed evaluation of model scripts

mod jscad;
mod sandbox;
mod scad;

pub use jscad::JscadEngine;
pub use sandbox::{IncludeSandbox, IncludedFile, SandboxLimits};
pub use scad::{parameter_value, ScadEngine, Value};

use crate::error::Result;
use crate::geometry::Mesh;
use crate::model::{Model, ModelScript, NamedParameters, ScriptLanguage};

/// A script language front-end.
///
/// Engines never touch the filesystem directly; every include goes through
/// the sandbox they are handed.
pub trait ScriptEngine {
    fn evaluate(&self, source: &str, sandbox: &IncludeSandbox, params: &NamedParameters) -> Result<Mesh>;
}

/// Engine for a script language
pub fn engine_for(language: ScriptLanguage) -> &'static dyn ScriptEngine {
    match language {
        ScriptLanguage::Jscad => &JscadEngine,
        ScriptLanguage::OpenScad => &ScadEngine,
    }
}

/// Evaluate a script to its mesh
pub fn evaluate_to_mesh(script: &ModelScript, sandbox: &IncludeSandbox, params: &NamedParameters) -> Result<Mesh> {
    engine_for(script.language).evaluate(&script.source, sandbox, params)
}

/// Evaluate a script model into a mesh model
pub fn evaluate_model_script(
    script: &ModelScript,
    sandbox: &IncludeSandbox,
    params: &NamedParameters,
) -> Result<Model> {
    evaluate_to_mesh(script, sandbox, params).map(Model::Mesh)
}
