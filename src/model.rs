// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Format-agnostic intermediate model passed from decoders to encoders

use crate::error::Result;
use crate::geometry::Mesh;
use crate::script::{self, IncludeSandbox, SandboxLimits};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// User-supplied `--name value` pairs forwarded to parametric models
pub type NamedParameters = BTreeMap<String, String>;

/// Tolerance used when comparing mesh bounding boxes
pub const EQUIVALENCE_TOLERANCE: f64 = 1e-4;

/// Producer and timestamp stamped into formats that carry metadata.
///
/// Built once per invocation and passed down explicitly; encoders never
/// read the clock themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub producer: String,
    pub timestamp: DateTime<Utc>,
}

impl Metadata {
    pub fn new(producer: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            producer: producer.into(),
            timestamp,
        }
    }

    /// RFC 3339 timestamp at second precision, e.g. `2025-01-02T03:04:05Z`
    pub fn date_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Source language of a model script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptLanguage {
    Jscad,
    OpenScad,
}

/// Parametric model source plus the directories it may include from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScript {
    pub language: ScriptLanguage,
    pub source: String,
    pub include_roots: Vec<PathBuf>,
    #[serde(default)]
    pub limits: SandboxLimits,
}

impl ModelScript {
    pub fn new(language: ScriptLanguage, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
            include_roots: Vec::new(),
            limits: SandboxLimits::default(),
        }
    }

    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.include_roots.push(root.into());
        self
    }
}

/// Intermediate representation between decode and encode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    Script(ModelScript),
    Mesh(Mesh),
}

impl Model {
    pub fn kind(&self) -> &'static str {
        match self {
            Model::Script(script) => match script.language {
                ScriptLanguage::Jscad => "jscad script",
                ScriptLanguage::OpenScad => "openscad script",
            },
            Model::Mesh(_) => "mesh",
        }
    }

    /// Mesh for this model. Scripts are evaluated inside a sandbox that
    /// only sees the script's own include roots.
    pub fn to_mesh(&self, params: &NamedParameters) -> Result<Mesh> {
        match self {
            Model::Mesh(mesh) => Ok(mesh.clone()),
            Model::Script(model_script) => {
                let sandbox = IncludeSandbox::new(&model_script.include_roots, model_script.limits);
                script::evaluate_to_mesh(model_script, &sandbox, params)
            }
        }
    }

    /// Model-level equivalence: identical scripts, or meshes with the same
    /// triangle count and matching bounds.
    pub fn is_equivalent(&self, other: &Model) -> bool {
        match (self, other) {
            (Model::Script(a), Model::Script(b)) => {
                a.language == b.language && a.source == b.source
            }
            (Model::Mesh(a), Model::Mesh(b)) => {
                crate::io::compare_meshes(a, b, EQUIVALENCE_TOLERANCE).passed
            }
            _ => false,
        }
    }
}
