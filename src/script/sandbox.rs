// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounded filesystem access for script includes

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Limits applied to every include a script performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Maximum nesting of includes, counting from the top-level script
    pub max_include_depth: usize,
    /// Largest file an include may read
    pub max_include_bytes: u64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_include_depth: 16,
            max_include_bytes: 4 * 1024 * 1024,
        }
    }
}

/// A file read through the sandbox
#[derive(Debug, Clone)]
pub struct IncludedFile {
    pub path: PathBuf,
    pub source: String,
}

/// Read-only view of the include roots a script was granted.
///
/// Includes are resolved relative to the including file and then to each
/// root. Every candidate is canonicalized and must stay inside a root, so
/// `..` segments and symlinks cannot reach the rest of the filesystem.
#[derive(Debug, Clone)]
pub struct IncludeSandbox {
    roots: Vec<PathBuf>,
    limits: SandboxLimits,
}

impl IncludeSandbox {
    pub fn new(roots: &[PathBuf], limits: SandboxLimits) -> Self {
        let mut canonical = Vec::with_capacity(roots.len());
        for root in roots {
            match root.canonicalize() {
                Ok(path) if !canonical.contains(&path) => canonical.push(path),
                Ok(_) => {}
                Err(err) => debug!(root = %root.display(), %err, "skipping include root"),
            }
        }
        Self {
            roots: canonical,
            limits,
        }
    }

    /// A sandbox that refuses every include
    pub fn closed() -> Self {
        Self {
            roots: Vec::new(),
            limits: SandboxLimits::default(),
        }
    }

    /// Read `name` on behalf of a script at include depth `depth`.
    ///
    /// `from` is the file performing the include, if it came from disk.
    pub fn read_include(&self, name: &str, from: Option<&Path>, depth: usize) -> Result<IncludedFile> {
        if depth >= self.limits.max_include_depth {
            return Err(ConvertError::evaluation(format!(
                "include depth limit of {} exceeded while including `{}`",
                self.limits.max_include_depth, name
            )));
        }

        let requested = Path::new(name);
        if requested
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
        {
            return Err(ConvertError::evaluation(format!(
                "absolute include path `{}` is not allowed",
                name
            )));
        }

        let mut bases: Vec<&Path> = Vec::new();
        if let Some(parent) = from.and_then(Path::parent) {
            bases.push(parent);
        }
        bases.extend(self.roots.iter().map(PathBuf::as_path));

        let mut escaped = false;
        for base in bases {
            let Ok(candidate) = base.join(requested).canonicalize() else {
                continue;
            };
            if !self.roots.iter().any(|root| candidate.starts_with(root)) {
                escaped = true;
                continue;
            }
            return self.read_file(candidate);
        }

        if escaped {
            Err(ConvertError::evaluation(format!(
                "include `{}` resolves outside the permitted include roots",
                name
            )))
        } else {
            Err(ConvertError::evaluation(format!(
                "include `{}` not found in include roots",
                name
            )))
        }
    }

    fn read_file(&self, path: PathBuf) -> Result<IncludedFile> {
        let metadata = fs::metadata(&path).map_err(|e| ConvertError::io(&path, e))?;
        if !metadata.is_file() {
            return Err(ConvertError::evaluation(format!(
                "include `{}` is not a regular file",
                path.display()
            )));
        }
        if metadata.len() > self.limits.max_include_bytes {
            return Err(ConvertError::evaluation(format!(
                "include `{}` is {} bytes, above the {} byte limit",
                path.display(),
                metadata.len(),
                self.limits.max_include_bytes
            )));
        }

        let source = fs::read_to_string(&path).map_err(|e| ConvertError::io(&path, e))?;
        debug!(path = %path.display(), bytes = source.len(), "included file");
        Ok(IncludedFile { path, source })
    }
}
