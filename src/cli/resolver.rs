// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Output path and format resolution

use super::args::ConversionRequest;
use crate::error::{ConvertError, Result};
use crate::format::FormatRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Final output location and encoder token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOutput {
    pub output_path: PathBuf,
    /// Lowercase token; keeps the `stla`/`stlb` distinction
    pub output_format: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputResolver {
    registry: FormatRegistry,
}

impl OutputResolver {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve_request(&self, request: &ConversionRequest) -> Result<ResolvedOutput> {
        self.resolve(
            &request.input_path,
            request.output_format.as_deref(),
            request.output_path.as_deref(),
        )
    }

    /// An explicit format always wins; the output extension is consulted
    /// only when no format was given.
    pub fn resolve(
        &self,
        input_path: &Path,
        output_format: Option<&str>,
        output_path: Option<&Path>,
    ) -> Result<ResolvedOutput> {
        let resolved = match (output_format, output_path) {
            (None, Some(path)) => {
                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .ok_or_else(|| {
                        ConvertError::invalid_output(format!(
                            "cannot infer a format from {} without an extension",
                            path.display()
                        ))
                    })?;
                let token = self
                    .registry
                    .output_token_for_extension(extension)
                    .ok_or_else(|| {
                        ConvertError::invalid_output(format!("unknown output extension `.{}`", extension))
                    })?;
                ResolvedOutput {
                    output_path: path.to_path_buf(),
                    output_format: token.to_string(),
                }
            }
            (None, None) => {
                return Err(ConvertError::invalid_output("no output format or output file given"));
            }
            (Some(format), path) => {
                let token = self.registry.output_token(format).ok_or_else(|| {
                    ConvertError::invalid_output(format!("unknown output format `{}`", format))
                })?;
                let output_path = match path {
                    Some(path) => path.to_path_buf(),
                    None => self.synthesize_path(input_path, token)?,
                };
                ResolvedOutput {
                    output_path,
                    output_format: token.to_string(),
                }
            }
        };

        debug!(
            output = %resolved.output_path.display(),
            format = %resolved.output_format,
            "resolved output"
        );
        Ok(resolved)
    }

    fn synthesize_path(&self, input_path: &Path, token: &str) -> Result<PathBuf> {
        let extension = self.registry.canonical_extension(token).unwrap_or(token);
        // Same stem, so an extension differing only in case is the same file
        // on case-insensitive filesystems
        let same_file = input_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if same_file {
            return Err(ConvertError::invalid_output(format!(
                "output would overwrite the input {}; pass -o to choose a file",
                input_path.display()
            )));
        }
        Ok(input_path.with_extension(extension))
    }
}
