// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Resolve → read → dispatch → write for one request

use crate::cli::{ConversionRequest, OutputResolver, ResolvedOutput};
use crate::config::ConverterConfig;
use crate::dispatch::{ConversionDispatcher, SourceFile};
use crate::error::{ConvertError, Result};
use crate::format::FormatRegistry;
use crate::model::NamedParameters;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// A request whose input format and output have been resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionPlan {
    pub input_path: PathBuf,
    pub input_format: String,
    pub output: ResolvedOutput,
    /// Display name of the output format
    pub format_name: &'static str,
}

/// Outcome of a written conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input_path: PathBuf,
    pub input_format: String,
    pub output_path: PathBuf,
    pub output_format: String,
    pub bytes_written: usize,
    pub elapsed: Duration,
}

/// Resolve input format and output for a parsed request
pub fn plan_request(request: &ConversionRequest, registry: &FormatRegistry) -> Result<ConversionPlan> {
    let input_format = request.resolved_input_format(registry)?;
    let output = OutputResolver::new(*registry).resolve_request(request)?;
    let format_name = registry
        .lookup(&output.output_format)
        .map(|format| format.display_name)
        .ok_or_else(|| ConvertError::invalid_output(format!("unknown output format `{}`", output.output_format)))?;

    Ok(ConversionPlan {
        input_path: request.input_path.clone(),
        input_format,
        output,
        format_name,
    })
}

/// Read the input, convert it and write the output in one `fs::write`.
/// Nothing is written unless encoding succeeded.
pub fn execute_plan(
    plan: &ConversionPlan,
    params: &NamedParameters,
    config: &ConverterConfig,
) -> Result<ConversionReport> {
    let start = Instant::now();
    let bytes = fs::read(&plan.input_path).map_err(|e| ConvertError::io(&plan.input_path, e))?;

    let source = SourceFile {
        bytes: &bytes,
        path: &plan.input_path,
        format: &plan.input_format,
    };
    let result = ConversionDispatcher::from_config(config).convert(&source, &plan.output, params, &config.metadata())?;

    fs::write(&plan.output.output_path, &result.bytes)
        .map_err(|e| ConvertError::io(&plan.output.output_path, e))?;

    let elapsed = start.elapsed();
    info!(
        output = %plan.output.output_path.display(),
        bytes = result.bytes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "conversion written"
    );

    Ok(ConversionReport {
        input_path: plan.input_path.clone(),
        input_format: plan.input_format.clone(),
        output_path: plan.output.output_path.clone(),
        output_format: result.format,
        bytes_written: result.bytes.len(),
        elapsed,
    })
}

/// Run one parsed request end to end
pub fn convert_request(request: &ConversionRequest, config: &ConverterConfig) -> Result<ConversionReport> {
    let plan = plan_request(request, &FormatRegistry::new())?;
    execute_plan(&plan, &request.named_parameters, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plan_names_output_format() {
        let mut request = ConversionRequest::new("model.scad");
        request.output_format = Some("stlb".into());
        let plan = plan_request(&request, &FormatRegistry::new()).unwrap();
        assert_eq!(plan.input_format, "scad");
        assert_eq!(plan.output.output_path, PathBuf::from("model.stl"));
        assert_eq!(plan.format_name, "STL (Binary)");
    }

    #[test]
    fn test_failed_encode_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.scad");
        fs::write(&input, "difference() { cube(2); sphere(1); }").unwrap();
        let output = dir.path().join("broken.stl");

        let mut request = ConversionRequest::new(&input);
        request.output_path = Some(output.clone());
        let err = convert_request(&request, &ConverterConfig::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Evaluation(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_unwritable_output_is_io_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("cube.scad");
        fs::write(&input, "cube(1);").unwrap();

        let mut request = ConversionRequest::new(&input);
        request.output_path = Some(dir.path().join("missing").join("cube.stl"));
        let err = convert_request(&request, &ConverterConfig::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
