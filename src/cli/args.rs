// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Command-line token parsing into a [`ConversionRequest`]

use crate::error::{ConvertError, Result};
use crate::format::{FormatRegistry, DEFAULT_OUTPUT_FORMAT};
use crate::model::NamedParameters;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One conversion as requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    /// Lowercase input token taken from the input extension
    pub input_format: Option<String>,
    pub output_path: Option<PathBuf>,
    /// Value of `-of`, or the default when neither `-of` nor `-o` was given
    pub output_format: Option<String>,
    pub named_parameters: NamedParameters,
    /// `-v` was given
    pub report_environment: bool,
}

impl ConversionRequest {
    /// Request for `input_path` with every option unset
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            input_format: None,
            output_path: None,
            output_format: None,
            named_parameters: NamedParameters::new(),
            report_environment: false,
        }
    }

    /// Input token: the explicit one, else derived from the input extension
    pub fn resolved_input_format(&self, registry: &FormatRegistry) -> Result<String> {
        if let Some(format) = &self.input_format {
            return Ok(format.to_ascii_lowercase());
        }
        extension(&self.input_path)
            .and_then(|ext| registry.input_token(ext))
            .map(str::to_string)
            .ok_or_else(|| {
                ConvertError::usage(format!(
                    "cannot infer the input format of {}",
                    self.input_path.display()
                ))
            })
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Parses `polyconvert` arguments.
///
/// Rules are tried in order for every token: `-of <format>`, `-o<path>` or
/// `-o <path>`, `--name=value` or `--name value`, an input file with a
/// decodable extension, `-v`. Anything else is a usage error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentParser {
    registry: FormatRegistry,
}

impl ArgumentParser {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn parse<I, S>(&self, tokens: I) -> Result<ConversionRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_with(tokens, || {})
    }

    /// Like [`parse`](Self::parse), calling `on_report` as soon as `-v` is
    /// read. Tokens after it are still parsed, so the report is produced
    /// even when a later token fails.
    pub fn parse_with<I, S, F>(&self, tokens: I, mut on_report: F) -> Result<ConversionRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(),
    {
        let mut tokens = tokens.into_iter().map(Into::into).peekable();
        if tokens.peek().is_none() {
            return Err(ConvertError::usage("no arguments given"));
        }

        let mut input: Option<(PathBuf, String)> = None;
        let mut output_path = None;
        let mut output_format = None;
        let mut named_parameters = NamedParameters::new();
        let mut report_environment = false;

        while let Some(token) = tokens.next() {
            if token == "-of" {
                let value = tokens
                    .next()
                    .ok_or_else(|| ConvertError::usage("-of needs an output format"))?;
                output_format = Some(value);
            } else if let Some(attached) = token.strip_prefix("-o") {
                let value = if attached.is_empty() {
                    tokens
                        .next()
                        .ok_or_else(|| ConvertError::usage("-o needs an output file"))?
                } else {
                    attached.to_string()
                };
                output_path = Some(PathBuf::from(value));
            } else if let Some(parameter) = token.strip_prefix("--") {
                let (name, value) = match parameter.split_once('=') {
                    Some((name, value)) => (name.to_string(), value.to_string()),
                    None if parameter.is_empty() => (String::new(), String::new()),
                    // The next token is taken as the value even if it looks like a flag
                    None => {
                        let value = tokens.next().ok_or_else(|| {
                            ConvertError::usage(format!("--{} needs a value", parameter))
                        })?;
                        (parameter.to_string(), value)
                    }
                };
                if name.is_empty() {
                    return Err(ConvertError::usage(format!(
                        "parameter `{}` has no name",
                        token
                    )));
                }
                named_parameters.insert(name, value);
            } else if let Some(format) = extension(Path::new(&token)).and_then(|ext| self.registry.input_token(ext)) {
                let path = PathBuf::from(&token);
                if !path.is_file() {
                    return Err(ConvertError::FileNotFound { path });
                }
                if let Some((previous, _)) = &input {
                    debug!(previous = %previous.display(), "later input file replaces earlier one");
                }
                input = Some((path, format.to_string()));
            } else if token == "-v" {
                if !report_environment {
                    on_report();
                }
                report_environment = true;
            } else {
                return Err(ConvertError::usage(format!("unrecognized argument `{}`", token)));
            }
        }

        let (input_path, input_format) =
            input.ok_or_else(|| ConvertError::usage("no input file given"))?;

        if output_format.is_none() && output_path.is_none() {
            output_format = Some(DEFAULT_OUTPUT_FORMAT.to_string());
        }

        let request = ConversionRequest {
            input_path,
            input_format: Some(input_format),
            output_path,
            output_format,
            named_parameters,
            report_environment,
        };
        debug!(?request, "parsed arguments");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, "").unwrap();
        path.to_string_lossy().into_owned()
    }

    fn parse(tokens: &[&str]) -> Result<ConversionRequest> {
        ArgumentParser::default().parse(tokens.iter().copied())
    }

    #[test]
    fn test_default_output_format() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.jscad");
        let request = parse(&[&input]).unwrap();
        assert_eq!(request.input_format.as_deref(), Some("jscad"));
        assert_eq!(request.output_format.as_deref(), Some("stla"));
        assert_eq!(request.output_path, None);
    }

    #[test]
    fn test_output_flags() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.scad");

        let request = parse(&[&input, "-oout.amf"]).unwrap();
        assert_eq!(request.output_path, Some(PathBuf::from("out.amf")));
        assert_eq!(request.output_format, None);

        let request = parse(&["-o", "out.stl", "-of", "stlb", &input]).unwrap();
        assert_eq!(request.output_path, Some(PathBuf::from("out.stl")));
        assert_eq!(request.output_format.as_deref(), Some("stlb"));
    }

    #[test]
    fn test_named_parameters() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.scad");
        let request = parse(&[&input, "--width", "5", "--depth=3", "--label=a=b"]).unwrap();
        assert_eq!(request.named_parameters.get("width").map(String::as_str), Some("5"));
        assert_eq!(request.named_parameters.get("depth").map(String::as_str), Some("3"));
        assert_eq!(request.named_parameters.get("label").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_two_token_parameter_swallows_flags() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.scad");
        let request = parse(&[&input, "--name", "--other"]).unwrap();
        assert_eq!(request.named_parameters.get("name").map(String::as_str), Some("--other"));
    }

    #[test]
    fn test_case_insensitive_extension() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "PART.STL");
        let request = parse(&[&input]).unwrap();
        assert_eq!(request.input_format.as_deref(), Some("stl"));
    }

    #[test]
    fn test_verbose_flag_continues_parsing() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.amf");
        let request = parse(&["-v", &input, "-of", "dxf"]).unwrap();
        assert!(request.report_environment);
        assert_eq!(request.output_format.as_deref(), Some("dxf"));
    }

    #[test]
    fn test_last_input_wins() {
        let dir = TempDir::new().unwrap();
        let first = touch(&dir, "a.scad");
        let second = touch(&dir, "b.obj");
        let request = parse(&[&first, &second]).unwrap();
        assert_eq!(request.input_path, PathBuf::from(&second));
        assert_eq!(request.input_format.as_deref(), Some("obj"));
    }

    #[test]
    fn test_usage_errors() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.scad");

        for tokens in [
            vec![],
            vec!["-of", "stl"],
            vec![input.as_str(), "-of"],
            vec![input.as_str(), "-o"],
            vec![input.as_str(), "--width"],
            vec![input.as_str(), "--=5"],
            vec![input.as_str(), "--"],
            vec![input.as_str(), "model.x3d"],
            vec![input.as_str(), "-q"],
        ] {
            let err = parse(&tokens).unwrap_err();
            assert!(matches!(err, ConvertError::Usage(_)), "{:?} gave {:?}", tokens, err);
        }
    }

    #[test]
    fn test_report_runs_before_later_errors() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "model.scad");
        let parser = ArgumentParser::default();

        let mut reports = 0;
        let err = parser.parse_with(["-v"], || reports += 1).unwrap_err();
        assert!(matches!(err, ConvertError::Usage(_)));
        assert_eq!(reports, 1);

        let mut reports = 0;
        let err = parser.parse_with(["-v", input.as_str(), "-q"], || reports += 1).unwrap_err();
        assert!(matches!(err, ConvertError::Usage(_)));
        assert_eq!(reports, 1);

        let mut reports = 0;
        let request = parser.parse_with(["-v", input.as_str(), "-v"], || reports += 1).unwrap();
        assert!(request.report_environment);
        assert_eq!(reports, 1);

        let mut reports = 0;
        parser.parse_with([input.as_str(), "--note", "-v"], || reports += 1).unwrap();
        assert_eq!(reports, 0);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.scad");
        let err = parse(&[missing.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_an_input_file() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("parts.scad");
        fs::create_dir(&folder).unwrap();
        let err = parse(&[folder.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[test]
    fn test_resolved_input_format_from_extension() {
        let registry = FormatRegistry::new();
        let request = ConversionRequest::new("model.Json");
        assert_eq!(request.resolved_input_format(&registry).unwrap(), "json");
        assert!(ConversionRequest::new("model.x3d")
            .resolved_input_format(&registry)
            .is_err());
    }
}
