// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Decode/encode dispatch for a single conversion

use crate::cli::ResolvedOutput;
use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::io::{CodecTable, Decoder, Encoder};
use crate::model::{Metadata, Model, NamedParameters};
use crate::script::SandboxLimits;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw input handed to the dispatcher
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub bytes: &'a [u8],
    pub path: &'a Path,
    /// Decoder token, e.g. `scad`
    pub format: &'a str,
}

/// Encoded payload plus the format it was encoded in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    pub format: String,
}

/// Runs decode → model → encode with codecs from a [`CodecTable`].
///
/// The dispatcher holds no mutable state; one instance can serve any number
/// of independent conversions.
#[derive(Debug, Clone)]
pub struct ConversionDispatcher {
    codecs: CodecTable,
    include_paths: Vec<PathBuf>,
    limits: SandboxLimits,
}

impl ConversionDispatcher {
    pub fn new(codecs: CodecTable) -> Self {
        Self {
            codecs,
            include_paths: Vec::new(),
            limits: SandboxLimits::default(),
        }
    }

    /// Built-in codecs with include roots and limits from configuration
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(CodecTable::builtin())
            .with_include_paths(config.include_paths.clone())
            .with_limits(config.limits())
    }

    /// Extra include roots granted to every decoded script
    pub fn with_include_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.include_paths = paths;
        self
    }

    pub fn with_limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    fn decoder_for(&self, token: &str) -> Result<Decoder> {
        self.codecs
            .decoder(&token.to_ascii_lowercase())
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                token: token.to_string(),
                direction: "input",
            })
    }

    fn encoder_for(&self, token: &str) -> Result<Encoder> {
        self.codecs
            .encoder(&token.to_ascii_lowercase())
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                token: token.to_string(),
                direction: "output",
            })
    }

    /// Decode the source into the intermediate model. Scripts receive the
    /// configured include roots after their own directory.
    pub fn decode(&self, source: &SourceFile<'_>, output_path: &Path) -> Result<Model> {
        let decoder = self.decoder_for(source.format)?;
        let mut model = decoder(source.bytes, source.path, output_path)?;
        if let Model::Script(script) = &mut model {
            script.include_roots.extend(self.include_paths.iter().cloned());
            script.limits = self.limits;
        }
        debug!(format = source.format, kind = model.kind(), "decoded input");
        Ok(model)
    }

    /// Encode a model into `format`
    pub fn encode(
        &self,
        model: &Model,
        format: &str,
        params: &NamedParameters,
        metadata: &Metadata,
    ) -> Result<ConversionResult> {
        let encoder = self.encoder_for(format)?;
        let bytes = encoder(model, metadata, params)?;
        debug!(format, bytes = bytes.len(), "encoded output");
        Ok(ConversionResult {
            bytes,
            format: format.to_ascii_lowercase(),
        })
    }

    /// Full conversion. Both codecs are looked up before any work starts, so
    /// an unsupported pair fails without decoding.
    pub fn convert(
        &self,
        source: &SourceFile<'_>,
        target: &ResolvedOutput,
        params: &NamedParameters,
        metadata: &Metadata,
    ) -> Result<ConversionResult> {
        self.decoder_for(source.format)?;
        self.encoder_for(&target.output_format)?;

        info!(
            input = %source.path.display(),
            from = source.format,
            to = %target.output_format,
            "dispatching conversion"
        );
        let model = self.decode(source, &target.output_path)?;
        self.encode(&model, &target.output_format, params, metadata)
    }
}

impl Default for ConversionDispatcher {
    fn default() -> Self {
        Self::new(CodecTable::builtin())
    }
}
