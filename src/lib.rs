// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyconvert
//!
//! Converts 3D models between formats. Arguments are parsed into a
//! request, the output path and format are resolved, and a dispatcher runs
//! the decoder for the input format and the encoder for the output format.
//! Parametric scripts (OpenSCAD, OpenJSCAD) are evaluated in a sandbox that
//! can only read includes from granted directories.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod geometry;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod script;

pub use cli::{ArgumentParser, ConversionRequest, OutputResolver, ResolvedOutput};
pub use config::ConverterConfig;
pub use dispatch::{ConversionDispatcher, ConversionResult, SourceFile};
pub use error::{ConvertError, Result};
pub use format::{FormatDescriptor, FormatRegistry, DEFAULT_OUTPUT_FORMAT};
pub use geometry::{Mesh, Primitive};
pub use io::CodecTable;
pub use model::{Metadata, Model, ModelScript, NamedParameters, ScriptLanguage};
pub use pipeline::{convert_request, execute_plan, plan_request, ConversionPlan, ConversionReport};
pub use script::{evaluate_model_script, IncludeSandbox, SandboxLimits};
