// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Command-line front-end: argument parsing, output resolution, reporting

pub mod args;
pub mod reporter;
pub mod resolver;

pub use args::{ArgumentParser, ConversionRequest};
pub use reporter::Reporter;
pub use resolver::{OutputResolver, ResolvedOutput};

pub const USAGE: &str = "\
usage: polyconvert <input file> [options]

  <input file>          .jscad .js .scad .stl .amf .obj .gcode .svg .json
  -of <format>          output format: jscad js stl stla stlb amf dxf svg
  -o <file>, -o<file>   output file; its extension selects the format
  --<name> <value>      parameter passed to parametric models
  --<name>=<value>
  -v                    print version, configuration and supported formats

Without -of or -o the output is ASCII STL next to the input file.";
