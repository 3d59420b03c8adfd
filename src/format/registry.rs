// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Static table of supported file formats

use serde::Serialize;

/// Output format used when neither `-of` nor `-o` is given.
pub const DEFAULT_OUTPUT_FORMAT: &str = "stla";

/// Description of a single format token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    /// Lowercase format id, e.g. "stl", "stlb", "amf"
    pub token: &'static str,
    pub display_name: &'static str,
    /// Extension written for this format; `stla`/`stlb` collapse to `stl`
    pub extension: &'static str,
    pub supports_decode: bool,
    pub supports_encode: bool,
    pub is_binary: bool,
}

impl FormatDescriptor {
    const fn new(
        token: &'static str,
        display_name: &'static str,
        extension: &'static str,
        supports_decode: bool,
        supports_encode: bool,
        is_binary: bool,
    ) -> Self {
        Self {
            token,
            display_name,
            extension,
            supports_decode,
            supports_encode,
            is_binary,
        }
    }
}

const BUILTIN_FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor::new("jscad", "OpenJSCAD", "jscad", true, true, false),
    FormatDescriptor::new("js", "OpenJSCAD (JavaScript)", "js", true, true, false),
    FormatDescriptor::new("scad", "OpenSCAD", "scad", true, false, false),
    FormatDescriptor::new("stl", "STL (ASCII)", "stl", true, true, false),
    FormatDescriptor::new("stla", "STL (ASCII)", "stl", false, true, false),
    FormatDescriptor::new("stlb", "STL (Binary)", "stl", false, true, true),
    FormatDescriptor::new("amf", "AMF (Additive Manufacturing Format)", "amf", true, true, false),
    FormatDescriptor::new("x3d", "X3D", "x3d", false, false, false),
    FormatDescriptor::new("gcode", "G-code", "gcode", true, false, false),
    FormatDescriptor::new("dxf", "DXF", "dxf", false, true, false),
    FormatDescriptor::new("svg", "SVG", "svg", true, true, false),
    FormatDescriptor::new("json", "JSON polygon soup", "json", true, false, false),
    FormatDescriptor::new("obj", "Wavefront OBJ", "obj", true, false, false),
];

/// Read-only registry of format descriptors.
///
/// The table is fixed at compile time; lookups are case-insensitive and
/// never mutate anything, so a registry can be shared freely between
/// concurrent conversions.
#[derive(Debug, Clone, Copy)]
pub struct FormatRegistry {
    formats: &'static [FormatDescriptor],
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            formats: BUILTIN_FORMATS,
        }
    }

    /// All registered formats, in table order
    pub fn formats(&self) -> &'static [FormatDescriptor] {
        self.formats
    }

    /// Look up a descriptor by format token
    pub fn lookup(&self, token: &str) -> Option<&'static FormatDescriptor> {
        self.formats
            .iter()
            .find(|format| format.token.eq_ignore_ascii_case(token))
    }

    /// Map a file extension to the format token that owns it.
    ///
    /// Only tokens whose canonical extension equals the token itself are
    /// reachable this way, so `stl` maps to `stl` and never to `stla`/`stlb`.
    pub fn extension_to_token(&self, extension: &str) -> Option<&'static str> {
        self.formats
            .iter()
            .find(|format| {
                format.token == format.extension && format.token.eq_ignore_ascii_case(extension)
            })
            .map(|format| format.token)
    }

    /// Token for an input file extension, if that format can be decoded
    pub fn input_token(&self, extension: &str) -> Option<&'static str> {
        self.extension_to_token(extension)
            .filter(|token| self.lookup(token).is_some_and(|f| f.supports_decode))
    }

    /// Token for an output file extension, if that format can be encoded
    pub fn output_token_for_extension(&self, extension: &str) -> Option<&'static str> {
        self.extension_to_token(extension)
            .filter(|token| self.lookup(token).is_some_and(|f| f.supports_encode))
    }

    /// Validate an explicit output format token
    pub fn output_token(&self, token: &str) -> Option<&'static str> {
        self.lookup(token)
            .filter(|format| format.supports_encode)
            .map(|format| format.token)
    }

    /// Canonical file extension written for a format token
    pub fn canonical_extension(&self, token: &str) -> Option<&'static str> {
        self.lookup(token).map(|format| format.extension)
    }

    pub fn decodable_tokens(&self) -> Vec<&'static str> {
        self.formats
            .iter()
            .filter(|format| format.supports_decode)
            .map(|format| format.token)
            .collect()
    }

    pub fn encodable_tokens(&self) -> Vec<&'static str> {
        self.formats
            .iter()
            .filter(|format| format.supports_encode)
            .map(|format| format.token)
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
