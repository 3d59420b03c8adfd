// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - format decoders and encoders

mod amf;
mod compare;
mod dxf;
mod jscad;
mod json;
mod obj;
mod stl;
mod svg;
mod xml;

pub use compare::{compare_meshes, MeshComparison};

use crate::error::Result;
use crate::model::{Metadata, Model, NamedParameters};
use std::collections::HashMap;
use std::path::Path;

/// `(raw bytes, input path, output path) -> model`
pub type Decoder = fn(&[u8], &Path, &Path) -> Result<Model>;

/// `(model, metadata, named parameters) -> output bytes`
pub type Encoder = fn(&Model, &Metadata, &NamedParameters) -> Result<Vec<u8>>;

/// Decoders and encoders keyed by format token.
///
/// Codecs are plain functions, so a table holds no state beyond the
/// mapping and can be shared by concurrent conversions.
#[derive(Clone, Default)]
pub struct CodecTable {
    decoders: HashMap<&'static str, Decoder>,
    encoders: HashMap<&'static str, Encoder>,
}

impl CodecTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Every codec shipped with the crate
    pub fn builtin() -> Self {
        let mut table = Self::new();

        table.register_decoder("jscad", jscad::decode_jscad);
        table.register_decoder("js", jscad::decode_jscad);
        table.register_decoder("scad", jscad::decode_scad);
        table.register_decoder("stl", stl::decode);
        table.register_decoder("amf", amf::decode);
        table.register_decoder("obj", obj::decode);
        table.register_decoder("json", json::decode);

        table.register_encoder("jscad", jscad::encode);
        table.register_encoder("js", jscad::encode);
        table.register_encoder("stl", stl::encode_ascii);
        table.register_encoder("stla", stl::encode_ascii);
        table.register_encoder("stlb", stl::encode_binary);
        table.register_encoder("amf", amf::encode);
        table.register_encoder("dxf", dxf::encode);
        table.register_encoder("svg", svg::encode);

        table
    }

    pub fn register_decoder(&mut self, token: &'static str, decoder: Decoder) {
        self.decoders.insert(token, decoder);
    }

    pub fn register_encoder(&mut self, token: &'static str, encoder: Encoder) {
        self.encoders.insert(token, encoder);
    }

    pub fn decoder(&self, token: &str) -> Option<Decoder> {
        self.decoders.get(token).copied()
    }

    pub fn encoder(&self, token: &str) -> Option<Encoder> {
        self.encoders.get(token).copied()
    }
}

impl std::fmt::Debug for CodecTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut decoders: Vec<_> = self.decoders.keys().collect();
        let mut encoders: Vec<_> = self.encoders.keys().collect();
        decoders.sort();
        encoders.sort();
        f.debug_struct("CodecTable")
            .field("decoders", &decoders)
            .field("encoders", &encoders)
            .finish()
    }
}
