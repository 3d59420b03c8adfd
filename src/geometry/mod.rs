// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation shared by all codecs

mod bbox;
mod mesh;
mod primitives;

pub use bbox::BoundingBox;
pub use mesh::{Mesh, Triangle, Vertex};
pub use primitives::{Primitive, MAX_SEGMENTS};
