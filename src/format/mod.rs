// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Format registry - recognized tokens, extensions and capabilities

mod registry;

pub use registry::{FormatDescriptor, FormatRegistry, DEFAULT_OUTPUT_FORMAT};
