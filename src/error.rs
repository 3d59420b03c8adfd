// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for conversion requests.
//!
//! Every failure is terminal for the current invocation. The CLI maps each
//! variant to a user-visible message and an exit status.

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that can occur while parsing, resolving or running a conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Malformed or missing command-line arguments.
    #[error("{0}")]
    Usage(String),

    /// The input path does not exist or is not a regular file.
    #[error("input file not found: {}", path.display())]
    FileNotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// The output format or extension could not be resolved.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// A recognized format with no registered decoder or encoder.
    #[error("unsupported {direction} format: {token}")]
    UnsupportedFormat {
        /// Format token that was requested.
        token: String,
        /// Either "input" or "output".
        direction: &'static str,
    },

    /// Reading the input or writing the output failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input bytes are not valid for their declared format.
    #[error("failed to decode {format}: {message}")]
    Decode { format: String, message: String },

    /// The model could not be serialized into the target format.
    #[error("failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    /// A model script could not be evaluated to geometry.
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConvertError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    pub fn decode(format: &str, message: impl Display) -> Self {
        Self::Decode {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    pub fn encode(format: &str, message: impl Display) -> Self {
        Self::Encode {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }

    /// Whether the usage text should be printed alongside the message.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage(_) | Self::FileNotFound { .. } | Self::InvalidOutput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ConvertError::usage("missing input").exit_code(), 2);
        assert_eq!(ConvertError::invalid_output("bad").exit_code(), 1);
        assert!(ConvertError::usage("x").wants_usage());
        assert!(ConvertError::invalid_output("x").wants_usage());
        assert!(!ConvertError::evaluation("x").wants_usage());
    }

    #[test]
    fn test_messages() {
        let err = ConvertError::FileNotFound {
            path: PathBuf::from("missing.scad"),
        };
        assert_eq!(err.to_string(), "input file not found: missing.scad");

        let err = ConvertError::UnsupportedFormat {
            token: "x3d".into(),
            direction: "output",
        };
        assert_eq!(err.to_string(), "unsupported output format: x3d");
    }
}
