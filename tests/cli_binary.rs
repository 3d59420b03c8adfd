// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runs the `polyconvert` binary

use anyhow::Result;
use std::process::{Command, Output};
use tempfile::TempDir;

fn polyconvert(dir: &TempDir, args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_polyconvert"))
        .args(args)
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("POLYCONVERT_LOG")
        .output()?)
}

#[test]
fn test_environment_report_without_input() -> Result<()> {
    let dir = TempDir::new()?;
    let output = polyconvert(&dir, &["-v"])?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    assert!(stdout.contains("Formats:"));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: polyconvert"));
    Ok(())
}

#[test]
fn test_environment_report_before_bad_argument() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("a.scad"), "cube(1);")?;
    let output = polyconvert(&dir, &["-v", "a.scad", "-q"])?;

    assert!(String::from_utf8_lossy(&output.stdout).contains("Formats:"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unrecognized argument `-q`"));
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("a.stl").exists());
    Ok(())
}

#[test]
fn test_converts_and_reports() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("a.scad"), "cube(1);")?;
    let output = polyconvert(&dir, &["a.scad", "-of", "amf"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("converting"));
    assert!(!stdout.contains("Formats:"));
    assert!(dir.path().join("a.amf").exists());
    Ok(())
}
