// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end conversions and model-level round trips

use anyhow::Result;
use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use polyconvert::{
    convert_request, ArgumentParser, CodecTable, ConversionDispatcher, ConvertError, ConverterConfig, Metadata,
    Model, NamedParameters, ResolvedOutput, SourceFile,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BOX_SCAD: &str = "\
// parametric box
width = 1;
depth = 1;
height = 2;
translate([0, 0, 0]) cube([width, depth, height]);
";

fn config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.producer = "polyconvert tests".into();
    config.source_date_epoch = Some(1_735_689_600);
    config
}

fn metadata() -> Metadata {
    Metadata::new("polyconvert tests", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
}

fn run(args: &[&str]) -> Result<polyconvert::ConversionReport> {
    let request = ArgumentParser::default().parse(args.iter().copied())?;
    Ok(convert_request(&request, &config())?)
}

#[test]
fn test_scad_to_default_ascii_stl() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("box.scad");
    fs::write(&input, BOX_SCAD)?;

    let report = run(&[input.to_str().unwrap()])?;
    assert_eq!(report.output_path, dir.path().join("box.stl"));
    assert_eq!(report.output_format, "stla");

    let text = fs::read_to_string(&report.output_path)?;
    assert!(text.starts_with("solid polyconvert_tests_2025-01-01T00:00:00Z"));
    assert_eq!(text.matches("endfacet").count(), 12);
    assert_eq!(report.bytes_written, text.len());
    Ok(())
}

#[test]
fn test_parameters_drive_the_model() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("box.scad");
    let output = dir.path().join("box.amf");
    fs::write(&input, BOX_SCAD)?;

    run(&[input.to_str().unwrap(), "--width", "5", "--depth=3", "-o", output.to_str().unwrap()])?;

    let decoded = CodecTable::builtin().decoder("amf").unwrap()(&fs::read(&output)?, &output, Path::new("x.stl"))?;
    let Model::Mesh(mesh) = decoded else {
        panic!("amf decodes to a mesh");
    };
    let size = mesh.bounding_box().size();
    assert_relative_eq!(size.x, 5.0);
    assert_relative_eq!(size.y, 3.0);
    assert_relative_eq!(size.z, 2.0);
    Ok(())
}

#[test]
fn test_stlb_uses_binary_encoder() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("box.scad");
    fs::write(&input, BOX_SCAD)?;

    let report = run(&[input.to_str().unwrap(), "-of", "stlb"])?;
    assert_eq!(report.output_path.extension().and_then(|e| e.to_str()), Some("stl"));

    let bytes = fs::read(&report.output_path)?;
    assert!(!bytes.starts_with(b"solid"));
    assert_eq!(bytes.len(), 84 + 12 * 50);
    assert_eq!(&bytes[80..84], &12u32.to_le_bytes());
    Ok(())
}

#[test]
fn test_include_from_configured_path() -> Result<()> {
    let dir = TempDir::new()?;
    let lib = dir.path().join("lib");
    let models = dir.path().join("models");
    fs::create_dir_all(&lib)?;
    fs::create_dir_all(&models)?;
    fs::write(lib.join("sizes.scad"), "edge = 3;")?;
    let input = models.join("part.scad");
    fs::write(&input, "include <sizes.scad>\ncube(edge);")?;

    let mut config = config();
    config.include_paths.push(lib);
    let request = ArgumentParser::default().parse([input.to_str().unwrap(), "-of", "svg"])?;
    let report = convert_request(&request, &config)?;

    let svg = fs::read_to_string(report.output_path)?;
    assert!(svg.contains(r#"viewBox="0 -3 3 3""#));
    Ok(())
}

#[test]
fn test_include_outside_roots_is_refused() -> Result<()> {
    let dir = TempDir::new()?;
    let models = dir.path().join("models");
    fs::create_dir_all(&models)?;
    fs::write(dir.path().join("secret.scad"), "cube(1);")?;
    let input = models.join("part.scad");
    fs::write(&input, "include <../secret.scad>")?;

    let err = run(&[input.to_str().unwrap()]).unwrap_err();
    let err = err.downcast::<ConvertError>()?;
    assert!(matches!(err, ConvertError::Evaluation(_)));
    assert!(!models.join("part.stl").exists());
    Ok(())
}

#[test]
fn test_unsupported_pairs() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("toolpath.gcode");
    fs::write(&input, "G1 X10 Y10\n")?;

    let err = run(&[input.to_str().unwrap()]).unwrap_err().downcast::<ConvertError>()?;
    assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    Ok(())
}

#[test]
fn test_jscad_round_trip_is_equivalent() -> Result<()> {
    let dispatcher = ConversionDispatcher::default();
    let source = "function main() { return polyhedron({\"points\": [[0,0,0],[1,0,0],[0,1,0],[0,0,1]], \"triangles\": [[0,1,2],[0,3,1],[0,2,3],[1,3,2]]}); }";
    let path = PathBuf::from("tetra.jscad");
    let input = SourceFile {
        bytes: source.as_bytes(),
        path: &path,
        format: "jscad",
    };
    let target = ResolvedOutput {
        output_path: PathBuf::from("copy.jscad"),
        output_format: "jscad".into(),
    };

    let original = dispatcher.decode(&input, &target.output_path)?;
    let encoded = dispatcher.convert(&input, &target, &NamedParameters::new(), &metadata())?;
    let reread = dispatcher.decode(
        &SourceFile {
            bytes: &encoded.bytes,
            path: &target.output_path,
            format: "jscad",
        },
        &target.output_path,
    )?;
    assert!(original.is_equivalent(&reread));
    Ok(())
}

#[test]
fn test_mesh_round_trips() -> Result<()> {
    let dispatcher = ConversionDispatcher::default();
    let params = NamedParameters::new();
    let scad = SourceFile {
        bytes: b"rotate([0, 0, 30]) cylinder(h = 4, r1 = 2, r2 = 1, $fn = 12);",
        path: Path::new("cone.scad"),
        format: "scad",
    };
    let reference = dispatcher
        .decode(&scad, Path::new("cone.stl"))?
        .to_mesh(&params)
        .map(Model::Mesh)?;

    for (encode_as, decode_as) in [("stla", "stl"), ("stlb", "stl"), ("amf", "amf"), ("jscad", "jscad")] {
        let encoded = dispatcher.encode(&reference, encode_as, &params, &metadata())?;
        let path = PathBuf::from(format!("cone.{}", decode_as));
        let decoded = dispatcher.decode(
            &SourceFile {
                bytes: &encoded.bytes,
                path: &path,
                format: decode_as,
            },
            Path::new("out"),
        )?;
        let decoded = Model::Mesh(decoded.to_mesh(&params)?);
        assert!(decoded.is_equivalent(&reference), "{} round trip", encode_as);
    }
    Ok(())
}
