// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyconvert CLI

use anyhow::{Context, Result};
use polyconvert::cli::{ArgumentParser, Reporter};
use polyconvert::{execute_plan, plan_request, ConvertError, ConverterConfig, FormatRegistry};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

fn main() -> Result<ExitCode> {
    let config = ConverterConfig::load().context("Failed to load polyconvert configuration")?;
    init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    Ok(run(args, &config))
}

/// `RUST_LOG` first, then the configured filter, then `warn`
fn init_tracing(config: &ConverterConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Vec<String>, config: &ConverterConfig) -> ExitCode {
    let registry = FormatRegistry::new();

    let parsed = ArgumentParser::new(registry).parse_with(args, || Reporter::report_environment(&registry, config));
    let request = match parsed {
        Ok(request) => request,
        Err(err) => return fail_early(&err),
    };

    let plan = match plan_request(&request, &registry) {
        Ok(plan) => plan,
        Err(err) => return fail_early(&err),
    };

    Reporter::report_conversion(&plan.input_path, &plan.output.output_path, plan.format_name);

    match execute_plan(&plan, &request.named_parameters, config) {
        Ok(report) => {
            Reporter::report_success(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "conversion failed");
            Reporter::failure(&format!("conversion failed: {}", err));
            exit_code(&err)
        }
    }
}

fn fail_early(err: &ConvertError) -> ExitCode {
    Reporter::report_error(&err.to_string());
    if err.wants_usage() {
        Reporter::usage();
    }
    exit_code(err)
}

fn exit_code(err: &ConvertError) -> ExitCode {
    ExitCode::from(err.exit_code() as u8)
}
