// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::USAGE;
use crate::config::ConverterConfig;
use crate::format::FormatRegistry;
use crate::pipeline::ConversionReport;
use colored::*;
use std::path::Path;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// `converting <in> -> <out> (<format>)`
    pub fn report_conversion(input: &Path, output: &Path, format_name: &str) {
        println!(
            "{} {} {} {} ({})",
            "converting".bold(),
            input.display().to_string().cyan(),
            "->".bright_black(),
            output.display().to_string().cyan(),
            format_name.yellow()
        );
    }

    /// Final line for a written output
    pub fn report_success(report: &ConversionReport) {
        Self::success(&format!(
            "wrote {} to {} in {}",
            Self::format_bytes(report.bytes_written),
            report.output_path.display(),
            Self::format_duration(report.elapsed)
        ));
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    /// Final line for a conversion that did not produce output
    pub fn failure(message: &str) {
        println!("{} {}", "❌".red(), message.red());
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    pub fn usage() {
        eprintln!("\n{}", USAGE);
    }

    /// `-v` report: version, configuration and the format table
    pub fn report_environment(registry: &FormatRegistry, config: &ConverterConfig) {
        println!("\n{}", "━".repeat(60).bright_black());
        println!("{} {}", "polyconvert".bold(), env!("CARGO_PKG_VERSION").cyan());
        println!("{}", "━".repeat(60).bright_black());
        println!("  {} {}", "Producer:".bright_black(), config.producer);
        if config.include_paths.is_empty() {
            println!("  {} {}", "Include paths:".bright_black(), "(none)".bright_black());
        } else {
            for path in &config.include_paths {
                println!("  {} {}", "Include path:".bright_black(), path.display());
            }
        }
        println!(
            "  {} depth {}, {}",
            "Include limits:".bright_black(),
            config.max_include_depth,
            Self::format_bytes(config.max_include_bytes as usize)
        );

        println!("\n{}", "Formats:".bold());
        for format in registry.formats() {
            println!(
                "  {:<6} {} {} {}",
                format.token.cyan(),
                Self::capability("read", format.supports_decode),
                Self::capability("write", format.supports_encode),
                format.display_name
            );
        }
        println!("{}", "━".repeat(60).bright_black());
    }

    fn capability(label: &str, enabled: bool) -> ColoredString {
        let padded = format!("{:<5}", label);
        if enabled {
            padded.green()
        } else {
            "-".repeat(5).bright_black()
        }
    }

    /// Format byte counts for display
    fn format_bytes(bytes: usize) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KiB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
        }
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}
