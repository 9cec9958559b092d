// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use crate::error::PipelineError;
use crate::io::ObjectSummary;
use crate::pipeline::RunReport;
use colored::*;
use std::error::Error as _;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report a finished run
    pub fn report_run(report: &RunReport) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Input:".bold(), report.input.display().to_string().cyan());
        println!("{}", "━".repeat(80).bright_black());

        if report.skipped.is_empty() {
            println!(
                "{} {}",
                "✅".green(),
                format!("{} of {} objects consolidated", report.built, report.records)
                    .green()
                    .bold()
            );
        } else {
            println!(
                "{} {}",
                "⚠️ ".yellow(),
                format!(
                    "{} of {} objects consolidated, {} skipped",
                    report.built,
                    report.records,
                    report.skipped.len()
                )
                .yellow()
                .bold()
            );
        }

        println!("\n{}", "Build:".bold());
        Self::print_field("Mode", report.mode.as_str().to_string());
        Self::print_field("Detail level", format!("{}", report.detail_level));
        Self::print_field("Triangulated", report.triangulated.to_string());
        Self::print_field(
            "Offset",
            report
                .offset
                .map_or_else(|| "off".to_string(), |d| format!("{d}")),
        );
        Self::print_field("Cell size", format!("{}", report.cell_size));
        for lane in &report.lanes {
            Self::print_field(
                &format!("Lane {}", lane.lane),
                format!("{} records, {} built", lane.records, lane.built),
            );
        }
        for skipped in &report.skipped {
            println!(
                "  {} {} {}",
                "skipped".yellow(),
                skipped.id.cyan(),
                skipped.reason.bright_black()
            );
        }

        println!("\n{}", "Result:".bold());
        Self::print_field("Cells", report.cells.to_string());
        Self::print_field("Volume", format!("{:.3} m³", report.volume));
        Self::print_field(
            "Simple",
            if report.simple {
                "yes".green().to_string()
            } else {
                format!(
                    "no ({} volumes, {} voids)",
                    report.topology.volumes, report.topology.voids
                )
                .yellow()
                .to_string()
            },
        );
        Self::print_field("Shells", report.shells.to_string());
        Self::print_field(
            "Exterior",
            format!(
                "{} faces, {} vertices",
                report.exterior_faces, report.exterior_vertices
            ),
        );
        Self::print_field("Output", report.output.display().to_string());

        if let Some(hull) = &report.hull {
            Self::print_field(
                "Convex hull",
                format!(
                    "{} triangles, {:.3} m³ -> {}",
                    hull.triangles,
                    hull.volume,
                    hull.output.display()
                ),
            );
        }
        if let Some(distance) = report.hausdorff_distance {
            Self::print_field("Hausdorff", format!("{distance:.4} m"));
        }

        println!("\n{}", "Performance:".bold());
        println!(
            "  {} {}",
            "Elapsed:".bright_black(),
            Self::format_duration(report.elapsed).yellow()
        );
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report the failing stage and its cause chain
    pub fn report_failure(error: &PipelineError) {
        eprintln!(
            "\n{} {} {}",
            "❌ Error:".red().bold(),
            format!("[{}]", error.stage()).red(),
            error
        );
        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("   {} {}", "caused by:".bright_black(), cause);
            source = cause.source();
        }
    }

    /// List the objects of a document
    pub fn report_objects(objects: &[ObjectSummary]) {
        println!("{}", format!("{} objects", objects.len()).bold());
        for object in objects {
            let lods = if object.lods.is_empty() {
                "-".to_string()
            } else {
                object
                    .lods
                    .iter()
                    .map(|lod| lod.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let children = if object.children > 0 {
                format!(" ({} children)", object.children)
            } else {
                String::new()
            };
            println!(
                "  {} {} {}{}",
                object.id.cyan(),
                object.kind.bright_black(),
                format!("lod {lods}").yellow(),
                children.bright_black()
            );
        }
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    /// Print success message
    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_field(name: &str, value: String) {
        println!("  {} {}", format!("{}:", name).bright_black(), value);
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
