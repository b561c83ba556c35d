// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Colored terminal output for the CLI

use super::batch::BatchReport;
use crate::result::RenderResult;
use colored::*;
use std::time::Duration;

pub struct Reporter;

impl Reporter {
    /// Report a finished render, successful or not
    pub fn report_render(file: &str, result: &RenderResult, duration: Duration) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Rendered:".bold(), file.cyan());
        println!("{}", "━".repeat(80).bright_black());

        if result.success() {
            println!("  {} {}", "Vertices:".bright_black(), result.vertex_count().to_string().cyan());
            println!("  {} {}", "Triangles:".bright_black(), result.triangle_count().to_string().cyan());
        } else {
            println!("  {} {}", "Status:".bright_black(), "failed".red());
        }
        println!("  {} {}", "Time:".bright_black(), Self::format_duration(duration).yellow());
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Echo captured engine output, highlighting warnings and errors
    pub fn report_console(console: &str) {
        for line in console.lines() {
            if line.starts_with("WARNING:") {
                println!("{}", line.yellow());
            } else if line.starts_with("ERROR:") {
                println!("{}", line.red());
            } else {
                println!("{}", line);
            }
        }
    }

    pub fn report_batch(report: &BatchReport) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {} files", "Batch:".bold(), report.total.to_string().cyan());
        println!("{}", "━".repeat(80).bright_black());

        for file in &report.files {
            let name = file.path.display().to_string();
            match &file.error {
                None => println!(
                    "  {} {} {}",
                    "✓".green(),
                    name,
                    format!("({} triangles)", file.triangles).bright_black()
                ),
                Some(error) => println!("  {} {} {}", "✗".red(), name, error.red()),
            }
        }

        println!("{}", "━".repeat(80).bright_black());
        let failed = if report.failed == 0 {
            report.failed.to_string().green()
        } else {
            report.failed.to_string().red()
        };
        println!(
            "  {} {}  {} {}",
            "Succeeded:".bright_black(),
            report.succeeded.to_string().green(),
            "Failed:".bright_black(),
            failed
        );
    }

    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(Reporter::format_duration(Duration::from_micros(500)), "500µs");
        assert_eq!(Reporter::format_duration(Duration::from_millis(5)), "5.00ms");
        assert_eq!(Reporter::format_duration(Duration::from_secs(2)), "2.00s");
    }
}
