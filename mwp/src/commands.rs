// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Command implementations for the mwp CLI.

use std::path::{Path, PathBuf};

use miette::{Context, IntoDiagnostic};

use mwp_analysis::{analyze_program, AnalysisConfig, FuncStatus, Report};

/// Options for the `analyze` command.
pub struct AnalyzeOptions {
    /// Reject functions with unsupported syntax.
    pub strict: bool,
    /// Run to completion even when infinity is detected early.
    pub fin: bool,
    /// Skip writing the JSON result.
    pub no_save: bool,
    /// Directory for the JSON result.
    pub output: Option<PathBuf>,
}

/// Analyze a source file and report per-function verdicts.
pub fn analyze(input: &Path, options: &AnalyzeOptions) -> miette::Result<()> {
    let source = std::fs::read_to_string(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", input.display()))?;

    let (program, parse_errors) = mwp_parser::parse(&source);
    if !parse_errors.is_empty() {
        eprintln!("parse errors:");
        for error in &parse_errors {
            eprintln!("  {}", error.format_with_source(&source));
        }
        return Err(miette::miette!(
            "parsing failed with {} errors",
            parse_errors.len()
        ));
    }
    if program.functions.is_empty() {
        return Err(miette::miette!("{} contains no functions", input.display()));
    }

    let config = AnalysisConfig {
        strict: options.strict,
        fin: options.fin,
    };
    let mut report = analyze_program(&program, config);
    report.program.path = Some(input.display().to_string());
    report.program.n_lines = Some(source.lines().count());

    print_report(&report);

    if !options.no_save {
        let out_file = result_path(input, options.output.as_deref())?;
        save_report(&report, &out_file)?;
        println!("result saved to {}", out_file.display());
    }
    Ok(())
}

fn print_report(report: &Report) {
    for func in &report.functions {
        match func.status {
            FuncStatus::Bounded => {
                let bound = func.bound_fmt.as_deref().unwrap_or("0");
                println!("{}: {}", func.name, bound);
                if let Some(choices) = &func.choices {
                    println!(
                        "  {} derivation(s) over {} choice point(s), {}ms",
                        choices.n_bounds(),
                        func.index,
                        func.dur_ms()
                    );
                }
            }
            FuncStatus::Infinite => {
                println!("{}: infinite", func.name);
                for (source, targets) in &func.problematic_flows {
                    let list: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
                    println!("  {} ➔ {}", source, list.join(", "));
                }
            }
            FuncStatus::Unsupported => {
                println!("{}: unsupported syntax", func.name);
                for warning in &func.warnings {
                    println!("  {warning}");
                }
            }
            FuncStatus::Error => {
                println!("{}: analysis error", func.name);
                for warning in &func.warnings {
                    println!("  {warning}");
                }
            }
        }
    }
}

fn result_path(input: &Path, output: Option<&Path>) -> miette::Result<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    match output {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
            Ok(dir.join(format!("{stem}.json")))
        }
        None => Ok(input.with_file_name(format!("{stem}.json"))),
    }
}

fn save_report(report: &Report, path: &Path) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(report).into_diagnostic()?;
    std::fs::write(path, json)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}
