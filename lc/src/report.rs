//! Console and JSON rendering of validation results

use std::fmt::Write;

use colored::Colorize;
use serde_json::{Value, json};

use crate::domain::{CheckStatus, FileValidationResult, FunctionValidationResult, LoopValidationResult};

/// Alternatives listed per missing function
const ALTERNATIVES_SHOWN: usize = 3;

/// Reasoning characters shown per alternative
const REASONING_CHARS: usize = 100;

fn icon(passed: bool) -> colored::ColoredString {
    if passed { "✓".green() } else { "✗".red() }
}

fn file_detail(file: &FileValidationResult) -> String {
    let mut details = Vec::new();
    if !file.exists {
        details.push("File not found".to_string());
    }
    for check in file.checks.iter().filter(|c| c.status != CheckStatus::Passed) {
        let why = if check.detail.is_empty() { "failed" } else { check.detail.as_str() };
        details.push(format!("{}('{}'): {}", check.check_type, check.pattern, why));
    }
    if details.is_empty() { "OK".to_string() } else { details.join("; ") }
}

fn function_detail(func: &FunctionValidationResult) -> String {
    if !func.detail.is_empty() {
        func.detail.clone()
    } else if func.found {
        "Found".to_string()
    } else {
        "Missing".to_string()
    }
}

fn render_loop(out: &mut String, result: &LoopValidationResult) -> std::fmt::Result {
    let status = if result.all_passed() {
        "COMPLETE".green()
    } else {
        "INCOMPLETE".red()
    };
    writeln!(
        out,
        "{} ({})  {} {}",
        result.loop_name.bold(),
        result.loop_id,
        status,
        format!(
            "({}/{} checks, {:.0}ms)",
            result.passed_checks(),
            result.total_checks(),
            result.elapsed_ms()
        )
        .dimmed()
    )?;

    if result.all_passed() {
        writeln!(out, "   {}", format!("Growth loop complete: {}", result.loop_name).green())?;
        return writeln!(out);
    }

    for file in &result.file_results {
        let state = if file.exists { "Exists" } else { "Missing" };
        writeln!(
            out,
            "  {} {}  {}  {}",
            icon(file.passed()),
            file.path.cyan(),
            state,
            file_detail(file).dimmed()
        )?;
    }

    for func in &result.function_results {
        let mut detail = function_detail(func);
        if !func.alternatives.is_empty() {
            detail.push_str(&format!(" | {} alternative(s) found", func.alternatives.len()));
        }
        writeln!(
            out,
            "  {} {}  {}  {}",
            icon(func.passed()),
            func.name.cyan(),
            func.file.dimmed(),
            detail.dimmed()
        )?;
    }

    for func in result.function_results.iter().filter(|f| !f.alternatives.is_empty()) {
        writeln!(out, "    {}", format!("Alternatives for '{}':", func.name).dimmed())?;
        for alt in func.alternatives.iter().take(ALTERNATIVES_SHOWN) {
            writeln!(
                out,
                "      • {} in {} ({:.0}% match)",
                alt.function_name.cyan(),
                alt.file.dimmed(),
                alt.confidence * 100.0
            )?;
            if !alt.reasoning.is_empty() {
                let reasoning: String = alt.reasoning.chars().take(REASONING_CHARS).collect();
                writeln!(out, "        {}", reasoning.dimmed())?;
            }
        }
        if func.alternatives.len() > ALTERNATIVES_SHOWN {
            writeln!(
                out,
                "      {}",
                format!("... and {} more", func.alternatives.len() - ALTERNATIVES_SHOWN).dimmed()
            )?;
        }
    }
    writeln!(out)
}

/// Human-readable report for a batch
pub fn render_report(results: &[LoopValidationResult]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str(&format!("{}\n", "No growth loops found to validate.".yellow()));
        return out;
    }

    let complete = results.iter().filter(|r| r.all_passed()).count();
    let _ = writeln!(
        out,
        "\n{}  {}/{} loops complete\n",
        "Growth Loop Validation".bold().cyan(),
        complete,
        results.len()
    );

    for result in results {
        let _ = render_loop(&mut out, result);
    }

    if complete == results.len() {
        let _ = writeln!(out, "{}", "All growth loops fully implemented!".bold().green());
    } else {
        let _ = writeln!(
            out,
            "{}",
            format!("{} loop(s) have unmet requirements.", results.len() - complete)
                .bold()
                .yellow()
        );
    }
    out
}

/// Print the human-readable report to stdout
pub fn print_report(results: &[LoopValidationResult]) {
    print!("{}", render_report(results));
}

/// Machine-readable report with the derived `passed` flags filled in
pub fn report_json(results: &[LoopValidationResult]) -> Value {
    let loops: Vec<Value> = results
        .iter()
        .map(|result| {
            let mut value = serde_json::to_value(result).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                map.insert("all_passed".to_string(), json!(result.all_passed()));
                map.insert("total_checks".to_string(), json!(result.total_checks()));
                map.insert("passed_checks".to_string(), json!(result.passed_checks()));
                if let Some(Value::Array(files)) = map.get_mut("file_results") {
                    for (entry, file) in files.iter_mut().zip(&result.file_results) {
                        if let Value::Object(m) = entry {
                            m.insert("passed".to_string(), json!(file.passed()));
                        }
                    }
                }
                if let Some(Value::Array(funcs)) = map.get_mut("function_results") {
                    for (entry, func) in funcs.iter_mut().zip(&result.function_results) {
                        if let Value::Object(m) = entry {
                            m.insert("passed".to_string(), json!(func.passed()));
                        }
                    }
                }
            }
            value
        })
        .collect();

    json!({
        "total_loops": results.len(),
        "complete_loops": results.iter().filter(|r| r.all_passed()).count(),
        "loops": loops,
    })
}
