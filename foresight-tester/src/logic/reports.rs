use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

#[allow(clippy::cast_precision_loss)]
fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64) * 100.0
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total scenario runs: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(
        writer,
        "Success rate: {:.1}%",
        success_rate(passed_tests, total_tests)
    )?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            writer,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Foresight Logic Test Results\n")?;
    writeln!(
        writer,
        "_Generated {}_\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenario runs**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {failed_tests}")?;
    writeln!(
        writer,
        "- **Success rate**: {:.1}%\n",
        success_rate(passed_tests, total_tests)
    )?;

    writeln!(writer, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(
            writer,
            "### {} {} (seed {})\n",
            status, result.scenario_name, result.seed
        )?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> Vec<ScenarioResult> {
        vec![
            ScenarioResult {
                scenario_name: String::from("Full Workflow"),
                seed: 1,
                passed: true,
                iterations_run: 2,
                successful_iterations: 2,
                failures: Vec::new(),
                average_duration: Duration::from_millis(3),
            },
            ScenarioResult {
                scenario_name: String::from("Axis Exclusivity"),
                seed: 1,
                passed: false,
                iterations_run: 2,
                successful_iterations: 1,
                failures: vec![String::from("Iteration 2 (seed 2): axes collided")],
                average_duration: Duration::from_millis(1),
            },
        ]
    }

    #[test]
    fn markdown_report_lists_failures() {
        let mut buffer = Vec::new();
        generate_markdown_report(&mut buffer, &sample_results()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# Foresight Logic Test Results"));
        assert!(text.contains("- **Failed**: 1"));
        assert!(text.contains("axes collided"));
    }

    #[test]
    fn json_report_is_an_array() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &sample_results()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[0]["average_duration"], 3);
    }

    #[test]
    fn console_report_names_extremes() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_report(&mut buffer, &sample_results(), Duration::from_millis(9))
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("Fastest: Axis Exclusivity"));
        assert!(text.contains("Slowest: Full Workflow"));
    }
}
