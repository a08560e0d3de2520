mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::LogicTester;
use scenarios::{all_scenario_keys, get_scenario, list_scenarios};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "foresight-tester", version = "0.1.0")]
#[command(about = "Automated logic testing for the Foresight planning workflow")]
struct Args {
    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "full-workflow")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep saved sessions and rendered reports below this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = parse_seeds(&args.seeds)?;

    let (results, unknown) = run_logic_scenarios(&args, &scenarios, &seeds);

    write_reports(&args, &results, start_time)?;

    if unknown > 0 || results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut sink = ReportSink::open(args.output.as_deref())?;
    writeln!(sink, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(sink, "  {key:25} - {description}")?;
    }
    sink.finish()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🔮 Foresight Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in all_scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

fn parse_seeds(seeds_arg: &str) -> Result<Vec<u64>> {
    let seeds = split_csv(seeds_arg)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed {token:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(!seeds.is_empty(), "at least one seed is required");
    Ok(seeds)
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
) -> (Vec<logic::ScenarioResult>, usize) {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();
    let mut unknown = 0;

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(args.verbose, args.save_dir.as_deref());

    for scenario_name in scenarios {
        match get_scenario(scenario_name) {
            Ok(scenario) => {
                results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
            }
            Err(err) => {
                unknown += 1;
                eprintln!("⚠️  {}", err.to_string().yellow());
            }
        }
    }

    (results, unknown)
}

fn write_reports(args: &Args, results: &[logic::ScenarioResult], start_time: Instant) -> Result<()> {
    let mut sink = ReportSink::open(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut sink, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut sink, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut sink,
                    "# Foresight Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut sink, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut sink, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut sink,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut sink)?;
            writeln!(&mut sink, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    sink.finish()
}

/// Where listings and reports go: stdout, or the `--output` file.
struct ReportSink {
    inner: BufWriter<Box<dyn Write>>,
    path: Option<PathBuf>,
}

impl ReportSink {
    fn open(path: Option<&Path>) -> Result<Self> {
        let inner: Box<dyn Write> = match path {
            Some(path) => Box::new(
                File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?,
            ),
            None => Box::new(stdout()),
        };
        Ok(Self {
            inner: BufWriter::new(inner),
            path: path.map(Path::to_path_buf),
        })
    }

    fn finish(mut self) -> Result<()> {
        let destination = self
            .path
            .as_ref()
            .map_or_else(|| String::from("stdout"), |path| path.display().to_string());
        self.inner
            .flush()
            .with_context(|| format!("failed to write report to {destination}"))
    }
}

impl Write for ReportSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            scenarios: "reset".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            save_dir: None,
        }
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Reset".to_string(),
            seed: 1337,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            average_duration: Duration::from_millis(10),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("foresight-main-{}-{name}", std::process::id()))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("reset,all");
        assert_eq!(expanded.first().map(String::as_str), Some("reset"));
        assert!(expanded.contains(&"full-workflow".to_string()));
        assert_eq!(expanded.len(), all_scenario_keys().len());
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("reset, full-workflow");
        assert_eq!(
            expanded,
            vec!["reset".to_string(), "full-workflow".to_string()]
        );
    }

    #[test]
    fn parse_seeds_rejects_garbage() {
        assert_eq!(parse_seeds("1, 2,3").unwrap(), vec![1, 2, 3]);
        let err = parse_seeds("7,banana").unwrap_err();
        assert!(err.to_string().contains("banana"));
        assert!(parse_seeds(" , ").is_err());
    }

    #[test]
    fn run_logic_scenarios_counts_unknown_names() {
        let args = base_args();
        let (results, unknown) =
            run_logic_scenarios(&args, &["reset".to_string(), "smoke".to_string()], &[4, 5]);
        assert_eq!(unknown, 1);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn write_reports_emits_json_for_empty_results() {
        let temp = temp_path("empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert_eq!(content.trim(), "[]");
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_emits_markdown_report() {
        let temp = temp_path("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("# Foresight Logic Test Results"));
        assert!(content.contains("Reset"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let temp = temp_path("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("Total time"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("axis-exclusivity"));
        let _ = std::fs::remove_file(temp);
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn report_sink_writes_to_stdout() {
        let mut sink = ReportSink::open(None).unwrap();
        sink.write_all(b"ok\n").unwrap();
        sink.finish().unwrap();
    }

    #[test]
    fn report_sink_names_the_file_it_cannot_create() {
        let missing = temp_path("no-such-dir").join("report.json");
        let err = ReportSink::open(Some(&missing)).err().expect("directory is missing");
        assert!(err.to_string().contains("report.json"));
    }
}
