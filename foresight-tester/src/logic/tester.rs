use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::logic::planner::RunContext;
use crate::scenarios::LogicScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

pub struct LogicTester {
    verbose: bool,
    save_dir: Option<PathBuf>,
}

impl LogicTester {
    pub fn new(verbose: bool, save_dir: Option<&Path>) -> Self {
        Self {
            verbose,
            save_dir: save_dir.map(Path::to_path_buf),
        }
    }

    pub fn run_scenario(
        &self,
        scenario: &LogicScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {seed})",
                    scenario.name.bright_white()
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &LogicScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut durations = Vec::with_capacity(iterations);

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let mut ctx = RunContext::new(
                scenario.key,
                iteration_seed,
                self.verbose,
                self.save_dir.as_deref(),
            );
            let start_time = Instant::now();
            let outcome = (scenario.check)(&mut ctx);
            durations.push(start_time.elapsed());

            match outcome {
                Ok(()) => successes += 1,
                Err(err) => {
                    log::debug!("{} failed on seed {iteration_seed}: {err:?}", scenario.key);
                    failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): {err:#}",
                        i + 1
                    ));
                }
            }
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::get_scenario;

    #[test]
    fn results_count_successes_per_seed() {
        let tester = LogicTester::new(false, None);
        let scenario = get_scenario("reset").expect("reset scenario");
        let results = tester.run_scenario(&scenario, &[1, 2], 3);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed && r.successful_iterations == 3));
        assert_eq!(results[1].seed, 2);
    }

    #[test]
    fn failures_are_recorded_with_seed() {
        let scenario = LogicScenario {
            key: "always-fails",
            name: "Always Fails",
            description: "fails on purpose",
            check: |ctx| anyhow::bail!("boom at {}", ctx.seed),
        };
        let results = LogicTester::new(false, None).run_scenario(&scenario, &[5], 2);
        assert!(!results[0].passed);
        assert_eq!(results[0].failures.len(), 2);
        assert!(results[0].failures[1].contains("seed 6"));
        let json = serde_json::to_string(&results[0]).unwrap();
        assert!(json.contains("\"average_duration\""));
    }
}
