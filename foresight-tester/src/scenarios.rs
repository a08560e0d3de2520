use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use foresight_core::persist::{load_from_json, save_to_json};
use foresight_core::{
    Axis, FileStorage, ForceId, ForesightReport, GenerationError, GenerationOutcome,
    ImpactScores, MainPhase, PHASE_ORDER, PersistError, PersistedSnapshot, PlannerSession,
    ROUTE_ORDER, ResponseType, RiskProfile, SessionStorage, SimulationState, SubStep,
    can_navigate_to, composite_impact_score, next_step_id, orthogonality_score, prev_step_id,
    suggested_response,
};

use crate::logic::planner::{
    FORCE_COUNT, FlakyGenerator, RunContext, SeededGenerator, populated_state, random_context,
    run_full_workflow, select_and_rate_all,
};
use crate::util::{artifacts_dir, write_session_artifacts};

pub type ScenarioCheck = fn(&mut RunContext) -> Result<()>;

/// A named logic check run once per seed and iteration.
#[derive(Clone, Copy)]
pub struct LogicScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

#[derive(Debug, Error)]
pub enum ScenarioLookupError {
    #[error("unknown scenario: {0}")]
    Unknown(String),
}

const SCENARIOS: &[LogicScenario] = &[
    LogicScenario {
        key: "full-workflow",
        name: "Full Workflow",
        description: "Context to action plan through the engine, with save/load",
        check: full_workflow,
    },
    LogicScenario {
        key: "navigation-guard",
        name: "Navigation Guard",
        description: "Step graph totality and phase reachability",
        check: navigation_guard,
    },
    LogicScenario {
        key: "persistence-roundtrip",
        name: "Persistence Round Trip",
        description: "Snapshot encode/decode and storage backends",
        check: persistence_roundtrip,
    },
    LogicScenario {
        key: "axis-exclusivity",
        name: "Axis Exclusivity",
        description: "Random axis assignments never share a force",
        check: axis_exclusivity,
    },
    LogicScenario {
        key: "generation-failures",
        name: "Generation Failures",
        description: "Failed, duplicate and stale generation requests",
        check: generation_failures,
    },
    LogicScenario {
        key: "async-generation",
        name: "Async Generation",
        description: "Force generation through the async collaborator",
        check: async_generation,
    },
    LogicScenario {
        key: "scoring-rules",
        name: "Scoring Rules",
        description: "Composite, orthogonality and response heuristics on random input",
        check: scoring_rules,
    },
    LogicScenario {
        key: "reset",
        name: "Reset",
        description: "Reset restores every default at once",
        check: reset,
    },
];

pub fn get_scenario(name: &str) -> Result<LogicScenario, ScenarioLookupError> {
    let key = name.trim().to_lowercase();
    SCENARIOS
        .iter()
        .find(|scenario| scenario.key == key)
        .copied()
        .ok_or(ScenarioLookupError::Unknown(key))
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS
        .iter()
        .map(|scenario| scenario.key.to_string())
        .collect()
}

fn full_workflow(ctx: &mut RunContext) -> Result<()> {
    let run = run_full_workflow(ctx)?;
    ensure!(run.steps_visited == ROUTE_ORDER.len(), "not every step visited");
    ensure!(run.report.scenarios.len() == 4, "report should list four scenarios");
    for scenario in &run.report.scenarios {
        ensure!(
            (20..=100).contains(&scenario.composite_score),
            "composite score {} out of range",
            scenario.composite_score
        );
        ensure!(
            scenario.assigned_response == Some(scenario.suggested_response),
            "accepted suggestion missing for {}",
            scenario.id
        );
        ensure!(
            scenario.actions.len() == 1,
            "expected one selected action for {}",
            scenario.id
        );
    }
    ensure!(
        run.report.critical_uncertainties.len() == run.critical_count,
        "report and workflow disagree on critical uncertainties"
    );
    ensure!(
        run.report.orthogonality == Some(run.orthogonality),
        "report orthogonality mismatch"
    );

    let mut replay = RunContext::new(&ctx.scenario_key, ctx.seed, false, None);
    let again = run_full_workflow(&mut replay)?;
    ensure!(
        again.report == run.report,
        "same seed produced a different report"
    );

    if let Some(base) = ctx.save_dir.as_deref() {
        let dir = artifacts_dir(base, &ctx.scenario_key, ctx.seed);
        let storage = FileStorage::new(&dir);
        storage.save_session("final", &run.final_state)?;
        let snapshot = PersistedSnapshot::capture(&run.final_state).to_json()?;
        write_session_artifacts(&dir, &snapshot, &run.report.to_markdown())?;
        ctx.trace(&format!("artifacts written to {}", dir.display()));
    }
    Ok(())
}

fn navigation_guard(ctx: &mut RunContext) -> Result<()> {
    for window in ROUTE_ORDER.windows(2) {
        ensure!(next_step_id(window[0].as_str()) == Some(window[1]), "next_step broken");
        ensure!(prev_step_id(window[1].as_str()) == Some(window[0]), "prev_step broken");
    }
    for unknown in ["axis-labels", "quadrant-names", "review", ""] {
        ensure!(
            next_step_id(unknown).is_none() && prev_step_id(unknown).is_none(),
            "{unknown:?} must not be part of the route"
        );
    }

    let completed = ctx.rng.gen_range(0..PHASE_ORDER.len());
    let mut state = SimulationState::new();
    for phase in &PHASE_ORDER[..completed] {
        state.complete_main_phase(*phase);
        state.complete_main_phase(*phase);
    }
    ensure!(
        state.progress().completed_phases.len() == completed,
        "phase completion not idempotent"
    );
    let current = PHASE_ORDER[completed];
    let Some(&entry) = current.steps().first() else {
        anyhow::bail!("phase {current} has no steps");
    };
    state.set_current_step(entry);
    ensure!(state.current_phase() == current, "phase not derived from step");

    for step in ROUTE_ORDER {
        let phase_index = step.phase().index();
        let reachable = can_navigate_to(step, state.progress());
        ensure!(
            reachable == (phase_index <= completed),
            "{step} reachability {reachable} with {completed} completed phases"
        );
    }
    let mut walker = state.clone();
    let beyond = ROUTE_ORDER
        .into_iter()
        .find(|step| step.phase().index() > completed);
    if let Some(step) = beyond {
        ensure!(!walker.navigate_to(step), "guard let {step} through");
        ensure!(walker == state, "denied navigation changed state");
    }
    if current != MainPhase::Decide {
        walker.complete_main_phase(current);
        if let Some(&next_entry) = current.next().and_then(|p| p.steps().first()) {
            ensure!(walker.navigate_to(next_entry), "completed phase should unlock the next");
        }
    }
    Ok(())
}

fn persistence_roundtrip(ctx: &mut RunContext) -> Result<()> {
    let state = populated_state(ctx)?;
    ensure!(!state.forces().is_empty(), "fixture needs forces");
    ensure!(!state.action_items().is_empty(), "fixture needs action items");

    let json = save_to_json(&state)?;
    ensure!(load_from_json(&json)? == state, "JSON round trip lost data");

    let mut future: serde_json::Value = serde_json::from_str(&json)?;
    future["version"] = serde_json::json!(99);
    ensure!(
        matches!(
            load_from_json(&future.to_string()),
            Err(PersistError::UnsupportedVersion { found: 99 })
        ),
        "future snapshot version accepted"
    );

    let base = ctx.save_dir.clone().unwrap_or_else(std::env::temp_dir);
    let dir = artifacts_dir(&base, &ctx.scenario_key, ctx.seed);
    let storage = FileStorage::new(&dir);
    storage.save_session("roundtrip", &state)?;
    let restored = storage
        .load_session("roundtrip")?
        .context("saved slot missing")?;
    ensure!(restored == state, "file round trip lost data");
    if ctx.save_dir.is_none() {
        storage.delete_session("roundtrip")?;
        let _ = std::fs::remove_dir_all(&dir);
    }
    Ok(())
}

fn axis_exclusivity(ctx: &mut RunContext) -> Result<()> {
    let mut state = SimulationState::new();
    let context = random_context(&mut ctx.rng);
    state.set_forces(SeededGenerator::new(ctx.seed, FORCE_COUNT).forces_for(&context)?);
    select_and_rate_all(&mut state, &mut ctx.rng);
    let ids: Vec<ForceId> = state.forces().iter().map(|f| f.id.clone()).collect();

    for _ in 0..40 {
        let Some(id) = ids.choose(&mut ctx.rng).cloned() else {
            anyhow::bail!("no forces generated");
        };
        match ctx.rng.gen_range(0..4) {
            0 => {
                state.set_x_axis(Some(id.clone()));
                ensure!(state.axis_id(Axis::X) == Some(&id), "x axis not assigned");
            }
            1 => {
                state.set_y_axis(Some(id.clone()));
                ensure!(state.axis_id(Axis::Y) == Some(&id), "y axis not assigned");
            }
            2 => {
                state.deselect_force(&id);
                ensure!(
                    state.axis_id(Axis::X) != Some(&id) && state.axis_id(Axis::Y) != Some(&id),
                    "deselected force still on an axis"
                );
                ensure!(state.force(&id).is_some(), "deselection removed the force");
                ensure!(
                    !state.set_y_axis(Some(id.clone())),
                    "unselected force accepted as axis"
                );
                state.select_force(&id);
            }
            _ => {
                ensure!(
                    !state.set_x_axis(Some(ForceId::from("missing"))),
                    "unknown force accepted as axis"
                );
            }
        }
        if let (Some(x), Some(y)) = (state.axis_id(Axis::X), state.axis_id(Axis::Y)) {
            ensure!(x != y, "force {x} holds both axes");
        }
    }
    Ok(())
}

fn random_failure(ctx: &mut RunContext) -> GenerationError {
    match ctx.rng.gen_range(0..4) {
        0 => GenerationError::Empty,
        1 => GenerationError::Network(String::from("connection reset")),
        2 => GenerationError::Server {
            status: ctx.rng.gen_range(500..600),
        },
        _ => GenerationError::Malformed(String::from("unexpected token")),
    }
}

fn generation_failures(ctx: &mut RunContext) -> Result<()> {
    let failure_count = ctx.rng.gen_range(1..=3);
    let failures: Vec<GenerationError> = (0..failure_count).map(|_| random_failure(ctx)).collect();
    let generator = FlakyGenerator::new(SeededGenerator::new(ctx.seed, FORCE_COUNT), failures.clone());

    let mut session = PlannerSession::new();
    session.with_state_mut(|state| {
        state.set_context(random_context(&mut ctx.rng));
        state.set_current_step(SubStep::Forces);
    });

    for expected in &failures {
        let err = session
            .generate_forces(&generator)
            .err()
            .context("scripted failure did not surface")?;
        ensure!(&err == expected, "expected {expected:?}, got {err:?}");
        ensure!(!err.to_string().is_empty(), "failure without user message");
        ensure!(session.state().forces().is_empty(), "failure touched forces");
        ensure!(!session.is_generating(), "failure left request in flight");
    }
    let outcome = session.generate_forces(&generator)?;
    ensure!(
        outcome == GenerationOutcome::Applied { count: FORCE_COUNT },
        "retry did not apply forces"
    );
    ensure!(session.last_generation_error().is_none(), "stale error kept");

    let ticket = session.begin_generation().context("ticket")?;
    ensure!(session.begin_generation().is_none(), "duplicate request issued");
    ensure!(
        matches!(session.generate_forces(&generator), Err(GenerationError::InFlight)),
        "in-flight request not reported"
    );
    session.state_mut().set_current_step(SubStep::Rating);
    let late = session.complete_generation(ticket, Err(GenerationError::Empty))?;
    ensure!(late == GenerationOutcome::Stale, "late result was applied");
    ensure!(
        session.state().forces().len() == FORCE_COUNT,
        "stale result changed forces"
    );
    Ok(())
}

fn async_generation(ctx: &mut RunContext) -> Result<()> {
    let handle = tokio::runtime::Handle::try_current()
        .context("async generation needs a tokio runtime")?;
    let generator = SeededGenerator::new(ctx.seed, FORCE_COUNT);
    let context = random_context(&mut ctx.rng);
    let (outcome, forces) = tokio::task::block_in_place(|| {
        handle.block_on(async {
            let mut session = PlannerSession::new();
            session.with_state_mut(|state| {
                state.set_context(context);
                state.set_current_step(SubStep::Forces);
            });
            let outcome = session.generate_forces_async(&generator).await;
            (outcome, session.into_state().forces().to_vec())
        })
    });
    ensure!(
        outcome? == GenerationOutcome::Applied { count: FORCE_COUNT },
        "async generation did not apply forces"
    );
    ensure!(
        forces.iter().all(|force| !force.is_rated() && !force.is_custom),
        "async forces not normalized"
    );
    Ok(())
}

fn scoring_rules(ctx: &mut RunContext) -> Result<()> {
    for _ in 0..25 {
        let scores = ImpactScores::new(ctx.score(), ctx.score(), ctx.score(), ctx.score());
        let risk = RiskProfile::new(ctx.score(), ctx.score());
        let composite = composite_impact_score(&scores);
        ensure!((20..=100).contains(&composite), "composite {composite} out of range");

        let impact = f64::from(scores.repercussion) + f64::from(scores.strategic_disruption);
        let probability = scores.probability;
        let response = suggested_response(&scores, &risk);
        ensure!(
            (response == ResponseType::PriorityAction) == (probability >= 4 && impact >= 8.0),
            "priority-action rule broken for {scores:?}"
        );
        if response == ResponseType::Ignore {
            ensure!(
                probability < 3 && impact < 6.0,
                "ignored a scenario that deserves attention: {scores:?}"
            );
        }
    }

    let mut state = SimulationState::new();
    let context = random_context(&mut ctx.rng);
    state.set_forces(SeededGenerator::new(ctx.seed, FORCE_COUNT).forces_for(&context)?);
    select_and_rate_all(&mut state, &mut ctx.rng);
    let forces = state.forces();
    for x in forces {
        for y in forces {
            let score = orthogonality_score(x, y);
            ensure!(score <= 100, "orthogonality {score} out of range");
            ensure!(score == orthogonality_score(y, x), "orthogonality not symmetric");
        }
    }
    Ok(())
}

fn reset(ctx: &mut RunContext) -> Result<()> {
    let state = populated_state(ctx)?;
    let mut session = PlannerSession::from_state(state);
    session.with_state_mut(|state| state.complete_main_phase(MainPhase::Discover));
    let ticket = session.begin_generation().context("ticket")?;
    session.reset();
    ensure!(
        session.state() == &SimulationState::default(),
        "reset left planning data behind"
    );
    ensure!(!session.is_generating(), "reset kept the in-flight flag");
    let late = session.complete_generation(ticket, Err(GenerationError::Empty))?;
    ensure!(late == GenerationOutcome::Stale, "pre-reset result applied");
    ensure!(
        ForesightReport::from_state(session.state()).scenarios.is_empty(),
        "report still shows scenarios"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(key: &str, seed: u64) -> Result<()> {
        let scenario = get_scenario(key)?;
        let mut ctx = RunContext::new(scenario.key, seed, false, None);
        (scenario.check)(&mut ctx)
    }

    #[test]
    fn catalog_lookup_is_case_insensitive() {
        assert_eq!(get_scenario(" Reset ").unwrap().key, "reset");
        assert!(matches!(
            get_scenario("smoke"),
            Err(ScenarioLookupError::Unknown(_))
        ));
        assert_eq!(list_scenarios().len(), all_scenario_keys().len());
    }

    #[test]
    fn synchronous_scenarios_pass_across_seeds() {
        for key in all_scenario_keys() {
            if key == "async-generation" {
                continue;
            }
            for seed in [1, 42, 1337] {
                run(&key, seed).unwrap_or_else(|err| panic!("{key} seed {seed}: {err:#}"));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn async_scenario_passes_inside_runtime() {
        run("async-generation", 7).unwrap();
    }

    #[test]
    fn async_scenario_reports_missing_runtime() {
        assert!(run("async-generation", 7).is_err());
    }
}
