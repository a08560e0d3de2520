use anyhow::{Result, ensure};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use foresight_core::{
    ActionDraft, AiBaseline, AsyncForceGenerator, Axis, AxisLabels, BudgetRange,
    CustomForceDraft, Force, ForceGenerator, ForceId, ForesightReport, GenerationError,
    GenerationOutcome, GenerationRequest, GenerationResponse, ImpactDimension, MatrixStage,
    MemoryStorage, Owner, PestelCategory, PlannerEngine, PlannerSession, PlanningContext,
    Quadrant, RatingField, RiskProfile, ScenarioPatch, SessionStorage, SimulationState, SubStep,
    Timeline, is_last_step_of_phase,
};

pub const FORCE_COUNT: usize = 8;

const FORCE_LIBRARY: &[(&str, PestelCategory)] = &[
    ("Trade bloc realignment", PestelCategory::Political),
    ("Election volatility", PestelCategory::Political),
    ("Interest rate regime", PestelCategory::Economic),
    ("Supply chain regionalization", PestelCategory::Economic),
    ("Ageing workforce", PestelCategory::Social),
    ("Trust in institutions", PestelCategory::Social),
    ("Generative automation", PestelCategory::Technological),
    ("Grid-scale storage", PestelCategory::Technological),
    ("Water scarcity", PestelCategory::Environmental),
    ("Extreme weather frequency", PestelCategory::Environmental),
    ("Data sovereignty rules", PestelCategory::Legal),
    ("Liability for AI decisions", PestelCategory::Legal),
];

const INDUSTRIES: &[&str] = &["Retail", "Logistics", "Healthcare", "Energy", "Banking"];
const ORGANIZATION_TYPES: &[&str] = &["Startup", "SME", "Enterprise", "Public sector"];

/// Deterministic stand-in for the generation service. Ratings it sends back
/// are noise the core must normalize away.
#[derive(Debug, Clone, Copy)]
pub struct SeededGenerator {
    seed: u64,
    count: usize,
}

impl SeededGenerator {
    pub const fn new(seed: u64, count: usize) -> Self {
        Self { seed, count }
    }

    /// Normalized forces for `context`, as the core would store them.
    pub fn forces_for(&self, context: &PlanningContext) -> Result<Vec<Force>, GenerationError> {
        self.respond(&GenerationRequest::from(context)).into_forces()
    }

    fn respond(&self, request: &GenerationRequest) -> GenerationResponse {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut pool = FORCE_LIBRARY.to_vec();
        pool.shuffle(&mut rng);
        let forces = pool
            .into_iter()
            .take(self.count)
            .enumerate()
            .map(|(index, (name, category))| {
                let mut force = Force::new(format!("gen-{index}"), name, category);
                force.description = format!("{} driver for {}", category.label(), request.industry);
                force.impact = rng.gen_range(0..=5);
                force.uncertainty = rng.gen_range(0..=5);
                force.ai_baseline = Some(AiBaseline {
                    impact: rng.gen_range(1..=5),
                    uncertainty: rng.gen_range(1..=5),
                    rationale: None,
                });
                force
            })
            .collect();
        GenerationResponse { forces }
    }
}

impl ForceGenerator for SeededGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        Ok(self.respond(request))
    }
}

#[async_trait::async_trait]
impl AsyncForceGenerator for SeededGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        tokio::task::yield_now().await;
        Ok(self.respond(request))
    }
}

/// Replays scripted failures before delegating to a [`SeededGenerator`].
#[derive(Debug)]
pub struct FlakyGenerator {
    inner: SeededGenerator,
    failures: RefCell<VecDeque<GenerationError>>,
}

impl FlakyGenerator {
    pub fn new(inner: SeededGenerator, failures: Vec<GenerationError>) -> Self {
        Self {
            inner,
            failures: RefCell::new(failures.into()),
        }
    }
}

impl ForceGenerator for FlakyGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        if let Some(failure) = self.failures.borrow_mut().pop_front() {
            return Err(failure);
        }
        ForceGenerator::generate(&self.inner, request)
    }
}

/// Per-iteration inputs shared by every scenario check.
pub struct RunContext {
    pub scenario_key: String,
    pub seed: u64,
    pub rng: ChaCha8Rng,
    pub verbose: bool,
    pub save_dir: Option<PathBuf>,
}

impl RunContext {
    pub fn new(scenario_key: &str, seed: u64, verbose: bool, save_dir: Option<&Path>) -> Self {
        Self {
            scenario_key: scenario_key.to_string(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            verbose,
            save_dir: save_dir.map(Path::to_path_buf),
        }
    }

    pub fn trace(&self, message: &str) {
        if self.verbose {
            println!("   {} {message}", format!("[seed {}]", self.seed).dimmed());
        }
    }

    pub fn score(&mut self) -> u8 {
        self.rng.gen_range(1..=5)
    }
}

pub fn random_context(rng: &mut ChaCha8Rng) -> PlanningContext {
    let industry = INDUSTRIES.choose(rng).copied().unwrap_or("Retail");
    let organization_type = ORGANIZATION_TYPES.choose(rng).copied().unwrap_or("SME");
    PlanningContext {
        industry: industry.to_string(),
        organization_type: organization_type.to_string(),
        modifiers: vec![String::from("international")],
        strategic_question: format!("How should a {organization_type} in {industry} prepare for 2035?"),
    }
}

/// Select every force and give it random ratings.
pub fn select_and_rate_all(state: &mut SimulationState, rng: &mut ChaCha8Rng) {
    let ids: Vec<ForceId> = state.forces().iter().map(|force| force.id.clone()).collect();
    for id in ids {
        state.select_force(&id);
        state.update_force_rating(&id, RatingField::Impact, rng.gen_range(1..=5));
        state.update_force_rating(&id, RatingField::Uncertainty, rng.gen_range(1..=5));
    }
}

/// Pick axes the way a careful user would: the strongest critical
/// uncertainties, falling back to any selected forces.
pub fn choose_axes(state: &mut SimulationState) -> Result<(ForceId, ForceId)> {
    let mut candidates: Vec<ForceId> = state
        .critical_uncertainties()
        .into_iter()
        .map(|force| force.id.clone())
        .collect();
    for id in state.selected_force_ids() {
        if !candidates.contains(id) {
            candidates.push(id.clone());
        }
    }
    ensure!(candidates.len() >= 2, "need two selected forces for the axes");
    let x = candidates[0].clone();
    let y = candidates[1].clone();
    state.set_x_axis(Some(x.clone()));
    state.set_y_axis(Some(y.clone()));
    Ok((x, y))
}

/// Fill labels and quadrant names, walking the embedded wizard stages.
pub fn complete_matrix(state: &mut SimulationState) {
    state.set_matrix_stage(MatrixStage::AxisLabels);
    state.set_axis_labels(Axis::X, AxisLabels::new("Contained", "Accelerating"));
    state.set_axis_labels(Axis::Y, AxisLabels::new("Fragmented", "Coordinated"));
    let mut stage = state.matrix_stage();
    while let Some(next) = stage.next() {
        if next == MatrixStage::Review {
            for (quadrant, name) in Quadrant::ALL.into_iter().zip([
                "Careful coalition",
                "Shared sprint",
                "Quiet drift",
                "Wild frontier",
            ]) {
                state.set_quadrant_name(quadrant, name);
            }
        }
        state.set_matrix_stage(next);
        stage = next;
    }
}

/// A state touching every persisted field, for round-trip checks.
pub fn populated_state(ctx: &mut RunContext) -> Result<SimulationState> {
    let mut state = SimulationState::new();
    state.set_context(random_context(&mut ctx.rng));
    let generated = SeededGenerator::new(ctx.seed, FORCE_COUNT).forces_for(state.context())?;
    state.set_forces(generated);
    state.add_custom_force(CustomForceDraft {
        name: String::from("Local labour shortage"),
        description: String::from("Hiring pressure in key regions"),
        category: PestelCategory::Social,
        impact: ctx.score(),
        uncertainty: ctx.score(),
    });
    select_and_rate_all(&mut state, &mut ctx.rng);
    choose_axes(&mut state)?;
    complete_matrix(&mut state);
    state.finalize_matrix()?;
    state.set_current_step(SubStep::Assessment);
    let scenario_ids: Vec<_> = state.scenarios().iter().map(|s| s.id.clone()).collect();
    for id in &scenario_ids {
        for dimension in ImpactDimension::ALL {
            let value = ctx.score();
            state.update_impact_score(id, dimension, value);
        }
        state.update_scenario(
            id,
            ScenarioPatch {
                narrative: Some(format!("Narrative for {id}")),
                tone: Some(ctx.rng.gen_range(-1.0..=1.0)),
                ..ScenarioPatch::default()
            },
        );
    }
    let appetite = ctx.score();
    let capacity = ctx.score();
    state.set_risk_profile(RiskProfile::new(appetite, capacity));
    for id in &scenario_ids {
        state.accept_suggested_response(id);
        state.add_action_item(ActionDraft {
            scenario_id: id.clone(),
            description: format!("Prepare playbook for {id}"),
            timeline: Timeline::Q2,
            budget_range: BudgetRange::Medium,
            owner: Owner::Director,
            selected: true,
        });
    }
    Ok(state)
}

/// Outcome of one scripted run through the whole workflow.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub steps_visited: usize,
    pub critical_count: usize,
    pub orthogonality: u8,
    pub final_state: SimulationState,
    pub report: ForesightReport,
}

fn advance_to<G, S>(
    engine: &PlannerEngine<G, S>,
    session: &mut PlannerSession,
    slot: &str,
    expected: SubStep,
) -> Result<()>
where
    G: ForceGenerator,
    S: SessionStorage,
{
    let current = session.state().current_step();
    if is_last_step_of_phase(current) {
        session.state_mut().complete_main_phase(current.phase());
    }
    let next = engine.advance(session, slot)?;
    ensure!(
        next == Some(expected),
        "expected to advance from {current} to {expected}, got {next:?}"
    );
    Ok(())
}

/// Drive one session from context to action plan through the engine.
pub fn run_full_workflow(ctx: &mut RunContext) -> Result<WorkflowRun> {
    let engine = PlannerEngine::new(
        SeededGenerator::new(ctx.seed, FORCE_COUNT),
        MemoryStorage::new(),
    );
    let slot = ctx.scenario_key.clone();
    let mut session = engine.create_session(&slot)?;
    let mut steps_visited = 1;

    let context = random_context(&mut ctx.rng);
    ctx.trace(&format!("context: {}", context.strategic_question));
    session.with_state_mut(|state| state.set_context(context));
    ensure!(session.state().context().is_ready(), "context should be ready");

    advance_to(&engine, &mut session, &slot, SubStep::Forces)?;
    steps_visited += 1;
    let outcome = engine.generate_forces(&mut session)?;
    ensure!(
        outcome == GenerationOutcome::Applied { count: FORCE_COUNT },
        "unexpected generation outcome {outcome:?}"
    );
    ensure!(
        session.state().forces().iter().all(|force| !force.is_rated()),
        "generated forces must arrive unrated"
    );
    let custom_impact = ctx.score();
    session.with_state_mut(|state| {
        state.add_custom_force(CustomForceDraft {
            name: String::from("Competitor consolidation"),
            description: String::new(),
            category: PestelCategory::Economic,
            impact: custom_impact,
            uncertainty: 0,
        })
    });

    advance_to(&engine, &mut session, &slot, SubStep::Rating)?;
    steps_visited += 1;
    let rng = &mut ctx.rng;
    session.with_state_mut(|state| select_and_rate_all(state, rng));
    ensure!(
        session.state().selected_forces().iter().all(|f| f.is_rated()),
        "every selected force should be rated"
    );

    advance_to(&engine, &mut session, &slot, SubStep::Uncertainties)?;
    steps_visited += 1;
    let critical: Vec<(u8, u8, u16)> = session
        .state()
        .critical_uncertainties()
        .into_iter()
        .map(|force| (force.impact, force.uncertainty, force.rating_sum()))
        .collect();
    ensure!(
        critical.iter().all(|(impact, uncertainty, _)| *impact >= 3 && *uncertainty >= 3),
        "critical uncertainty below threshold"
    );
    ensure!(
        critical.windows(2).all(|pair| pair[0].2 >= pair[1].2),
        "critical uncertainties not sorted by rating sum"
    );
    ctx.trace(&format!("{} critical uncertainties", critical.len()));

    advance_to(&engine, &mut session, &slot, SubStep::Axes)?;
    steps_visited += 1;
    let (x, y) = choose_axes(session.state_mut())?;
    ensure!(x != y, "axes must differ");
    let orthogonality = session
        .state()
        .orthogonality()
        .ok_or_else(|| anyhow::anyhow!("orthogonality requires both axes"))?;
    ensure!(orthogonality <= 100, "orthogonality out of range");

    advance_to(&engine, &mut session, &slot, SubStep::Matrix)?;
    steps_visited += 1;
    ensure!(
        session.state_mut().finalize_matrix().is_err(),
        "matrix should not finalize without labels"
    );
    complete_matrix(session.state_mut());
    let scenario_count = session.state_mut().finalize_matrix()?.len();
    ensure!(scenario_count == 4, "expected 4 scenarios, got {scenario_count}");

    let scenario_ids: Vec<_> = session
        .state()
        .scenarios()
        .iter()
        .map(|scenario| scenario.id.clone())
        .collect();
    let patches = [
        (SubStep::Narratives, "narrative"),
        (SubStep::Signals, "signal"),
        (SubStep::Capabilities, "capability"),
    ];
    for (step, label) in patches {
        advance_to(&engine, &mut session, &slot, step)?;
        steps_visited += 1;
        for id in &scenario_ids {
            let text = format!("{label} for {id}");
            let patch = match step {
                SubStep::Narratives => ScenarioPatch {
                    narrative: Some(text),
                    tone: Some(ctx.rng.gen_range(-1.0..=1.0)),
                    complexity: Some(ctx.rng.gen_range(1..=3)),
                    ..ScenarioPatch::default()
                },
                SubStep::Signals => ScenarioPatch {
                    early_signals: Some(vec![text]),
                    ..ScenarioPatch::default()
                },
                _ => ScenarioPatch {
                    key_capabilities: Some(vec![text]),
                    ..ScenarioPatch::default()
                },
            };
            ensure!(
                session.state_mut().update_scenario(id, patch),
                "scenario {id} vanished"
            );
        }
    }

    advance_to(&engine, &mut session, &slot, SubStep::Assessment)?;
    steps_visited += 1;
    ensure!(
        session.state().impact_assessments().len() == 4,
        "assessment step should seed default impact records"
    );
    for id in &scenario_ids {
        for dimension in ImpactDimension::ALL {
            let value = ctx.score();
            session.state_mut().update_impact_score(id, dimension, value);
        }
    }

    advance_to(&engine, &mut session, &slot, SubStep::Responses)?;
    steps_visited += 1;
    let profile = RiskProfile::new(ctx.score(), ctx.score());
    session.state_mut().set_risk_profile(profile);
    for id in &scenario_ids {
        let suggested = session.state().suggested_response_for(id);
        let accepted = session.state_mut().accept_suggested_response(id);
        ensure!(
            suggested.is_some() && accepted == suggested,
            "accepted response differs from suggestion for {id}"
        );
    }

    advance_to(&engine, &mut session, &slot, SubStep::ActionPlan)?;
    steps_visited += 1;
    for id in &scenario_ids {
        let drafts = vec![
            ActionDraft {
                scenario_id: id.clone(),
                description: format!("Early-warning dashboard for {id}"),
                timeline: Timeline::Q1,
                budget_range: BudgetRange::Low,
                owner: Owner::Manager,
                selected: false,
            },
            ActionDraft {
                scenario_id: id.clone(),
                description: format!("Contingency budget for {id}"),
                timeline: Timeline::Q3,
                budget_range: BudgetRange::High,
                owner: Owner::CSuite,
                selected: false,
            },
        ];
        let added = session.state_mut().add_action_items(drafts);
        ensure!(added.len() == 2, "action items rejected for {id}");
        if let Some(first) = added.first() {
            session.state_mut().toggle_action_item(first);
        }
    }
    ensure!(
        engine.advance(&mut session, &slot)?.is_none(),
        "action plan should be the last step"
    );

    engine.save_session(&slot, &session)?;
    let restored = engine
        .load_session(&slot)?
        .ok_or_else(|| anyhow::anyhow!("saved session {slot} missing"))?;
    ensure!(
        restored.state() == session.state(),
        "restored session differs from saved one"
    );

    let final_state = session.into_state();
    let report = ForesightReport::from_state(&final_state);
    Ok(WorkflowRun {
        steps_visited,
        critical_count: critical.len(),
        orthogonality,
        final_state,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generator_is_deterministic() {
        let request = GenerationRequest::from(&PlanningContext {
            industry: String::from("Retail"),
            ..PlanningContext::default()
        });
        let first = SeededGenerator::new(7, FORCE_COUNT).respond(&request);
        let second = SeededGenerator::new(7, FORCE_COUNT).respond(&request);
        assert_eq!(first, second);
        assert_eq!(first.forces.len(), FORCE_COUNT);
    }

    #[test]
    fn flaky_generator_replays_failures_first() {
        let generator = FlakyGenerator::new(
            SeededGenerator::new(1, 3),
            vec![GenerationError::Empty],
        );
        let request = GenerationRequest::from(&PlanningContext::default());
        assert_eq!(
            ForceGenerator::generate(&generator, &request),
            Err(GenerationError::Empty)
        );
        assert!(ForceGenerator::generate(&generator, &request).is_ok());
    }

    #[test]
    fn full_workflow_visits_every_step() {
        let mut ctx = RunContext::new("full-workflow", 1337, false, None);
        let run = run_full_workflow(&mut ctx).expect("workflow completes");
        assert_eq!(run.steps_visited, 12);
        assert_eq!(run.report.scenarios.len(), 4);
        assert_eq!(run.final_state.current_step(), SubStep::ActionPlan);
    }

    #[test]
    fn populated_state_covers_persisted_fields() {
        let mut ctx = RunContext::new("persistence-roundtrip", 9, false, None);
        let state = populated_state(&mut ctx).expect("state builds");
        assert!(!state.forces().is_empty());
        assert_eq!(state.scenarios().len(), 4);
        assert_eq!(state.action_items().len(), 4);
    }
}
