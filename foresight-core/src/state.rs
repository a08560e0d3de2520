//! Session state store.
//!
//! [`SimulationState`] is the single source of truth for one planning
//! session. Each `&mut self` method is one consistent transition; unknown ids
//! are ignored and reported through the return value rather than as errors.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::mem;
use thiserror::Error;

use crate::model::{
    ActionDraft, ActionItem, ActionItemId, ActionPatch, Axis, AxisLabels, CustomForceDraft, Force,
    ForceId, ImpactDimension, ImpactScores, PlanningContext, Quadrant, QuadrantNames,
    RatingField, ResponseType, RiskProfile, Scenario, ScenarioId, ScenarioPatch, clamp_rating,
};
use crate::scoring::{critical_uncertainties, orthogonality_score, suggested_response};
use crate::steps::{
    MainPhase, MatrixStage, Progress, SubStep, can_navigate_to, next_step, prev_step,
};

const CUSTOM_FORCE_PREFIX: &str = "custom";
const ACTION_ITEM_PREFIX: &str = "action";
const SCENARIO_PREFIX: &str = "scenario";

/// Why a bulk scenario replacement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioSetError {
    #[error("expected exactly 4 scenarios, got {0}")]
    WrongCount(usize),
    #[error("quadrant {0} appears more than once")]
    DuplicateQuadrant(Quadrant),
    #[error("scenario id {0} appears more than once")]
    DuplicateId(ScenarioId),
}

/// Why the matrix cannot be finalized yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("no force assigned to the {0:?} axis")]
    MissingAxis(Axis),
    #[error("the {0:?} axis needs both low and high labels")]
    IncompleteLabels(Axis),
    #[error("quadrant {0} has no name")]
    UnnamedQuadrant(Quadrant),
    #[error(transparent)]
    Scenarios(#[from] ScenarioSetError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    #[serde(default)]
    progress: Progress,
    #[serde(default)]
    context: PlanningContext,
    #[serde(default)]
    forces: Vec<Force>,
    #[serde(default)]
    selected_force_ids: Vec<ForceId>,
    #[serde(default)]
    x_axis: Option<ForceId>,
    #[serde(default)]
    y_axis: Option<ForceId>,
    #[serde(default)]
    x_axis_labels: AxisLabels,
    #[serde(default)]
    y_axis_labels: AxisLabels,
    #[serde(default)]
    quadrant_names: QuadrantNames,
    #[serde(default)]
    matrix_stage: MatrixStage,
    #[serde(default)]
    scenarios: Vec<Scenario>,
    #[serde(default)]
    impact_assessments: BTreeMap<ScenarioId, ImpactScores>,
    #[serde(default)]
    risk_profile: RiskProfile,
    #[serde(default)]
    response_assignments: BTreeMap<ScenarioId, ResponseType>,
    #[serde(default)]
    action_items: Vec<ActionItem>,
    /// Monotonic counter backing freshly minted ids.
    #[serde(default)]
    id_counter: u64,
}

impl SimulationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn progress(&self) -> &Progress {
        &self.progress
    }

    #[must_use]
    pub const fn current_step(&self) -> SubStep {
        self.progress.sub_step
    }

    #[must_use]
    pub const fn current_phase(&self) -> MainPhase {
        self.progress.main_phase
    }

    #[must_use]
    pub const fn context(&self) -> &PlanningContext {
        &self.context
    }

    #[must_use]
    pub fn forces(&self) -> &[Force] {
        &self.forces
    }

    #[must_use]
    pub fn force(&self, id: &ForceId) -> Option<&Force> {
        self.forces.iter().find(|force| &force.id == id)
    }

    #[must_use]
    pub fn selected_force_ids(&self) -> &[ForceId] {
        &self.selected_force_ids
    }

    #[must_use]
    pub fn is_selected(&self, id: &ForceId) -> bool {
        self.selected_force_ids.contains(id)
    }

    /// Selected forces in selection order.
    #[must_use]
    pub fn selected_forces(&self) -> Vec<&Force> {
        self.selected_force_ids
            .iter()
            .filter_map(|id| self.force(id))
            .collect()
    }

    /// Critical uncertainties among the selected forces.
    #[must_use]
    pub fn critical_uncertainties(&self) -> Vec<&Force> {
        critical_uncertainties(self.selected_forces())
    }

    #[must_use]
    pub const fn axis_id(&self, axis: Axis) -> Option<&ForceId> {
        match axis {
            Axis::X => self.x_axis.as_ref(),
            Axis::Y => self.y_axis.as_ref(),
        }
    }

    #[must_use]
    pub fn x_axis(&self) -> Option<&Force> {
        self.x_axis.as_ref().and_then(|id| self.force(id))
    }

    #[must_use]
    pub fn y_axis(&self) -> Option<&Force> {
        self.y_axis.as_ref().and_then(|id| self.force(id))
    }

    /// Orthogonality of the chosen axes; `None` until both are set.
    #[must_use]
    pub fn orthogonality(&self) -> Option<u8> {
        match (self.x_axis(), self.y_axis()) {
            (Some(x), Some(y)) => Some(orthogonality_score(x, y)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn axis_labels(&self, axis: Axis) -> &AxisLabels {
        match axis {
            Axis::X => &self.x_axis_labels,
            Axis::Y => &self.y_axis_labels,
        }
    }

    #[must_use]
    pub const fn quadrant_names(&self) -> &QuadrantNames {
        &self.quadrant_names
    }

    #[must_use]
    pub const fn matrix_stage(&self) -> MatrixStage {
        self.matrix_stage
    }

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    #[must_use]
    pub fn scenario(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| &scenario.id == id)
    }

    #[must_use]
    pub fn scenario_for(&self, quadrant: Quadrant) -> Option<&Scenario> {
        self.scenarios
            .iter()
            .find(|scenario| scenario.quadrant == quadrant)
    }

    #[must_use]
    pub fn impact_scores(&self, id: &ScenarioId) -> Option<&ImpactScores> {
        self.impact_assessments.get(id)
    }

    #[must_use]
    pub const fn impact_assessments(&self) -> &BTreeMap<ScenarioId, ImpactScores> {
        &self.impact_assessments
    }

    #[must_use]
    pub const fn risk_profile(&self) -> &RiskProfile {
        &self.risk_profile
    }

    #[must_use]
    pub fn response_for(&self, id: &ScenarioId) -> Option<ResponseType> {
        self.response_assignments.get(id).copied()
    }

    #[must_use]
    pub const fn response_assignments(&self) -> &BTreeMap<ScenarioId, ResponseType> {
        &self.response_assignments
    }

    /// Advisory bucket for a scenario, using default scores until assessed.
    #[must_use]
    pub fn suggested_response_for(&self, id: &ScenarioId) -> Option<ResponseType> {
        self.scenario(id)?;
        let scores = self.impact_scores(id).copied().unwrap_or_default();
        Some(suggested_response(&scores, &self.risk_profile))
    }

    #[must_use]
    pub fn action_items(&self) -> &[ActionItem] {
        &self.action_items
    }

    pub fn action_items_for<'a>(
        &'a self,
        scenario_id: &'a ScenarioId,
    ) -> impl Iterator<Item = &'a ActionItem> + 'a {
        self.action_items
            .iter()
            .filter(move |item| &item.scenario_id == scenario_id)
    }

    /// Move to `step`. The main phase is always derived from the step, and
    /// entering the assessment step seeds default impact records.
    pub fn set_current_step(&mut self, step: SubStep) {
        log::debug!("step {} -> {}", self.progress.sub_step, step);
        self.progress.set_step(step);
        if step == SubStep::Assessment {
            self.ensure_impact_defaults();
        }
    }

    /// Mark a phase completed; idempotent.
    pub fn complete_main_phase(&mut self, phase: MainPhase) -> bool {
        self.progress.complete(phase)
    }

    /// Advance in route order. Returns the new step, or `None` when already
    /// at the end.
    pub fn go_to_next_step(&mut self) -> Option<SubStep> {
        let next = next_step(self.progress.sub_step)?;
        self.set_current_step(next);
        Some(next)
    }

    /// Step back in route order. Returns the new step, or `None` when already
    /// at the start.
    pub fn go_to_prev_step(&mut self) -> Option<SubStep> {
        let prev = prev_step(self.progress.sub_step)?;
        self.set_current_step(prev);
        Some(prev)
    }

    /// Jump to `step` if the navigation guard allows it.
    pub fn navigate_to(&mut self, step: SubStep) -> bool {
        if !can_navigate_to(step, &self.progress) {
            log::debug!("navigation to {step} denied from {}", self.progress.sub_step);
            return false;
        }
        self.set_current_step(step);
        true
    }

    pub fn set_context(&mut self, context: PlanningContext) {
        self.context = context;
    }

    /// Replace the master force list. Selections and axes that still point
    /// at a force in `forces` survive; the rest are dropped.
    pub fn set_forces(&mut self, forces: Vec<Force>) {
        let ids: HashSet<&ForceId> = forces.iter().map(|force| &force.id).collect();
        self.selected_force_ids.retain(|id| ids.contains(id));
        if self.x_axis.as_ref().is_some_and(|id| !ids.contains(id)) {
            self.x_axis = None;
        }
        if self.y_axis.as_ref().is_some_and(|id| !ids.contains(id)) {
            self.y_axis = None;
        }
        self.forces = forces;
    }

    /// Set one rating of one force. Returns false for unknown ids.
    pub fn update_force_rating(&mut self, id: &ForceId, field: RatingField, value: u8) -> bool {
        if let Some(force) = self.forces.iter_mut().find(|force| &force.id == id) {
            force.set_rating(field, value);
            true
        } else {
            log::debug!("rating update ignored for unknown force {id}");
            false
        }
    }

    /// Append a user-authored force with a fresh id.
    pub fn add_custom_force(&mut self, draft: CustomForceDraft) -> ForceId {
        let id = loop {
            let candidate = ForceId::new(self.mint_id(CUSTOM_FORCE_PREFIX));
            if self.force(&candidate).is_none() {
                break candidate;
            }
        };
        self.forces.push(Force {
            id: id.clone(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            impact: clamp_rating(draft.impact),
            uncertainty: clamp_rating(draft.uncertainty),
            is_custom: true,
            ai_baseline: None,
        });
        id
    }

    /// Add a known force to the selected subset.
    pub fn select_force(&mut self, id: &ForceId) -> bool {
        if self.force(id).is_none() || self.is_selected(id) {
            return false;
        }
        self.selected_force_ids.push(id.clone());
        true
    }

    /// Remove a force from the selected subset and from any axis it holds.
    /// The force stays in the master list.
    pub fn deselect_force(&mut self, id: &ForceId) -> bool {
        let before = self.selected_force_ids.len();
        self.selected_force_ids.retain(|selected| selected != id);
        self.clear_axis_references(id);
        before != self.selected_force_ids.len()
    }

    /// Delete a force from the master list entirely.
    pub fn remove_force(&mut self, id: &ForceId) -> bool {
        let before = self.forces.len();
        self.forces.retain(|force| &force.id != id);
        if before == self.forces.len() {
            return false;
        }
        self.deselect_force(id);
        true
    }

    fn clear_axis_references(&mut self, id: &ForceId) {
        if self.x_axis.as_ref() == Some(id) {
            self.x_axis = None;
        }
        if self.y_axis.as_ref() == Some(id) {
            self.y_axis = None;
        }
    }

    pub fn set_x_axis(&mut self, force: Option<ForceId>) -> bool {
        self.set_axis(Axis::X, force)
    }

    pub fn set_y_axis(&mut self, force: Option<ForceId>) -> bool {
        self.set_axis(Axis::Y, force)
    }

    /// Assign or clear an axis. Only selected forces can hold an axis, and a
    /// force never holds both: assigning the force already on the other axis
    /// clears that axis. Unknown or unselected ids are ignored.
    pub fn set_axis(&mut self, axis: Axis, force: Option<ForceId>) -> bool {
        if let Some(id) = force.as_ref() {
            if self.force(id).is_none() || !self.is_selected(id) {
                log::debug!("axis assignment ignored for unselected force {id}");
                return false;
            }
            if self.axis_id(axis.other()) == Some(id) {
                self.axis_slot(axis.other()).take();
            }
        }
        *self.axis_slot(axis) = force;
        true
    }

    fn axis_slot(&mut self, axis: Axis) -> &mut Option<ForceId> {
        match axis {
            Axis::X => &mut self.x_axis,
            Axis::Y => &mut self.y_axis,
        }
    }

    pub fn set_axis_labels(&mut self, axis: Axis, labels: AxisLabels) {
        match axis {
            Axis::X => self.x_axis_labels = labels,
            Axis::Y => self.y_axis_labels = labels,
        }
    }

    pub fn set_quadrant_name(&mut self, quadrant: Quadrant, name: impl Into<String>) {
        self.quadrant_names.set(quadrant, name);
    }

    pub fn set_matrix_stage(&mut self, stage: MatrixStage) {
        self.matrix_stage = stage;
    }

    /// First reason the matrix is not complete, if any.
    fn matrix_gap(&self) -> Option<MatrixError> {
        for axis in [Axis::X, Axis::Y] {
            let assigned = match axis {
                Axis::X => self.x_axis(),
                Axis::Y => self.y_axis(),
            };
            if assigned.is_none() {
                return Some(MatrixError::MissingAxis(axis));
            }
            if !self.axis_labels(axis).is_complete() {
                return Some(MatrixError::IncompleteLabels(axis));
            }
        }
        Quadrant::ALL
            .into_iter()
            .find(|quadrant| self.quadrant_names.get(*quadrant).trim().is_empty())
            .map(MatrixError::UnnamedQuadrant)
    }

    /// Both axes, both label pairs and all four quadrant names are present.
    #[must_use]
    pub fn matrix_complete(&self) -> bool {
        self.matrix_gap().is_none()
    }

    /// Create the four scenarios from the completed matrix, all at once.
    /// Once scenarios exist they are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece of the matrix.
    pub fn finalize_matrix(&mut self) -> Result<&[Scenario], MatrixError> {
        if !self.scenarios.is_empty() {
            return Ok(&self.scenarios);
        }
        if let Some(gap) = self.matrix_gap() {
            return Err(gap);
        }
        let scenarios = Quadrant::ALL
            .into_iter()
            .map(|quadrant| {
                let id = format!("{SCENARIO_PREFIX}-{}", quadrant.code().to_ascii_lowercase());
                Scenario::new(id, quadrant, self.quadrant_names.get(quadrant).trim())
            })
            .collect();
        self.set_scenarios(scenarios)?;
        Ok(&self.scenarios)
    }

    /// Replace all scenarios with exactly one per quadrant. Records keyed by
    /// scenarios that no longer exist are dropped. Malformed input leaves the
    /// state untouched.
    ///
    /// # Errors
    ///
    /// Returns an error unless `scenarios` holds four entries with distinct
    /// quadrants and ids.
    pub fn set_scenarios(&mut self, mut scenarios: Vec<Scenario>) -> Result<(), ScenarioSetError> {
        if scenarios.len() != Quadrant::ALL.len() {
            return Err(ScenarioSetError::WrongCount(scenarios.len()));
        }
        let mut quadrants = HashSet::new();
        let mut ids = HashSet::new();
        for scenario in &scenarios {
            if !quadrants.insert(scenario.quadrant) {
                return Err(ScenarioSetError::DuplicateQuadrant(scenario.quadrant));
            }
            if !ids.insert(scenario.id.clone()) {
                return Err(ScenarioSetError::DuplicateId(scenario.id.clone()));
            }
        }
        scenarios.sort_by_key(|scenario| scenario.quadrant.index());
        self.impact_assessments.retain(|id, _| ids.contains(id));
        self.response_assignments.retain(|id, _| ids.contains(id));
        self.action_items
            .retain(|item| ids.contains(&item.scenario_id));
        self.scenarios = scenarios;
        Ok(())
    }

    /// Merge `patch` into one scenario. Returns false for unknown ids.
    pub fn update_scenario(&mut self, id: &ScenarioId, patch: ScenarioPatch) -> bool {
        if let Some(scenario) = self.scenarios.iter_mut().find(|scenario| &scenario.id == id) {
            scenario.apply(patch);
            true
        } else {
            log::debug!("scenario update ignored for unknown scenario {id}");
            false
        }
    }

    /// Create a default record for every scenario lacking one.
    pub fn ensure_impact_defaults(&mut self) -> usize {
        let mut created = 0;
        for scenario in &self.scenarios {
            if !self.impact_assessments.contains_key(&scenario.id) {
                self.impact_assessments
                    .insert(scenario.id.clone(), ImpactScores::default());
                created += 1;
            }
        }
        created
    }

    /// Replace all four dimensions for one scenario.
    pub fn set_impact_assessment(&mut self, id: &ScenarioId, scores: ImpactScores) -> bool {
        if self.scenario(id).is_none() {
            log::debug!("assessment ignored for unknown scenario {id}");
            return false;
        }
        let scores = ImpactScores::new(
            scores.probability,
            scores.repercussion,
            scores.urgency,
            scores.strategic_disruption,
        );
        self.impact_assessments.insert(id.clone(), scores);
        true
    }

    /// Set one dimension, seeding a default record first when none exists.
    pub fn update_impact_score(
        &mut self,
        id: &ScenarioId,
        dimension: ImpactDimension,
        value: u8,
    ) -> bool {
        if self.scenario(id).is_none() {
            log::debug!("impact score ignored for unknown scenario {id}");
            return false;
        }
        self.impact_assessments
            .entry(id.clone())
            .or_default()
            .set(dimension, value);
        true
    }

    pub fn set_risk_profile(&mut self, profile: RiskProfile) {
        self.risk_profile = RiskProfile::new(profile.appetite, profile.capacity);
    }

    pub fn assign_response(&mut self, id: &ScenarioId, response: ResponseType) -> bool {
        if self.scenario(id).is_none() {
            log::debug!("response ignored for unknown scenario {id}");
            return false;
        }
        self.response_assignments.insert(id.clone(), response);
        true
    }

    pub fn clear_response(&mut self, id: &ScenarioId) -> Option<ResponseType> {
        self.response_assignments.remove(id)
    }

    /// Explicitly accept the advisory bucket as the assignment.
    pub fn accept_suggested_response(&mut self, id: &ScenarioId) -> Option<ResponseType> {
        let suggestion = self.suggested_response_for(id)?;
        self.response_assignments.insert(id.clone(), suggestion);
        Some(suggestion)
    }

    /// Add one action item. Returns `None` when the scenario is unknown.
    pub fn add_action_item(&mut self, draft: ActionDraft) -> Option<ActionItemId> {
        if self.scenario(&draft.scenario_id).is_none() {
            log::debug!(
                "action item ignored for unknown scenario {}",
                draft.scenario_id
            );
            return None;
        }
        let id = loop {
            let candidate = ActionItemId::new(self.mint_id(ACTION_ITEM_PREFIX));
            if self.action_items.iter().all(|item| item.id != candidate) {
                break candidate;
            }
        };
        self.action_items.push(ActionItem {
            id: id.clone(),
            scenario_id: draft.scenario_id,
            description: draft.description,
            timeline: draft.timeline,
            budget_range: draft.budget_range,
            owner: draft.owner,
            selected: draft.selected,
        });
        Some(id)
    }

    /// Bulk insertion of suggested actions; drafts for unknown scenarios are skipped.
    pub fn add_action_items(&mut self, drafts: Vec<ActionDraft>) -> Vec<ActionItemId> {
        drafts
            .into_iter()
            .filter_map(|draft| self.add_action_item(draft))
            .collect()
    }

    pub fn update_action_item(&mut self, id: &ActionItemId, patch: ActionPatch) -> bool {
        if let Some(item) = self.action_items.iter_mut().find(|item| &item.id == id) {
            item.apply(patch);
            true
        } else {
            false
        }
    }

    /// Flip the `selected` flag, returning the new value.
    pub fn toggle_action_item(&mut self, id: &ActionItemId) -> Option<bool> {
        let item = self.action_items.iter_mut().find(|item| &item.id == id)?;
        item.selected = !item.selected;
        Some(item.selected)
    }

    pub fn remove_action_item(&mut self, id: &ActionItemId) -> bool {
        let before = self.action_items.len();
        self.action_items.retain(|item| &item.id != id);
        before != self.action_items.len()
    }

    /// Restore every field to its default in one assignment.
    pub fn reset_simulation(&mut self) {
        *self = Self::default();
    }

    /// Re-establish the store's invariants on a decoded state. Derived
    /// fields are recomputed, out-of-range values clamped and references to
    /// missing or unselected entries dropped.
    pub fn normalize(&mut self) {
        self.progress.set_step(self.progress.sub_step);
        for phase in mem::take(&mut self.progress.completed_phases) {
            self.progress.complete(phase);
        }

        let mut force_ids = HashSet::new();
        self.forces.retain(|force| force_ids.insert(force.id.clone()));
        for force in &mut self.forces {
            force.impact = clamp_rating(force.impact);
            force.uncertainty = clamp_rating(force.uncertainty);
            if let Some(baseline) = force.ai_baseline.as_mut() {
                baseline.impact = clamp_rating(baseline.impact);
                baseline.uncertainty = clamp_rating(baseline.uncertainty);
            }
        }
        let mut selected = HashSet::new();
        self.selected_force_ids
            .retain(|id| force_ids.contains(id) && selected.insert(id.clone()));
        if self.x_axis.as_ref().is_some_and(|id| !selected.contains(id)) {
            self.x_axis = None;
        }
        if self.y_axis.as_ref().is_some_and(|id| !selected.contains(id)) {
            self.y_axis = None;
        }
        if self.x_axis.is_some() && self.x_axis == self.y_axis {
            log::warn!("force {:?} held both axes; clearing the y axis", self.x_axis);
            self.y_axis = None;
        }

        let scenarios = mem::take(&mut self.scenarios);
        if !scenarios.is_empty()
            && let Err(err) = self.set_scenarios(scenarios)
        {
            log::warn!("dropping invalid scenario set: {err}");
        }
        let scenario_ids: HashSet<&ScenarioId> =
            self.scenarios.iter().map(|scenario| &scenario.id).collect();
        self.impact_assessments
            .retain(|id, _| scenario_ids.contains(id));
        self.response_assignments
            .retain(|id, _| scenario_ids.contains(id));
        self.action_items
            .retain(|item| scenario_ids.contains(&item.scenario_id));
        for scores in self.impact_assessments.values_mut() {
            *scores = ImpactScores::new(
                scores.probability,
                scores.repercussion,
                scores.urgency,
                scores.strategic_disruption,
            );
        }
        self.risk_profile = RiskProfile::new(self.risk_profile.appetite, self.risk_profile.capacity);
    }

    fn mint_id(&mut self, prefix: &str) -> String {
        self.id_counter = self.id_counter.wrapping_add(1);
        format!("{prefix}-{}", self.id_counter)
    }
}
