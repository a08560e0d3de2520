//! Step/phase graph for the four-phase workflow.
//!
//! The route order is fixed. Every lookup here is pure and total: an unknown
//! step identifier or an edge of the order yields `None`, which callers treat
//! as "stay put" rather than as an error.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Top-level workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MainPhase {
    Discover,
    Design,
    Develop,
    Decide,
}

/// Phases in workflow order.
pub const PHASE_ORDER: [MainPhase; 4] = [
    MainPhase::Discover,
    MainPhase::Design,
    MainPhase::Develop,
    MainPhase::Decide,
];

impl MainPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Design => "design",
            Self::Develop => "develop",
            Self::Decide => "decide",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Discover => "Discover",
            Self::Design => "Design",
            Self::Develop => "Develop",
            Self::Decide => "Decide",
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Discover => 0,
            Self::Design => 1,
            Self::Develop => 2,
            Self::Decide => 3,
        }
    }

    /// The phase after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        PHASE_ORDER.get(self.index() + 1).copied()
    }

    /// The phase before this one, if any.
    #[must_use]
    pub fn prev(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(|idx| PHASE_ORDER.get(idx).copied())
    }

    /// Route-level steps owned by this phase, in order.
    #[must_use]
    pub fn steps(self) -> &'static [SubStep] {
        let start = self.index() * STEPS_PER_PHASE;
        &ROUTE_ORDER[start..start + STEPS_PER_PHASE]
    }
}

impl fmt::Display for MainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MainPhase {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PHASE_ORDER
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| StepParseError::UnknownPhase(s.to_string()))
    }
}

/// Route-level step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubStep {
    Context,
    Forces,
    Rating,
    Uncertainties,
    Axes,
    Matrix,
    Narratives,
    Signals,
    Capabilities,
    Assessment,
    Responses,
    ActionPlan,
}

const STEPS_PER_PHASE: usize = 3;

/// Fixed route order: 12 steps, three per phase.
pub const ROUTE_ORDER: [SubStep; 12] = [
    SubStep::Context,
    SubStep::Forces,
    SubStep::Rating,
    SubStep::Uncertainties,
    SubStep::Axes,
    SubStep::Matrix,
    SubStep::Narratives,
    SubStep::Signals,
    SubStep::Capabilities,
    SubStep::Assessment,
    SubStep::Responses,
    SubStep::ActionPlan,
];

impl SubStep {
    /// First step of a fresh session.
    pub const FIRST: Self = Self::Context;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Forces => "forces",
            Self::Rating => "rating",
            Self::Uncertainties => "uncertainties",
            Self::Axes => "axes",
            Self::Matrix => "matrix",
            Self::Narratives => "narratives",
            Self::Signals => "signals",
            Self::Capabilities => "capabilities",
            Self::Assessment => "assessment",
            Self::Responses => "responses",
            Self::ActionPlan => "action-plan",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Context => "Organization Context",
            Self::Forces => "Driving Forces",
            Self::Rating => "Impact & Uncertainty",
            Self::Uncertainties => "Critical Uncertainties",
            Self::Axes => "Scenario Axes",
            Self::Matrix => "Scenario Matrix",
            Self::Narratives => "Narratives",
            Self::Signals => "Early Signals",
            Self::Capabilities => "Key Capabilities",
            Self::Assessment => "Impact Assessment",
            Self::Responses => "Response Strategy",
            Self::ActionPlan => "Action Plan",
        }
    }

    /// Owning phase.
    #[must_use]
    pub const fn phase(self) -> MainPhase {
        match self {
            Self::Context | Self::Forces | Self::Rating => MainPhase::Discover,
            Self::Uncertainties | Self::Axes | Self::Matrix => MainPhase::Design,
            Self::Narratives | Self::Signals | Self::Capabilities => MainPhase::Develop,
            Self::Assessment | Self::Responses | Self::ActionPlan => MainPhase::Decide,
        }
    }

    fn position(self) -> Option<usize> {
        ROUTE_ORDER.iter().position(|step| *step == self)
    }
}

impl fmt::Display for SubStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubStep {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ROUTE_ORDER
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| StepParseError::UnknownStep(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepParseError {
    #[error("unknown step: {0}")]
    UnknownStep(String),
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
}

/// Stages of the wizard embedded in the matrix step. These never appear in
/// [`ROUTE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixStage {
    #[default]
    AxisLabels,
    QuadrantNames,
    Review,
}

impl MatrixStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AxisLabels => "axis-labels",
            Self::QuadrantNames => "quadrant-names",
            Self::Review => "review",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::AxisLabels => Some(Self::QuadrantNames),
            Self::QuadrantNames => Some(Self::Review),
            Self::Review => None,
        }
    }

    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        match self {
            Self::AxisLabels => None,
            Self::QuadrantNames => Some(Self::AxisLabels),
            Self::Review => Some(Self::QuadrantNames),
        }
    }
}

/// Step following `current` in route order.
#[must_use]
pub fn next_step(current: SubStep) -> Option<SubStep> {
    current
        .position()
        .and_then(|idx| ROUTE_ORDER.get(idx + 1).copied())
}

/// Step preceding `current` in route order.
#[must_use]
pub fn prev_step(current: SubStep) -> Option<SubStep> {
    current
        .position()
        .and_then(|idx| idx.checked_sub(1))
        .and_then(|idx| ROUTE_ORDER.get(idx).copied())
}

/// [`next_step`] keyed by identifier; unknown identifiers yield `None`.
#[must_use]
pub fn next_step_id(current: &str) -> Option<SubStep> {
    current.parse().ok().and_then(next_step)
}

/// [`prev_step`] keyed by identifier; unknown identifiers yield `None`.
#[must_use]
pub fn prev_step_id(current: &str) -> Option<SubStep> {
    current.parse().ok().and_then(prev_step)
}

#[must_use]
pub fn is_last_step_of_phase(step: SubStep) -> bool {
    step.phase().steps().last() == Some(&step)
}

#[must_use]
pub fn is_first_step_of_phase(step: SubStep) -> bool {
    step.phase().steps().first() == Some(&step)
}

/// Completed phases hold at most four entries.
pub type CompletedPhases = SmallVec<[MainPhase; 4]>;

/// Where a session currently is in the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub main_phase: MainPhase,
    pub sub_step: SubStep,
    #[serde(default)]
    pub completed_phases: CompletedPhases,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            main_phase: SubStep::FIRST.phase(),
            sub_step: SubStep::FIRST,
            completed_phases: CompletedPhases::new(),
        }
    }
}

impl Progress {
    #[must_use]
    pub fn is_completed(&self, phase: MainPhase) -> bool {
        self.completed_phases.contains(&phase)
    }

    /// Move to `step`; the phase always follows the step.
    pub fn set_step(&mut self, step: SubStep) {
        self.sub_step = step;
        self.main_phase = step.phase();
    }

    /// Record `phase` as completed. Returns false when it already was.
    pub fn complete(&mut self, phase: MainPhase) -> bool {
        if self.is_completed(phase) {
            return false;
        }
        self.completed_phases.push(phase);
        true
    }
}

/// Navigation guard. The host must consult this before any jump.
#[must_use]
pub fn can_navigate_to(step: SubStep, progress: &Progress) -> bool {
    let target = step.phase();
    if progress.is_completed(target) || target == progress.main_phase {
        return true;
    }
    progress.main_phase.next() == Some(target) && progress.is_completed(progress.main_phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_and_prev_walk_the_route_order() {
        for pair in ROUTE_ORDER.windows(2) {
            assert_eq!(next_step(pair[0]), Some(pair[1]));
            assert_eq!(prev_step(pair[1]), Some(pair[0]));
        }
        assert_eq!(next_step(SubStep::ActionPlan), None);
        assert_eq!(prev_step(SubStep::Context), None);
    }

    #[test]
    fn unknown_identifiers_stay_put() {
        assert_eq!(next_step_id("quadrant-names"), None);
        assert_eq!(prev_step_id("quadrant-names"), None);
        assert_eq!(next_step_id(""), None);
        assert_eq!(next_step_id("forces"), Some(SubStep::Rating));
        assert_eq!(prev_step_id("forces"), Some(SubStep::Context));
    }

    #[test]
    fn identifiers_roundtrip() {
        for step in ROUTE_ORDER {
            assert_eq!(step.as_str().parse::<SubStep>(), Ok(step));
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
        assert_eq!(
            "bogus".parse::<SubStep>(),
            Err(StepParseError::UnknownStep(String::from("bogus")))
        );
    }

    #[test]
    fn phase_boundaries() {
        assert!(is_first_step_of_phase(SubStep::Uncertainties));
        assert!(is_last_step_of_phase(SubStep::Matrix));
        assert!(!is_last_step_of_phase(SubStep::Axes));
        assert!(!is_first_step_of_phase(SubStep::Axes));
        for phase in PHASE_ORDER {
            assert_eq!(phase.steps().len(), 3);
            assert!(phase.steps().iter().all(|step| step.phase() == phase));
        }
    }

    #[test]
    fn phase_order_links() {
        assert_eq!(MainPhase::Discover.next(), Some(MainPhase::Design));
        assert_eq!(MainPhase::Decide.next(), None);
        assert_eq!(MainPhase::Discover.prev(), None);
        assert_eq!(MainPhase::Develop.prev(), Some(MainPhase::Design));
    }

    #[test]
    fn matrix_stages_are_internal() {
        assert_eq!(
            MatrixStage::AxisLabels.next(),
            Some(MatrixStage::QuadrantNames)
        );
        assert_eq!(MatrixStage::Review.next(), None);
        assert_eq!(MatrixStage::AxisLabels.prev(), None);
        for stage in [
            MatrixStage::AxisLabels,
            MatrixStage::QuadrantNames,
            MatrixStage::Review,
        ] {
            assert!(stage.as_str().parse::<SubStep>().is_err());
        }
    }

    #[test]
    fn completion_is_idempotent() {
        let mut progress = Progress::default();
        assert!(progress.complete(MainPhase::Discover));
        assert!(!progress.complete(MainPhase::Discover));
        assert_eq!(progress.completed_phases.as_slice(), &[MainPhase::Discover]);
    }

    #[test]
    fn navigation_guard_rules() {
        let mut progress = Progress::default();
        assert!(can_navigate_to(SubStep::Rating, &progress));
        assert!(!can_navigate_to(SubStep::Axes, &progress));
        assert!(!can_navigate_to(SubStep::Assessment, &progress));

        progress.complete(MainPhase::Discover);
        assert!(can_navigate_to(SubStep::Axes, &progress));
        assert!(!can_navigate_to(SubStep::Narratives, &progress));

        progress.set_step(SubStep::Uncertainties);
        assert_eq!(progress.main_phase, MainPhase::Design);
        assert!(can_navigate_to(SubStep::Context, &progress));
        assert!(can_navigate_to(SubStep::Matrix, &progress));
        assert!(!can_navigate_to(SubStep::Narratives, &progress));
    }
}
