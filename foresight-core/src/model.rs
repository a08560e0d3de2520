//! Domain entities for a planning session.
//!
//! These are plain data shapes. Rating ranges are enforced by the
//! constructors and setters here; everything else lives in the store.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound for every 1..5 or 0..5 rating scale.
pub const RATING_MAX: u8 = 5;
/// Lowest genuine rating; zero is reserved for "not yet rated".
pub const RATING_MIN_RATED: u8 = 1;
/// Default value for every assessment dimension and the risk profile.
pub const DEFAULT_SCORE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelParseError {
    #[error("unknown PESTEL category: {0}")]
    UnknownCategory(String),
    #[error("unknown response type: {0}")]
    UnknownResponse(String),
}
/// Default scenario time horizon in years.
pub const DEFAULT_TIME_HORIZON: u8 = 10;

/// Clamp a force rating into `0..=5`.
#[must_use]
pub fn clamp_rating(value: u8) -> u8 {
    value.min(RATING_MAX)
}

/// Clamp an assessment or risk score into `1..=5`.
#[must_use]
pub fn clamp_score(value: u8) -> u8 {
    value.clamp(RATING_MIN_RATED, RATING_MAX)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a driving force.
    ForceId
);
string_id!(
    /// Identifier of one of the four matrix scenarios.
    ScenarioId
);
string_id!(
    /// Identifier of an action plan entry.
    ActionItemId
);

/// PESTEL category of a driving force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PestelCategory {
    #[serde(rename = "P")]
    Political,
    #[serde(rename = "E")]
    Economic,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "T")]
    Technological,
    #[serde(rename = "En")]
    Environmental,
    #[serde(rename = "L")]
    Legal,
}

impl PestelCategory {
    pub const ALL: [Self; 6] = [
        Self::Political,
        Self::Economic,
        Self::Social,
        Self::Technological,
        Self::Environmental,
        Self::Legal,
    ];

    /// Short code used on the wire.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Political => "P",
            Self::Economic => "E",
            Self::Social => "S",
            Self::Technological => "T",
            Self::Environmental => "En",
            Self::Legal => "L",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Political => "Political",
            Self::Economic => "Economic",
            Self::Social => "Social",
            Self::Technological => "Technological",
            Self::Environmental => "Environmental",
            Self::Legal => "Legal",
        }
    }
}

impl fmt::Display for PestelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PestelCategory {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cat| cat.code() == s || cat.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelParseError::UnknownCategory(s.to_string()))
    }
}

/// Which of the two force ratings a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingField {
    Impact,
    Uncertainty,
}

/// Baseline ratings proposed by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBaseline {
    pub impact: u8,
    pub uncertainty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// A PESTEL driving-force candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Force {
    pub id: ForceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: PestelCategory,
    /// 0 means unrated.
    #[serde(default)]
    pub impact: u8,
    /// 0 means unrated.
    #[serde(default)]
    pub uncertainty: u8,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_baseline: Option<AiBaseline>,
}

impl Force {
    /// Construct an unrated, generated force.
    #[must_use]
    pub fn new(
        id: impl Into<ForceId>,
        name: impl Into<String>,
        category: PestelCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            impact: 0,
            uncertainty: 0,
            is_custom: false,
            ai_baseline: None,
        }
    }

    /// Builder-style helper setting both ratings (clamped).
    #[must_use]
    pub fn rated(mut self, impact: u8, uncertainty: u8) -> Self {
        self.impact = clamp_rating(impact);
        self.uncertainty = clamp_rating(uncertainty);
        self
    }

    #[must_use]
    pub const fn rating(&self, field: RatingField) -> u8 {
        match field {
            RatingField::Impact => self.impact,
            RatingField::Uncertainty => self.uncertainty,
        }
    }

    pub fn set_rating(&mut self, field: RatingField, value: u8) {
        let value = clamp_rating(value);
        match field {
            RatingField::Impact => self.impact = value,
            RatingField::Uncertainty => self.uncertainty = value,
        }
    }

    /// Both ratings have been given a genuine value.
    #[must_use]
    pub const fn is_rated(&self) -> bool {
        self.impact > 0 && self.uncertainty > 0
    }

    #[must_use]
    pub fn rating_sum(&self) -> u16 {
        u16::from(self.impact) + u16::from(self.uncertainty)
    }
}

/// User input for a custom force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomForceDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: PestelCategory,
    #[serde(default)]
    pub impact: u8,
    #[serde(default)]
    pub uncertainty: u8,
}

/// Which end of an axis a quadrant sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPole {
    Low,
    High,
}

/// The two matrix axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

/// Free-text labels for both ends of one axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLabels {
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub high: String,
}

impl AxisLabels {
    #[must_use]
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// Both ends carry visible text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.low.trim().is_empty() && !self.high.trim().is_empty()
    }

    #[must_use]
    pub fn for_pole(&self, pole: AxisPole) -> &str {
        match pole {
            AxisPole::Low => &self.low,
            AxisPole::High => &self.high,
        }
    }
}

/// One cell of the 2x2 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Low X, high Y.
    #[serde(rename = "TL")]
    TopLeft,
    /// High X, high Y.
    #[serde(rename = "TR")]
    TopRight,
    /// Low X, low Y.
    #[serde(rename = "BL")]
    BottomLeft,
    /// High X, low Y.
    #[serde(rename = "BR")]
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TopLeft => "TL",
            Self::TopRight => "TR",
            Self::BottomLeft => "BL",
            Self::BottomRight => "BR",
        }
    }

    #[must_use]
    pub const fn x_pole(self) -> AxisPole {
        match self {
            Self::TopLeft | Self::BottomLeft => AxisPole::Low,
            Self::TopRight | Self::BottomRight => AxisPole::High,
        }
    }

    #[must_use]
    pub const fn y_pole(self) -> AxisPole {
        match self {
            Self::TopLeft | Self::TopRight => AxisPole::High,
            Self::BottomLeft | Self::BottomRight => AxisPole::Low,
        }
    }

    #[must_use]
    pub const fn from_poles(x: AxisPole, y: AxisPole) -> Self {
        match (x, y) {
            (AxisPole::Low, AxisPole::High) => Self::TopLeft,
            (AxisPole::High, AxisPole::High) => Self::TopRight,
            (AxisPole::Low, AxisPole::Low) => Self::BottomLeft,
            (AxisPole::High, AxisPole::Low) => Self::BottomRight,
        }
    }

    /// Position in [`Quadrant::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomLeft => 2,
            Self::BottomRight => 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Names typed into each quadrant before the matrix is finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantNames(pub [String; 4]);

impl QuadrantNames {
    #[must_use]
    pub fn get(&self, quadrant: Quadrant) -> &str {
        &self.0[quadrant.index()]
    }

    pub fn set(&mut self, quadrant: Quadrant, name: impl Into<String>) {
        self.0[quadrant.index()] = name.into();
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|name| !name.trim().is_empty())
    }
}

/// One of the four quadrant outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub quadrant: Quadrant,
    #[serde(default)]
    pub narrative: String,
    /// Years.
    pub time_horizon: u8,
    /// -1.0 (dystopian) to 1.0 (utopian).
    pub tone: f32,
    /// 1..=3
    pub complexity: u8,
    #[serde(default)]
    pub early_signals: Vec<String>,
    #[serde(default)]
    pub key_capabilities: Vec<String>,
}

impl Scenario {
    #[must_use]
    pub fn new(id: impl Into<ScenarioId>, quadrant: Quadrant, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quadrant,
            narrative: String::new(),
            time_horizon: DEFAULT_TIME_HORIZON,
            tone: 0.0,
            complexity: 2,
            early_signals: Vec::new(),
            key_capabilities: Vec::new(),
        }
    }

    /// Merge the populated fields of `patch`, clamping ranged values.
    pub fn apply(&mut self, patch: ScenarioPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(narrative) = patch.narrative {
            self.narrative = narrative;
        }
        if let Some(years) = patch.time_horizon {
            self.time_horizon = years;
        }
        if let Some(tone) = patch.tone {
            self.tone = if tone.is_finite() {
                tone.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }
        if let Some(complexity) = patch.complexity {
            self.complexity = complexity.clamp(1, 3);
        }
        if let Some(signals) = patch.early_signals {
            self.early_signals = signals;
        }
        if let Some(capabilities) = patch.key_capabilities {
            self.key_capabilities = capabilities;
        }
    }
}

/// Partial update for a scenario. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPatch {
    pub name: Option<String>,
    pub narrative: Option<String>,
    pub time_horizon: Option<u8>,
    pub tone: Option<f32>,
    pub complexity: Option<u8>,
    pub early_signals: Option<Vec<String>>,
    pub key_capabilities: Option<Vec<String>>,
}

/// Assessment dimension of [`ImpactScores`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImpactDimension {
    Probability,
    Repercussion,
    Urgency,
    StrategicDisruption,
}

impl ImpactDimension {
    pub const ALL: [Self; 4] = [
        Self::Probability,
        Self::Repercussion,
        Self::Urgency,
        Self::StrategicDisruption,
    ];
}

/// Per-scenario assessment, each dimension in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactScores {
    pub probability: u8,
    pub repercussion: u8,
    pub urgency: u8,
    pub strategic_disruption: u8,
}

impl Default for ImpactScores {
    fn default() -> Self {
        Self {
            probability: DEFAULT_SCORE,
            repercussion: DEFAULT_SCORE,
            urgency: DEFAULT_SCORE,
            strategic_disruption: DEFAULT_SCORE,
        }
    }
}

impl ImpactScores {
    #[must_use]
    pub fn new(probability: u8, repercussion: u8, urgency: u8, strategic_disruption: u8) -> Self {
        Self {
            probability: clamp_score(probability),
            repercussion: clamp_score(repercussion),
            urgency: clamp_score(urgency),
            strategic_disruption: clamp_score(strategic_disruption),
        }
    }

    #[must_use]
    pub const fn get(&self, dimension: ImpactDimension) -> u8 {
        match dimension {
            ImpactDimension::Probability => self.probability,
            ImpactDimension::Repercussion => self.repercussion,
            ImpactDimension::Urgency => self.urgency,
            ImpactDimension::StrategicDisruption => self.strategic_disruption,
        }
    }

    pub fn set(&mut self, dimension: ImpactDimension, value: u8) {
        let value = clamp_score(value);
        match dimension {
            ImpactDimension::Probability => self.probability = value,
            ImpactDimension::Repercussion => self.repercussion = value,
            ImpactDimension::Urgency => self.urgency = value,
            ImpactDimension::StrategicDisruption => self.strategic_disruption = value,
        }
    }

    #[must_use]
    pub fn total(&self) -> u16 {
        ImpactDimension::ALL
            .into_iter()
            .map(|dim| u16::from(self.get(dim)))
            .sum()
    }
}

/// Organization-wide appetite for and capacity to absorb risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub appetite: u8,
    pub capacity: u8,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            appetite: DEFAULT_SCORE,
            capacity: DEFAULT_SCORE,
        }
    }
}

impl RiskProfile {
    #[must_use]
    pub fn new(appetite: u8, capacity: u8) -> Self {
        Self {
            appetite: clamp_score(appetite),
            capacity: clamp_score(capacity),
        }
    }
}

/// Handling strategy bucket for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    PriorityAction,
    TimelyAction,
    Safeguard,
    Monitor,
    Ignore,
}

impl ResponseType {
    /// Ordered from most to least demanding.
    pub const ALL: [Self; 5] = [
        Self::PriorityAction,
        Self::TimelyAction,
        Self::Safeguard,
        Self::Monitor,
        Self::Ignore,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriorityAction => "priority-action",
            Self::TimelyAction => "timely-action",
            Self::Safeguard => "safeguard",
            Self::Monitor => "monitor",
            Self::Ignore => "ignore",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriorityAction => "Priority Action",
            Self::TimelyAction => "Timely Action",
            Self::Safeguard => "Safeguard",
            Self::Monitor => "Monitor",
            Self::Ignore => "Ignore",
        }
    }

    /// Lower ranks demand more attention.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::PriorityAction => 0,
            Self::TimelyAction => 1,
            Self::Safeguard => 2,
            Self::Monitor => 3,
            Self::Ignore => 4,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|response| response.as_str() == s)
            .ok_or_else(|| ModelParseError::UnknownResponse(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeline {
    #[default]
    Q1,
    Q2,
    Q3,
    Q4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRange {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Owner {
    CSuite,
    Director,
    #[default]
    Manager,
    External,
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        };
        f.write_str(label)
    }
}

impl fmt::Display for BudgetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CSuite => "c-suite",
            Self::Director => "director",
            Self::Manager => "manager",
            Self::External => "external",
        };
        f.write_str(label)
    }
}

/// An entry of the action plan, tied to one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: ActionItemId,
    pub scenario_id: ScenarioId,
    pub description: String,
    pub timeline: Timeline,
    pub budget_range: BudgetRange,
    pub owner: Owner,
    #[serde(default)]
    pub selected: bool,
}

/// Everything needed to create an [`ActionItem`] except its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDraft {
    pub scenario_id: ScenarioId,
    pub description: String,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub budget_range: BudgetRange,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub selected: bool,
}

/// Partial update for an action item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPatch {
    pub description: Option<String>,
    pub timeline: Option<Timeline>,
    pub budget_range: Option<BudgetRange>,
    pub owner: Option<Owner>,
    pub selected: Option<bool>,
}

impl ActionItem {
    pub fn apply(&mut self, patch: ActionPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(timeline) = patch.timeline {
            self.timeline = timeline;
        }
        if let Some(budget) = patch.budget_range {
            self.budget_range = budget;
        }
        if let Some(owner) = patch.owner {
            self.owner = owner;
        }
        if let Some(selected) = patch.selected {
            self.selected = selected;
        }
    }
}

/// Organization context collected on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningContext {
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub organization_type: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub strategic_question: String,
}

impl PlanningContext {
    /// Industry and strategic question are the minimum a request needs.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.industry.trim().is_empty() && !self.strategic_question.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_clamp_and_distinguish_unrated() {
        let mut force = Force::new("f1", "Carbon tax", PestelCategory::Political);
        assert!(!force.is_rated());
        force.set_rating(RatingField::Impact, 9);
        assert_eq!(force.impact, RATING_MAX);
        assert!(!force.is_rated());
        force.set_rating(RatingField::Uncertainty, 1);
        assert!(force.is_rated());
        assert_eq!(force.rating_sum(), 6);
    }

    #[test]
    fn pestel_codes_roundtrip_through_serde() {
        for category in PestelCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.code()));
            assert_eq!(category.code().parse::<PestelCategory>(), Ok(category));
        }
        assert_eq!(
            "X".parse::<PestelCategory>(),
            Err(ModelParseError::UnknownCategory(String::from("X")))
        );
    }

    #[test]
    fn quadrant_poles_form_a_bijection() {
        for quadrant in Quadrant::ALL {
            assert_eq!(
                Quadrant::from_poles(quadrant.x_pole(), quadrant.y_pole()),
                quadrant
            );
            assert_eq!(Quadrant::ALL[quadrant.index()], quadrant);
        }
        assert_eq!(Quadrant::TopLeft.x_pole(), AxisPole::Low);
        assert_eq!(Quadrant::TopLeft.y_pole(), AxisPole::High);
        assert_eq!(Quadrant::BottomRight.x_pole(), AxisPole::High);
        assert_eq!(Quadrant::BottomRight.y_pole(), AxisPole::Low);
    }

    #[test]
    fn axis_labels_require_visible_text() {
        assert!(!AxisLabels::default().is_complete());
        assert!(!AxisLabels::new("Low", "   ").is_complete());
        assert!(AxisLabels::new("Low", "High").is_complete());
    }

    #[test]
    fn scenario_patch_merges_and_clamps() {
        let mut scenario = Scenario::new("s1", Quadrant::TopRight, "Boom");
        scenario.apply(ScenarioPatch {
            narrative: Some(String::from("Growth everywhere")),
            tone: Some(4.0),
            complexity: Some(0),
            ..ScenarioPatch::default()
        });
        assert_eq!(scenario.name, "Boom");
        assert_eq!(scenario.narrative, "Growth everywhere");
        assert!((scenario.tone - 1.0).abs() < f32::EPSILON);
        assert_eq!(scenario.complexity, 1);
        assert_eq!(scenario.time_horizon, DEFAULT_TIME_HORIZON);
    }

    #[test]
    fn impact_scores_default_and_clamp() {
        let mut scores = ImpactScores::default();
        assert_eq!(scores.total(), 12);
        scores.set(ImpactDimension::Urgency, 0);
        assert_eq!(scores.urgency, 1);
        scores.set(ImpactDimension::Probability, 7);
        assert_eq!(scores.probability, 5);
    }

    #[test]
    fn response_and_owner_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResponseType::PriorityAction).unwrap(),
            "\"priority-action\""
        );
        assert_eq!(serde_json::to_string(&Owner::CSuite).unwrap(), "\"c-suite\"");
        assert_eq!(serde_json::to_string(&Timeline::Q3).unwrap(), "\"Q3\"");
        assert_eq!(
            "timely-action".parse::<ResponseType>(),
            Ok(ResponseType::TimelyAction)
        );
        let err = "panic".parse::<ResponseType>().unwrap_err();
        assert_eq!(err, ModelParseError::UnknownResponse(String::from("panic")));
        assert_eq!(err.to_string(), "unknown response type: panic");
    }
}
