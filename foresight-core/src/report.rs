//! Final strategic-foresight report.
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::model::{ActionItem, Axis, AxisLabels, Quadrant, ResponseType, RiskProfile, ScenarioId};
use crate::scoring::{
    ImpactBand, OrthogonalityBand, RiskArchetype, classify_risk, composite_impact_score,
};
use crate::state::SimulationState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertaintySummary {
    pub name: String,
    pub category: String,
    pub impact: u8,
    pub uncertainty: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSummary {
    pub force: String,
    pub labels: AxisLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub quadrant: Quadrant,
    pub name: String,
    pub narrative: String,
    pub composite_score: u8,
    pub impact_band: ImpactBand,
    pub suggested_response: ResponseType,
    pub assigned_response: Option<ResponseType>,
    pub actions: Vec<ActionItem>,
}

/// Everything a host needs to render the closing report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForesightReport {
    pub strategic_question: String,
    pub critical_uncertainties: Vec<UncertaintySummary>,
    pub x_axis: Option<AxisSummary>,
    pub y_axis: Option<AxisSummary>,
    pub orthogonality: Option<u8>,
    pub orthogonality_band: Option<OrthogonalityBand>,
    pub scenarios: Vec<ScenarioSummary>,
    pub risk_profile: RiskProfile,
    pub risk_archetype: RiskArchetype,
}

impl ForesightReport {
    /// Derive the report from the current state. Only selected action items
    /// are included.
    #[must_use]
    pub fn from_state(state: &SimulationState) -> Self {
        let critical_uncertainties = state
            .critical_uncertainties()
            .into_iter()
            .map(|force| UncertaintySummary {
                name: force.name.clone(),
                category: force.category.label().to_string(),
                impact: force.impact,
                uncertainty: force.uncertainty,
            })
            .collect();

        let axis_summary = |axis: Axis| {
            let force = match axis {
                Axis::X => state.x_axis(),
                Axis::Y => state.y_axis(),
            }?;
            Some(AxisSummary {
                force: force.name.clone(),
                labels: state.axis_labels(axis).clone(),
            })
        };

        let scenarios = state
            .scenarios()
            .iter()
            .map(|scenario| {
                let scores = state
                    .impact_scores(&scenario.id)
                    .copied()
                    .unwrap_or_default();
                let composite_score = composite_impact_score(&scores);
                ScenarioSummary {
                    id: scenario.id.clone(),
                    quadrant: scenario.quadrant,
                    name: scenario.name.clone(),
                    narrative: scenario.narrative.clone(),
                    composite_score,
                    impact_band: ImpactBand::from_score(composite_score),
                    suggested_response: state
                        .suggested_response_for(&scenario.id)
                        .unwrap_or(ResponseType::Monitor),
                    assigned_response: state.response_for(&scenario.id),
                    actions: state
                        .action_items_for(&scenario.id)
                        .filter(|item| item.selected)
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let orthogonality = state.orthogonality();
        let risk_profile = *state.risk_profile();
        Self {
            strategic_question: state.context().strategic_question.clone(),
            critical_uncertainties,
            x_axis: axis_summary(Axis::X),
            y_axis: axis_summary(Axis::Y),
            orthogonality,
            orthogonality_band: orthogonality.map(OrthogonalityBand::from_score),
            scenarios,
            risk_profile,
            risk_archetype: classify_risk(&risk_profile),
        }
    }

    /// Scenarios ordered by the urgency of their assigned (or suggested)
    /// response, most urgent first.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&ScenarioSummary> {
        let mut ordered: Vec<&ScenarioSummary> = self.scenarios.iter().collect();
        ordered.sort_by_key(|summary| {
            summary
                .assigned_response
                .unwrap_or(summary.suggested_response)
                .rank()
        });
        ordered
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Strategic Foresight Report\n");
        if !self.strategic_question.trim().is_empty() {
            let _ = writeln!(out, "**Strategic question:** {}\n", self.strategic_question);
        }

        let _ = writeln!(out, "## Critical Uncertainties\n");
        if self.critical_uncertainties.is_empty() {
            let _ = writeln!(out, "_None identified._");
        }
        for force in &self.critical_uncertainties {
            let _ = writeln!(
                out,
                "- {} ({}) - impact {}, uncertainty {}",
                force.name, force.category, force.impact, force.uncertainty
            );
        }

        let _ = writeln!(out, "\n## Scenario Matrix\n");
        for (name, axis) in [("X", &self.x_axis), ("Y", &self.y_axis)] {
            match axis {
                Some(axis) => {
                    let _ = writeln!(
                        out,
                        "- {name} axis: {} ({} -> {})",
                        axis.force, axis.labels.low, axis.labels.high
                    );
                }
                None => {
                    let _ = writeln!(out, "- {name} axis: not chosen");
                }
            }
        }
        if let (Some(score), Some(band)) = (self.orthogonality, self.orthogonality_band) {
            let _ = writeln!(out, "- Orthogonality: {score} ({band})");
        }

        let _ = writeln!(out, "\n## Scenarios\n");
        for scenario in &self.scenarios {
            let _ = writeln!(out, "### {} [{}]\n", scenario.name, scenario.quadrant);
            if !scenario.narrative.trim().is_empty() {
                let _ = writeln!(out, "{}\n", scenario.narrative);
            }
            let _ = writeln!(
                out,
                "- Composite impact: {} ({})",
                scenario.composite_score,
                scenario.impact_band.colour()
            );
            let _ = writeln!(out, "- Suggested response: {}", scenario.suggested_response);
            match scenario.assigned_response {
                Some(response) => {
                    let _ = writeln!(out, "- Assigned response: {response}");
                }
                None => {
                    let _ = writeln!(out, "- Assigned response: unassigned");
                }
            }
            for action in &scenario.actions {
                let _ = writeln!(
                    out,
                    "  - [{}] {} (budget {}, owner {})",
                    action.timeline, action.description, action.budget_range, action.owner
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "## Risk Profile\n");
        let _ = writeln!(
            out,
            "Appetite {}, capacity {}: {}",
            self.risk_profile.appetite, self.risk_profile.capacity, self.risk_archetype
        );
        out
    }
}
