//! Scoring and derivation functions. All pure.
//!
//! The orthogonality score and the suggested response are product heuristics,
//! not statistical measures. Their arithmetic is part of the contract and must
//! stay exactly as written.
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use crate::model::{Force, ImpactScores, ResponseType, RiskProfile, ScenarioId};
use crate::numbers::{mean_u8, percent_of};
use crate::state::SimulationState;

/// Minimum impact and uncertainty for a critical uncertainty.
pub const CRITICAL_THRESHOLD: u8 = 3;

const ORTHOGONALITY_BASE_DISTINCT: u8 = 60;
const ORTHOGONALITY_BASE_SAME: u8 = 30;
const ORTHOGONALITY_SPREAD_WEIGHT: u8 = 5;
const ORTHOGONALITY_MAX: u8 = 100;

const COMPOSITE_DENOMINATOR: u16 = 20;

/// Whether a force is rated and scores at least 3 on both scales.
#[must_use]
pub fn is_critical_uncertainty(force: &Force) -> bool {
    force.is_rated()
        && force.impact >= CRITICAL_THRESHOLD
        && force.uncertainty >= CRITICAL_THRESHOLD
}

/// Critical uncertainties sorted by `impact + uncertainty`, highest first.
/// Ties keep their original list order.
#[must_use]
pub fn critical_uncertainties<'a>(forces: impl IntoIterator<Item = &'a Force>) -> Vec<&'a Force> {
    let mut critical: Vec<&Force> = forces
        .into_iter()
        .filter(|force| is_critical_uncertainty(force))
        .collect();
    critical.sort_by_key(|force| Reverse(force.rating_sum()));
    critical
}

/// Heuristic independence score of two axes in `0..=100`.
///
/// Different PESTEL categories start from a higher base, and diverging
/// ratings add to it.
#[must_use]
pub fn orthogonality_score(x_axis: &Force, y_axis: &Force) -> u8 {
    let base = if x_axis.category == y_axis.category {
        ORTHOGONALITY_BASE_SAME
    } else {
        ORTHOGONALITY_BASE_DISTINCT
    };
    let spread = x_axis.impact.abs_diff(y_axis.impact)
        + x_axis.uncertainty.abs_diff(y_axis.uncertainty);
    let score = u16::from(base) + u16::from(ORTHOGONALITY_SPREAD_WEIGHT) * u16::from(spread);
    u8::try_from(score.min(u16::from(ORTHOGONALITY_MAX))).unwrap_or(ORTHOGONALITY_MAX)
}

/// Display band for an orthogonality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrthogonalityBand {
    /// 70 and above.
    Independent,
    /// 40 to 69.
    Moderate,
    /// Below 40; the axes should be reconsidered.
    Correlated,
}

impl OrthogonalityBand {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 70 {
            Self::Independent
        } else if score >= 40 {
            Self::Moderate
        } else {
            Self::Correlated
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Independent => "good/independent",
            Self::Moderate => "moderate",
            Self::Correlated => "correlated - reconsider",
        }
    }
}

impl fmt::Display for OrthogonalityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall severity of a scenario in `20..=100`.
#[must_use]
pub fn composite_impact_score(scores: &ImpactScores) -> u8 {
    percent_of(scores.total(), COMPOSITE_DENOMINATOR)
}

/// Display band for a composite impact score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactBand {
    High,
    Medium,
    Low,
}

impl ImpactBand {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 70 {
            Self::High
        } else if score >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Traffic-light colour used by hosts.
    #[must_use]
    pub const fn colour(self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "amber",
            Self::Low => "green",
        }
    }
}

/// Advisory response bucket. Never assigned automatically.
#[must_use]
pub fn suggested_response(scores: &ImpactScores, risk: &RiskProfile) -> ResponseType {
    let impact = mean_u8(scores.repercussion, scores.strategic_disruption);
    let probability = f64::from(scores.probability);
    let risk_tolerance = mean_u8(risk.appetite, risk.capacity);

    if probability >= 4.0 && impact >= 4.0 {
        ResponseType::PriorityAction
    } else if probability >= 3.0 && impact >= 4.0 {
        ResponseType::TimelyAction
    } else if impact >= 4.0 && probability < 3.0 {
        ResponseType::Safeguard
    } else if impact >= 3.0 || probability >= 3.0 {
        if risk_tolerance < 3.0 {
            ResponseType::Safeguard
        } else {
            ResponseType::Monitor
        }
    } else {
        ResponseType::Ignore
    }
}

/// Label for an appetite/capacity combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskArchetype {
    MarketMaker,
    Daredevil,
    SteadyExpander,
    CautiousSurvivor,
}

impl RiskArchetype {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MarketMaker => "Market Maker",
            Self::Daredevil => "Daredevil",
            Self::SteadyExpander => "Steady Expander",
            Self::CautiousSurvivor => "Cautious Survivor",
        }
    }
}

impl fmt::Display for RiskArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[must_use]
pub const fn classify_risk(profile: &RiskProfile) -> RiskArchetype {
    let high_appetite = profile.appetite >= 4;
    let high_capacity = profile.capacity >= 4;
    match (high_appetite, high_capacity) {
        (true, true) => RiskArchetype::MarketMaker,
        (true, false) => RiskArchetype::Daredevil,
        (false, true) => RiskArchetype::SteadyExpander,
        (false, false) => RiskArchetype::CautiousSurvivor,
    }
}

/// Orthogonality of the chosen axes, if both are set.
#[must_use]
pub fn orthogonality_for(state: &SimulationState) -> Option<u8> {
    state.orthogonality()
}

/// Suggested response for every scenario in quadrant order. Scenarios without
/// an assessment are scored with the default record.
#[must_use]
pub fn suggested_responses(state: &SimulationState) -> Vec<(ScenarioId, ResponseType)> {
    state
        .scenarios()
        .iter()
        .filter_map(|scenario| {
            state
                .suggested_response_for(&scenario.id)
                .map(|response| (scenario.id.clone(), response))
        })
        .collect()
}
