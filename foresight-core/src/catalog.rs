//! Display catalog for phases and steps.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::steps::{MainPhase, PHASE_ORDER, SubStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub id: SubStep,
    pub label: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub id: MainPhase,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<StepInfo>,
}

/// Labels and descriptive copy for every phase, in workflow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCatalog {
    pub phases: Vec<PhaseInfo>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("phase {expected} missing or out of order")]
    PhaseOrder { expected: MainPhase },
    #[error("phase {phase} does not list its steps in route order")]
    StepOrder { phase: MainPhase },
}

impl PhaseCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or when phases/steps do not
    /// mirror the route order.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.phases.len() != PHASE_ORDER.len() {
            let expected = PHASE_ORDER
                .get(self.phases.len())
                .copied()
                .unwrap_or(MainPhase::Decide);
            return Err(CatalogError::PhaseOrder { expected });
        }
        for (info, expected) in self.phases.iter().zip(PHASE_ORDER) {
            if info.id != expected {
                return Err(CatalogError::PhaseOrder { expected });
            }
            let ids: Vec<SubStep> = info.steps.iter().map(|step| step.id).collect();
            if ids.as_slice() != expected.steps() {
                return Err(CatalogError::StepOrder { phase: expected });
            }
        }
        Ok(())
    }

    /// Embedded catalog, falling back to built-in labels if it fails to load.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(include_str!("../assets/phases.json")).unwrap_or_else(|err| {
            log::warn!("embedded phase catalog rejected: {err}");
            Self::fallback()
        })
    }

    /// Catalog built from the step labels compiled into [`SubStep`].
    #[must_use]
    pub fn fallback() -> Self {
        let phases = PHASE_ORDER
            .into_iter()
            .map(|phase| PhaseInfo {
                id: phase,
                label: phase.label().to_string(),
                description: String::new(),
                steps: phase
                    .steps()
                    .iter()
                    .map(|step| StepInfo {
                        id: *step,
                        label: step.label().to_string(),
                        summary: String::new(),
                    })
                    .collect(),
            })
            .collect();
        Self { phases }
    }

    #[must_use]
    pub fn phase(&self, phase: MainPhase) -> Option<&PhaseInfo> {
        self.phases.iter().find(|info| info.id == phase)
    }

    #[must_use]
    pub fn step(&self, step: SubStep) -> Option<&StepInfo> {
        self.phase(step.phase())
            .and_then(|info| info.steps.iter().find(|candidate| candidate.id == step))
    }

    /// Display label for a step, never empty.
    #[must_use]
    pub fn step_label(&self, step: SubStep) -> &str {
        self.step(step).map_or(step.label(), |info| info.label.as_str())
    }
}

impl Default for PhaseCatalog {
    fn default() -> Self {
        Self::load_from_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::ROUTE_ORDER;

    #[test]
    fn embedded_catalog_matches_route_order() {
        let catalog = PhaseCatalog::from_json(include_str!("../assets/phases.json"))
            .expect("embedded catalog valid");
        for step in ROUTE_ORDER {
            let info = catalog.step(step).expect("step listed");
            assert!(!info.label.is_empty());
            assert!(!info.summary.is_empty());
        }
        assert_eq!(catalog.step_label(SubStep::ActionPlan), "Action Plan");
    }

    #[test]
    fn fallback_is_valid() {
        let fallback = PhaseCatalog::fallback();
        assert!(fallback.validate().is_ok());
        assert_eq!(fallback.step_label(SubStep::Axes), SubStep::Axes.label());
    }

    #[test]
    fn rejects_out_of_order_steps() {
        let mut catalog = PhaseCatalog::fallback();
        catalog.phases[1].steps.swap(0, 2);
        let json = serde_json::to_string(&catalog).unwrap();
        let err = PhaseCatalog::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::StepOrder {
                phase: MainPhase::Design
            }
        ));
    }

    #[test]
    fn rejects_missing_phase() {
        let mut catalog = PhaseCatalog::fallback();
        catalog.phases.pop();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(matches!(
            PhaseCatalog::from_json(&json),
            Err(CatalogError::PhaseOrder {
                expected: MainPhase::Decide
            })
        ));
        assert!(matches!(
            PhaseCatalog::from_json("{"),
            Err(CatalogError::Json(_))
        ));
    }
}
