//! Foresight Planner Engine
//!
//! Platform-agnostic core of a guided scenario-planning workflow
//! (Discover, Design, Develop, Decide). This crate provides the step graph,
//! the planning state, scoring and persistence without UI or network
//! dependencies.

pub mod catalog;
pub mod generation;
pub mod model;
pub mod numbers;
pub mod persist;
pub mod report;
pub mod scoring;
pub mod session;
pub mod state;
pub mod steps;

// Re-export commonly used types
pub use catalog::{CatalogError, PhaseCatalog, PhaseInfo, StepInfo};
pub use generation::{
    GenerationError, GenerationOutcome, GenerationRequest, GenerationResponse, GenerationTicket,
};
pub use model::{
    ActionDraft, ActionItem, ActionItemId, ActionPatch, AiBaseline, Axis, AxisLabels, AxisPole,
    BudgetRange, CustomForceDraft, Force, ForceId, ImpactDimension, ImpactScores,
    ModelParseError, Owner, PestelCategory, PlanningContext, Quadrant, QuadrantNames,
    RatingField, ResponseType, RiskProfile, Scenario, ScenarioId, ScenarioPatch, Timeline,
};
pub use persist::{
    FileStorage, MemoryStorage, PersistError, PersistedSnapshot, SNAPSHOT_NAME, SNAPSHOT_VERSION,
};
pub use report::ForesightReport;
pub use scoring::{
    ImpactBand, OrthogonalityBand, RiskArchetype, classify_risk, composite_impact_score,
    critical_uncertainties, orthogonality_for, orthogonality_score, suggested_response,
    suggested_responses,
};
pub use session::PlannerSession;
pub use state::{MatrixError, ScenarioSetError, SimulationState};
pub use steps::{
    MainPhase, MatrixStage, PHASE_ORDER, Progress, ROUTE_ORDER, StepParseError, SubStep,
    can_navigate_to, is_first_step_of_phase, is_last_step_of_phase, next_step, next_step_id,
    prev_step, prev_step_id,
};

/// Trait for abstracting the force-generation service
/// Platform-specific implementations should provide this
pub trait ForceGenerator {
    /// Produce candidate forces for a planning context
    ///
    /// # Errors
    ///
    /// Returns the failure category (network, server, malformed or empty).
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError>;
}

impl<F> ForceGenerator for F
where
    F: Fn(&GenerationRequest) -> Result<GenerationResponse, GenerationError>,
{
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        self(request)
    }
}

/// Non-blocking variant of [`ForceGenerator`] for hosts with an async runtime
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncForceGenerator: Send + Sync {
    /// Produce candidate forces for a planning context
    ///
    /// # Errors
    ///
    /// Returns the failure category (network, server, malformed or empty).
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait SessionStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a planning state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    fn save_session(&self, slot: &str, state: &SimulationState) -> Result<(), Self::Error>;

    /// Load a planning state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    fn load_session(&self, slot: &str) -> Result<Option<SimulationState>, Self::Error>;

    /// Delete a saved planning state
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_session(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Main planner engine binding a generator and a storage backend
pub struct PlannerEngine<G, S>
where
    G: ForceGenerator,
    S: SessionStorage,
{
    generator: G,
    storage: S,
    catalog: PhaseCatalog,
}

impl<G, S> PlannerEngine<G, S>
where
    G: ForceGenerator,
    S: SessionStorage,
{
    /// Create a new engine with the provided generator and storage
    pub fn new(generator: G, storage: S) -> Self {
        Self {
            generator,
            storage,
            catalog: PhaseCatalog::load_from_static(),
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &PhaseCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Start a session, resuming the saved one in `slot` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing save cannot be read.
    pub fn create_session(&self, slot: &str) -> Result<PlannerSession, S::Error> {
        let session = PlannerSession::load(&self.storage, slot)?.unwrap_or_default();
        log::debug!(
            "session {slot} starts on {}",
            self.catalog.step_label(session.state().current_step())
        );
        Ok(session)
    }

    /// Generate forces for the session's current context.
    ///
    /// # Errors
    ///
    /// Returns the generation failure; the session keeps its forces.
    pub fn generate_forces(
        &self,
        session: &mut PlannerSession,
    ) -> Result<GenerationOutcome, GenerationError> {
        session.generate_forces(&self.generator)
    }

    /// Advance the session one step, saving at the transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn advance(
        &self,
        session: &mut PlannerSession,
        slot: &str,
    ) -> Result<Option<SubStep>, S::Error> {
        session.advance(&self.storage, slot)
    }

    /// Save a session
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn save_session(&self, slot: &str, session: &PlannerSession) -> Result<(), S::Error> {
        session.save(&self.storage, slot)
    }

    /// Load a session
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub fn load_session(&self, slot: &str) -> Result<Option<PlannerSession>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        PlannerSession::load(&self.storage, slot).map_err(Into::into)
    }

    /// Reset the session and drop its save.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn reset_session(&self, slot: &str, session: &mut PlannerSession) -> Result<(), S::Error> {
        session.reset();
        self.storage.delete_session(slot)
    }
}
