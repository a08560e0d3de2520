use crate::generation::{
    GenerationError, GenerationGuard, GenerationOutcome, GenerationRequest, GenerationResponse,
    GenerationTicket,
};
use crate::state::SimulationState;
use crate::steps::SubStep;
use crate::{ForceGenerator, SessionStorage};

#[cfg(feature = "async")]
use crate::AsyncForceGenerator;

/// High-level session wrapper binding a planning state to its transient
/// generation bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct PlannerSession {
    state: SimulationState,
    generation: GenerationGuard,
}

impl PlannerSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously saved state. Generation flags start cleared.
    #[must_use]
    pub fn from_state(state: SimulationState) -> Self {
        Self {
            state,
            generation: GenerationGuard::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Apply a closure to the mutable planning state.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut SimulationState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub fn into_state(self) -> SimulationState {
        self.state
    }

    #[must_use]
    pub const fn is_generating(&self) -> bool {
        self.generation.is_generating()
    }

    #[must_use]
    pub const fn last_generation_error(&self) -> Option<&GenerationError> {
        self.generation.last_error()
    }

    /// Request body for the current planning context.
    #[must_use]
    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest::from(self.state.context())
    }

    /// Mark a generation request as in flight. Returns `None` when one is
    /// already running; the caller must not issue a second request.
    pub fn begin_generation(&mut self) -> Option<GenerationTicket> {
        let step = self.state.current_step();
        self.generation.begin(step)
    }

    /// Deliver the result of an issued request.
    ///
    /// Results for superseded tickets, or that arrive after the user left the
    /// step the request was issued from, are dropped without touching state.
    ///
    /// # Errors
    ///
    /// Returns the generation failure, which is also kept as
    /// [`Self::last_generation_error`]. The force list is left unchanged.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GenerationResponse, GenerationError>,
    ) -> Result<GenerationOutcome, GenerationError> {
        if !self.generation.finish(ticket) {
            log::debug!("dropping result of superseded request {}", ticket.request_id());
            return Ok(GenerationOutcome::Stale);
        }
        if ticket.step() != self.state.current_step() {
            log::debug!(
                "dropping result of request {} issued on {}",
                ticket.request_id(),
                ticket.step()
            );
            return Ok(GenerationOutcome::Stale);
        }
        match result.and_then(GenerationResponse::into_forces) {
            Ok(forces) => {
                let count = forces.len();
                self.state.set_forces(forces);
                self.generation.clear_error();
                Ok(GenerationOutcome::Applied { count })
            }
            Err(err) => {
                log::warn!("force generation failed: {err}");
                self.generation.record_error(err.clone());
                Err(err)
            }
        }
    }

    /// Drop the in-flight request, e.g. when the host cancels it.
    pub fn cancel_generation(&mut self) {
        self.generation.abandon();
    }

    /// Run a full request/response cycle against a blocking generator.
    ///
    /// # Errors
    ///
    /// [`GenerationError::InFlight`] when a request is already running, or the
    /// generation failure itself.
    pub fn generate_forces<G>(&mut self, generator: &G) -> Result<GenerationOutcome, GenerationError>
    where
        G: ForceGenerator + ?Sized,
    {
        let ticket = self.begin_generation().ok_or(GenerationError::InFlight)?;
        let result = generator.generate(&self.generation_request());
        self.complete_generation(ticket, result)
    }

    /// Async counterpart of [`Self::generate_forces`].
    ///
    /// # Errors
    ///
    /// See [`Self::generate_forces`].
    #[cfg(feature = "async")]
    pub async fn generate_forces_async<G>(
        &mut self,
        generator: &G,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        G: AsyncForceGenerator + ?Sized,
    {
        let ticket = self.begin_generation().ok_or(GenerationError::InFlight)?;
        let request = self.generation_request();
        let result = generator.generate(&request).await;
        self.complete_generation(ticket, result)
    }

    /// Move to the next step and persist. Returns the new step, or `None` at
    /// the end of the route (nothing is saved then).
    ///
    /// # Errors
    ///
    /// Returns the storage error; the step change is kept.
    pub fn advance<S: SessionStorage>(
        &mut self,
        storage: &S,
        slot: &str,
    ) -> Result<Option<SubStep>, S::Error> {
        let next = self.state.go_to_next_step();
        if next.is_some() {
            self.save(storage, slot)?;
        }
        Ok(next)
    }

    /// Move to the previous step and persist.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the step change is kept.
    pub fn retreat<S: SessionStorage>(
        &mut self,
        storage: &S,
        slot: &str,
    ) -> Result<Option<SubStep>, S::Error> {
        let prev = self.state.go_to_prev_step();
        if prev.is_some() {
            self.save(storage, slot)?;
        }
        Ok(prev)
    }

    /// # Errors
    ///
    /// Returns the storage error.
    pub fn save<S: SessionStorage>(&self, storage: &S, slot: &str) -> Result<(), S::Error> {
        storage.save_session(slot, &self.state)
    }

    /// Restore a saved session, or `None` when the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub fn load<S: SessionStorage>(storage: &S, slot: &str) -> Result<Option<Self>, S::Error> {
        Ok(storage.load_session(slot)?.map(Self::from_state))
    }

    /// Clear all planning data. Any in-flight result will be dropped as stale.
    pub fn reset(&mut self) {
        self.state.reset_simulation();
        self.generation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Force, ForceId, PestelCategory, PlanningContext};
    use crate::persist::MemoryStorage;
    use std::cell::Cell;

    fn response(ids: &[&str]) -> GenerationResponse {
        GenerationResponse {
            forces: ids
                .iter()
                .map(|id| Force::new(*id, format!("Force {id}"), PestelCategory::Economic))
                .collect(),
        }
    }

    fn session_on_forces() -> PlannerSession {
        let mut session = PlannerSession::new();
        session.with_state_mut(|state| {
            state.set_context(PlanningContext {
                industry: String::from("Logistics"),
                organization_type: String::from("Enterprise"),
                modifiers: Vec::new(),
                strategic_question: String::from("How will freight move in 2040?"),
            });
            state.set_current_step(SubStep::Forces);
        });
        session
    }

    #[test]
    fn duplicate_requests_are_suppressed() {
        let mut session = session_on_forces();
        let ticket = session.begin_generation().expect("ticket");
        assert!(session.is_generating());
        assert!(session.begin_generation().is_none());
        let outcome = session
            .complete_generation(ticket, Ok(response(&["a", "b"])))
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Applied { count: 2 });
        assert!(!session.is_generating());
        assert_eq!(session.state().forces().len(), 2);
    }

    #[test]
    fn results_after_navigation_are_stale() {
        let mut session = session_on_forces();
        let ticket = session.begin_generation().expect("ticket");
        session.state_mut().set_current_step(SubStep::Rating);
        let outcome = session
            .complete_generation(ticket, Ok(response(&["late"])))
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Stale);
        assert!(session.state().forces().is_empty());
        assert!(!session.is_generating());
    }

    #[test]
    fn failures_keep_existing_forces_and_allow_retry() {
        let mut session = session_on_forces();
        session
            .generate_forces(&|_: &GenerationRequest| Ok(response(&["keep"])))
            .unwrap();

        let err = session
            .generate_forces(&|_: &GenerationRequest| {
                Err(GenerationError::Network(String::from("offline")))
            })
            .unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
        assert_eq!(session.last_generation_error(), Some(&err));
        assert_eq!(session.state().forces()[0].id, ForceId::from("keep"));
        assert!(!session.is_generating());

        let err = session
            .generate_forces(&|_: &GenerationRequest| Ok(response(&[])))
            .unwrap_err();
        assert_eq!(err, GenerationError::Empty);
        assert_eq!(session.state().forces().len(), 1);

        session
            .generate_forces(&|_: &GenerationRequest| Ok(response(&["x", "y", "z"])))
            .unwrap();
        assert!(session.last_generation_error().is_none());
        assert_eq!(session.state().forces().len(), 3);
    }

    #[test]
    fn generator_receives_context() {
        let mut session = session_on_forces();
        let calls = Cell::new(0);
        let generator = |request: &GenerationRequest| {
            calls.set(calls.get() + 1);
            assert_eq!(request.industry, "Logistics");
            assert_eq!(request.organization_type, "Enterprise");
            Ok(response(&["one"]))
        };
        session.generate_forces(&generator).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reset_and_cancel_make_tickets_stale() {
        let mut session = session_on_forces();
        let ticket = session.begin_generation().expect("ticket");
        session.cancel_generation();
        assert_eq!(
            session.complete_generation(ticket, Ok(response(&["a"]))),
            Ok(GenerationOutcome::Stale)
        );

        let ticket = session.begin_generation().expect("ticket");
        session.reset();
        assert_eq!(session.state(), &SimulationState::default());
        assert_eq!(
            session.complete_generation(ticket, Ok(response(&["a"]))),
            Ok(GenerationOutcome::Stale)
        );
    }

    #[test]
    fn pre_reset_result_never_lands_in_the_new_session() {
        let mut session = session_on_forces();
        let old = session.begin_generation().expect("ticket");
        session.reset();
        session.state_mut().set_current_step(SubStep::Forces);
        let fresh = session.begin_generation().expect("ticket after reset");
        assert_ne!(old, fresh);

        assert_eq!(
            session.complete_generation(old, Ok(response(&["pre-reset"]))),
            Ok(GenerationOutcome::Stale)
        );
        assert!(session.state().forces().is_empty());
        assert!(session.is_generating());

        assert_eq!(
            session.complete_generation(fresh, Ok(response(&["post-reset"]))),
            Ok(GenerationOutcome::Applied { count: 1 })
        );
        assert_eq!(session.state().forces()[0].id, ForceId::from("post-reset"));
    }

    #[test]
    fn step_transitions_persist_the_state() {
        let storage = MemoryStorage::new();
        let mut session = PlannerSession::new();
        assert_eq!(
            session.advance(&storage, "main").unwrap(),
            Some(SubStep::Forces)
        );
        let restored = PlannerSession::load(&storage, "main")
            .unwrap()
            .expect("saved on transition");
        assert_eq!(restored.state().current_step(), SubStep::Forces);
        assert!(!restored.is_generating());

        assert_eq!(
            session.retreat(&storage, "main").unwrap(),
            Some(SubStep::Context)
        );
        assert_eq!(session.retreat(&storage, "main").unwrap(), None);
        assert!(PlannerSession::load(&storage, "other").unwrap().is_none());
    }
}
