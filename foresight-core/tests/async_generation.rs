#![cfg(feature = "async")]

use async_trait::async_trait;
use foresight_core::{
    AsyncForceGenerator, Force, GenerationError, GenerationOutcome, GenerationRequest,
    GenerationResponse, PestelCategory, PlannerSession, SubStep,
};
use std::sync::atomic::{AtomicUsize, Ordering};

struct ScriptedGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl AsyncForceGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            return Err(GenerationError::Server { status: 503 });
        }
        Ok(GenerationResponse {
            forces: vec![Force::new(
                format!("g{call}"),
                format!("Force for {}", request.industry),
                PestelCategory::Economic,
            )],
        })
    }
}

#[tokio::test]
async fn async_generation_retries_after_server_error() {
    let generator = ScriptedGenerator {
        calls: AtomicUsize::new(0),
    };
    let mut session = PlannerSession::new();
    session.state_mut().set_current_step(SubStep::Forces);

    let err = session
        .generate_forces_async(&generator)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Server { status: 503 });
    assert!(!session.is_generating());
    assert!(session.state().forces().is_empty());

    let outcome = session.generate_forces_async(&generator).await.unwrap();
    assert_eq!(outcome, GenerationOutcome::Applied { count: 1 });
    assert_eq!(session.state().forces()[0].id.as_str(), "g1");
    assert!(session.last_generation_error().is_none());
}
