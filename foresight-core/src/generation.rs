//! Contract with the external force-generation service.
//!
//! The service itself is out of scope; hosts plug it in through
//! [`crate::ForceGenerator`]. This module owns the wire shapes, response
//! validation, the user-facing error taxonomy and the in-flight guard.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{Force, PlanningContext};
use crate::steps::SubStep;

/// Body sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub industry: String,
    pub organization_type: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub strategic_question: String,
}

impl From<&PlanningContext> for GenerationRequest {
    fn from(context: &PlanningContext) -> Self {
        Self {
            industry: context.industry.trim().to_string(),
            organization_type: context.organization_type.trim().to_string(),
            modifiers: context
                .modifiers
                .iter()
                .map(|modifier| modifier.trim().to_string())
                .filter(|modifier| !modifier.is_empty())
                .collect(),
            strategic_question: context.strategic_question.trim().to_string(),
        }
    }
}

/// Body returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub forces: Vec<Force>,
}

impl GenerationResponse {
    /// Parse a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Malformed`] when the body is not a valid
    /// response document.
    pub fn from_json(body: &str) -> Result<Self, GenerationError> {
        serde_json::from_str(body).map_err(|err| GenerationError::Malformed(err.to_string()))
    }

    /// Normalize and validate the returned forces. Every force comes back
    /// unrated and not custom, whatever the service sent.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Empty`] for an empty list, [`GenerationError::Malformed`]
    /// for blank or duplicated ids and blank names.
    pub fn into_forces(self) -> Result<Vec<Force>, GenerationError> {
        if self.forces.is_empty() {
            return Err(GenerationError::Empty);
        }
        let mut seen = HashSet::new();
        let mut forces = Vec::with_capacity(self.forces.len());
        for mut force in self.forces {
            if force.id.as_str().trim().is_empty() {
                return Err(GenerationError::Malformed(String::from("force without id")));
            }
            if force.name.trim().is_empty() {
                return Err(GenerationError::Malformed(format!(
                    "force {} has no name",
                    force.id
                )));
            }
            if !seen.insert(force.id.clone()) {
                return Err(GenerationError::Malformed(format!(
                    "duplicate force id {}",
                    force.id
                )));
            }
            force.impact = 0;
            force.uncertainty = 0;
            force.is_custom = false;
            forces.push(force);
        }
        Ok(forces)
    }
}

/// Recoverable generation failures. `Display` is the message shown to users;
/// every variant can be retried with the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("No forces were generated for this context. Please try again.")]
    Empty,
    #[error("Could not reach the generation service. Please check your connection and try again.")]
    Network(String),
    #[error("The generation service returned an error (status {status}). Please try again.")]
    Server { status: u16 },
    #[error("The generation service returned an unreadable response. Please try again.")]
    Malformed(String),
    #[error("Forces are already being generated.")]
    InFlight,
}

impl GenerationError {
    /// Diagnostic detail not meant for end users.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Network(detail) | Self::Malformed(detail) => Some(detail),
            Self::Empty | Self::Server { .. } | Self::InFlight => None,
        }
    }
}

/// Identity of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    request_id: u64,
    step: SubStep,
}

impl GenerationTicket {
    #[must_use]
    pub const fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Step that was active when the request was issued.
    #[must_use]
    pub const fn step(&self) -> SubStep {
        self.step
    }
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The force list was replaced with `count` forces.
    Applied { count: usize },
    /// The result arrived for a request that is no longer current and was dropped.
    Stale,
}

/// Transient in-flight bookkeeping. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct GenerationGuard {
    issued: u64,
    in_flight: Option<GenerationTicket>,
    last_error: Option<GenerationError>,
}

impl GenerationGuard {
    #[must_use]
    pub const fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub const fn last_error(&self) -> Option<&GenerationError> {
        self.last_error.as_ref()
    }

    /// Issue a ticket, or `None` while another request is in flight.
    pub fn begin(&mut self, step: SubStep) -> Option<GenerationTicket> {
        if self.in_flight.is_some() {
            log::debug!("generation suppressed: request already in flight");
            return None;
        }
        self.issued += 1;
        let ticket = GenerationTicket {
            request_id: self.issued,
            step,
        };
        self.in_flight = Some(ticket);
        self.last_error = None;
        Some(ticket)
    }

    /// Release the in-flight slot. Returns false for a ticket that is not the
    /// current one.
    pub fn finish(&mut self, ticket: GenerationTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Drop the in-flight request; its result will be treated as stale.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    /// Forget the in-flight request and the last error. Request ids keep
    /// increasing so tickets issued before the reset never match again.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.last_error = None;
    }

    pub fn record_error(&mut self, error: GenerationError) {
        self.last_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}
