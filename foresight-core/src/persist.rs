//! Versioned session snapshots and the bundled storage backends.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::SessionStorage;
use crate::state::SimulationState;

/// Storage key every snapshot carries.
pub const SNAPSHOT_NAME: &str = "foresight.session";
/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot name {found:?} is not {SNAPSHOT_NAME:?}")]
    WrongName { found: String },
    #[error("unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("invalid save slot {0:?}")]
    InvalidSlot(String),
}

/// On-disk form of a [`SimulationState`]. Transient session flags are never
/// part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub name: String,
    pub version: u32,
    pub state: SimulationState,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    name: String,
    version: u32,
}

impl PersistedSnapshot {
    #[must_use]
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            name: SNAPSHOT_NAME.to_string(),
            version: SNAPSHOT_VERSION,
            state: state.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a snapshot, checking name and version before the state body.
    /// The decoded state is normalized so a hand-edited file cannot break
    /// the store's invariants.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, a foreign name or an unknown version.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let header: SnapshotHeader = serde_json::from_str(json)?;
        if header.name != SNAPSHOT_NAME {
            return Err(PersistError::WrongName { found: header.name });
        }
        if header.version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: header.version,
            });
        }
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.state.normalize();
        Ok(snapshot)
    }

    #[must_use]
    pub fn into_state(self) -> SimulationState {
        self.state
    }
}

/// Serialize a state straight to snapshot JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn save_to_json(state: &SimulationState) -> Result<String, PersistError> {
    PersistedSnapshot::capture(state).to_json()
}

/// Restore a state from snapshot JSON.
///
/// # Errors
///
/// See [`PersistedSnapshot::from_json`].
pub fn load_from_json(json: &str) -> Result<SimulationState, PersistError> {
    PersistedSnapshot::from_json(json).map(PersistedSnapshot::into_state)
}

/// In-process storage keeping encoded snapshots, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    saves: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.saves.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saves.borrow().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    type Error = PersistError;

    fn save_session(&self, slot: &str, state: &SimulationState) -> Result<(), Self::Error> {
        let json = save_to_json(state)?;
        self.saves.borrow_mut().insert(slot.to_string(), json);
        Ok(())
    }

    fn load_session(&self, slot: &str) -> Result<Option<SimulationState>, Self::Error> {
        self.saves
            .borrow()
            .get(slot)
            .map(|json| load_from_json(json))
            .transpose()
    }

    fn delete_session(&self, slot: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(slot);
        Ok(())
    }
}

/// One JSON file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a slot's file. Slots are limited to ASCII alphanumerics, `-`
    /// and `_` so they can never escape the directory.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidSlot`] for empty or unsafe names.
    pub fn slot_path(&self, slot: &str) -> Result<PathBuf, PersistError> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistError::InvalidSlot(slot.to_string()));
        }
        Ok(self.dir.join(format!("{slot}.json")))
    }
}

impl SessionStorage for FileStorage {
    type Error = PersistError;

    fn save_session(&self, slot: &str, state: &SimulationState) -> Result<(), Self::Error> {
        let path = self.slot_path(slot)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, save_to_json(state)?)?;
        log::debug!("saved session to {}", path.display());
        Ok(())
    }

    fn load_session(&self, slot: &str) -> Result<Option<SimulationState>, Self::Error> {
        let path = self.slot_path(slot)?;
        match fs::read_to_string(&path) {
            Ok(json) => load_from_json(&json).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_session(&self, slot: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(slot)?;
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForceId, PestelCategory, RatingField};
    use crate::model::{Force, PlanningContext};
    use crate::model::{Axis, RiskProfile};
    use crate::steps::{MainPhase, SubStep};

    fn sample_state() -> SimulationState {
        let mut state = SimulationState::new();
        state.set_context(PlanningContext {
            industry: String::from("Energy"),
            organization_type: String::from("Utility"),
            modifiers: vec![String::from("regulated")],
            strategic_question: String::from("How do we stay relevant?"),
        });
        state.set_forces(vec![
            Force::new("f1", "Carbon pricing", PestelCategory::Political),
            Force::new("f2", "Grid storage", PestelCategory::Technological),
        ]);
        state.update_force_rating(&ForceId::from("f1"), RatingField::Impact, 4);
        state.select_force(&ForceId::from("f2"));
        state.set_current_step(SubStep::Uncertainties);
        state
    }

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let state = sample_state();
        let json = save_to_json(&state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], SNAPSHOT_NAME);
        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert_eq!(load_from_json(&json).unwrap(), state);
    }

    #[test]
    fn rejects_foreign_or_future_snapshots() {
        let json = save_to_json(&sample_state()).unwrap();
        let renamed = json.replace(SNAPSHOT_NAME, "other.app");
        assert!(matches!(
            load_from_json(&renamed),
            Err(PersistError::WrongName { .. })
        ));
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["version"] = serde_json::json!(2);
        assert!(matches!(
            load_from_json(&value.to_string()),
            Err(PersistError::UnsupportedVersion { found: 2 })
        ));
        assert!(matches!(load_from_json("[]"), Err(PersistError::Json(_))));
    }

    #[test]
    fn missing_state_fields_fall_back_to_defaults() {
        let json = format!(r#"{{"name":"{SNAPSHOT_NAME}","version":1,"state":{{}}}}"#);
        assert_eq!(load_from_json(&json).unwrap(), SimulationState::default());
    }

    #[test]
    fn memory_storage_shares_saves_between_clones() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.save_session("slot", &sample_state()).unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.load_session("slot").unwrap(), Some(sample_state()));
        handle.delete_session("slot").unwrap();
        assert!(storage.is_empty());
        assert!(storage.load_session("slot").unwrap().is_none());
    }

    #[test]
    fn file_storage_round_trips_and_rejects_bad_slots() {
        let dir = std::env::temp_dir().join(format!(
            "foresight-persist-{}-{}",
            std::process::id(),
            line!()
        ));
        let storage = FileStorage::new(&dir);
        assert!(storage.load_session("absent").unwrap().is_none());
        storage.save_session("slot_1", &sample_state()).unwrap();
        assert!(dir.join("slot_1.json").exists());
        assert_eq!(
            storage.load_session("slot_1").unwrap(),
            Some(sample_state())
        );
        storage.delete_session("slot_1").unwrap();
        storage.delete_session("slot_1").unwrap();
        assert!(matches!(
            storage.save_session("../escape", &sample_state()),
            Err(PersistError::InvalidSlot(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn hand_edited_snapshots_are_normalized_on_load() {
        let json = save_to_json(&sample_state()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let state = &mut value["state"];
        let discover = serde_json::to_value(MainPhase::Discover).unwrap();
        state["progress"]["mainPhase"] = serde_json::to_value(MainPhase::Decide).unwrap();
        state["progress"]["subStep"] = serde_json::to_value(SubStep::Context).unwrap();
        state["progress"]["completedPhases"] = serde_json::json!([discover.clone(), discover]);
        state["forces"][0]["impact"] = serde_json::json!(9);
        state["selectedForceIds"] = serde_json::json!(["f1", "f2", "f2", "ghost"]);
        state["xAxis"] = serde_json::json!("f1");
        state["yAxis"] = serde_json::json!("f1");
        state["riskProfile"] = serde_json::json!({"appetite": 0, "capacity": 9});

        let loaded = load_from_json(&value.to_string()).unwrap();
        assert_eq!(loaded.current_step(), SubStep::Context);
        assert_eq!(loaded.current_phase(), MainPhase::Discover);
        assert_eq!(
            loaded.progress().completed_phases.as_slice(),
            &[MainPhase::Discover]
        );
        assert_eq!(loaded.force(&ForceId::from("f1")).map(|f| f.impact), Some(5));
        assert_eq!(
            loaded.selected_force_ids(),
            &[ForceId::from("f1"), ForceId::from("f2")]
        );
        assert_eq!(loaded.axis_id(Axis::X), Some(&ForceId::from("f1")));
        assert_eq!(loaded.axis_id(Axis::Y), None);
        assert_eq!(loaded.risk_profile(), &RiskProfile::new(0, 9));
    }

    #[test]
    fn axes_on_unselected_forces_are_dropped_on_load() {
        let json = save_to_json(&sample_state()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["state"]["xAxis"] = serde_json::json!("f1");
        value["state"]["yAxis"] = serde_json::json!("ghost");
        let loaded = load_from_json(&value.to_string()).unwrap();
        assert_eq!(loaded.axis_id(Axis::X), None);
        assert_eq!(loaded.axis_id(Axis::Y), None);
    }

    #[test]
    fn normalizing_a_consistent_state_changes_nothing() {
        let state = sample_state();
        let mut normalized = state.clone();
        normalized.normalize();
        assert_eq!(normalized, state);
    }
}
