//! Orchestrator model registry.
//!
//! The registry is a YAML document owned by the orchestrator. This module
//! only touches the record list under `models` (configurable): every other
//! key, and every record field it does not know about, is written back
//! unchanged and in its original position.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{error, info, instrument};

use crate::config::RegistrySettings;
use crate::error::{SubmitError, SubmitResult};
use crate::types::{ModelId, SubmissionName};

/// Desired state written for every registered submission.
pub const DESIRED_RUNNING: &str = "RUNNING";

/// A model record as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Model identifier. Integers in the file are read as strings.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ModelId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Submission directory name.
    #[serde(default)]
    pub submission_id: String,
    /// Competition tag.
    #[serde(default)]
    pub crunch_id: String,
    /// State the orchestrator should reconcile towards.
    #[serde(default)]
    pub desired_state: String,
    /// Worker assignment tag.
    #[serde(default)]
    pub cruncher_id: String,
    /// Any other fields, kept in order.
    #[serde(flatten)]
    pub extra: Mapping,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<ModelId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_of(&value)
        .map(ModelId::from)
        .ok_or_else(|| serde::de::Error::custom("model id must be a string or number"))
}

fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What [`Registry::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// A new record was appended.
    Added,
    /// An existing record was pointed at the new submission.
    Updated,
}

/// An in-memory registry document bound to its file.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    document: Mapping,
    settings: RegistrySettings,
}

impl Registry {
    /// Load the registry from disk. An empty file is an empty document.
    pub fn load(path: &Path, settings: &RegistrySettings) -> SubmitResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| registry_error(path, e))?;

        let document = if content.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(&content).map_err(|e| registry_error(path, e))? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(registry_error(path, "top level must be a mapping")),
            }
        };

        Ok(Self {
            path: path.to_owned(),
            document,
            settings: settings.clone(),
        })
    }

    /// Parsed view of all records.
    pub fn records(&self) -> SubmitResult<Vec<ModelRecord>> {
        match self.document.get(self.settings.models_key.as_str()) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_yaml::from_value(value.clone()).map_err(|e| registry_error(&self.path, e))
            }
        }
    }

    /// Point `id` at `submission`, adding a record if none exists.
    ///
    /// An existing record keeps its position, name and extra fields; only
    /// `submission_id` and `desired_state` change.
    pub fn register(
        &mut self,
        submission: &SubmissionName,
        id: &ModelId,
    ) -> SubmitResult<RegistryChange> {
        let new_record = ModelRecord {
            id: id.clone(),
            name: submission.to_string(),
            submission_id: submission.to_string(),
            crunch_id: self.settings.crunch_id.clone(),
            desired_state: DESIRED_RUNNING.to_owned(),
            cruncher_id: self.settings.cruncher_id.clone(),
            extra: Mapping::new(),
        };
        let new_value = serde_yaml::to_value(&new_record).map_err(|e| registry_error(&self.path, e))?;

        let path = self.path.clone();
        let models = self.models_mut()?;

        let existing = models
            .iter_mut()
            .filter_map(Value::as_mapping_mut)
            .find(|record| record.get("id").and_then(id_of).as_deref() == Some(id.as_str()));

        match existing {
            Some(record) => {
                record.insert(
                    Value::from("submission_id"),
                    Value::from(submission.as_str()),
                );
                record.insert(Value::from("desired_state"), Value::from(DESIRED_RUNNING));
                info!(model_id = %id, path = %path.display(), "updated existing model");
                Ok(RegistryChange::Updated)
            }
            None => {
                models.push(new_value);
                info!(model_id = %id, path = %path.display(), "added new model");
                Ok(RegistryChange::Added)
            }
        }
    }

    /// Write the document back to the file it was loaded from.
    pub fn save(&self) -> SubmitResult<()> {
        let yaml = serde_yaml::to_string(&self.document).map_err(|e| registry_error(&self.path, e))?;
        std::fs::write(&self.path, yaml).map_err(|e| registry_error(&self.path, e))
    }

    fn models_mut(&mut self) -> SubmitResult<&mut Vec<Value>> {
        let key = Value::from(self.settings.models_key.as_str());
        if !self.document.contains_key(&key) {
            self.document.insert(key.clone(), Value::Sequence(Vec::new()));
        }
        let slot = self
            .document
            .get_mut(&key)
            .ok_or_else(|| registry_error(&self.path, "failed to create record list"))?;

        if slot.is_null() {
            *slot = Value::Sequence(Vec::new());
        }
        match slot {
            Value::Sequence(models) => Ok(models),
            _ => Err(registry_error(
                &self.path,
                format!("`{}` must be a list", self.settings.models_key),
            )),
        }
    }
}

/// Load, register and save in one step.
#[instrument(skip_all, fields(path = %path.display(), model_id = %id))]
pub fn update_registry(
    path: &Path,
    settings: &RegistrySettings,
    submission: &SubmissionName,
    id: &ModelId,
) -> SubmitResult<RegistryChange> {
    let result = Registry::load(path, settings).and_then(|mut registry| {
        let change = registry.register(submission, id)?;
        registry.save()?;
        Ok(change)
    });

    if let Err(e) = &result {
        error!(error = %e, "failed to update models registry");
    }
    result
}

fn registry_error(path: &Path, message: impl std::fmt::Display) -> SubmitError {
    SubmitError::Registry {
        path: path.to_owned(),
        message: message.to_string(),
    }
}
