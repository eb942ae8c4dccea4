//! Newline-delimited JSON watch records.

use serde::Deserialize;
use serde_json::Value;

use kubewatch_notify::{Action, Event, ResourceChange, ResourceObject};

use crate::error::{CliError, Result};

/// One line of input, as produced by `kubectl get -w -o json` style watchers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRecord {
    /// What happened to the object.
    pub action: Action,
    /// The object after the change (before it, for deletions).
    pub object: Value,
    /// The object before an update.
    #[serde(default)]
    pub old_object: Option<Value>,
}

impl WatchRecord {
    /// Normalizes the record into a resource change.
    ///
    /// An update without `oldObject` uses the new object for both sides.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Notify` if an object is of an unsupported kind or
    /// lacks a namespace or name.
    pub fn into_change(self) -> Result<ResourceChange> {
        let object = ResourceObject::from_json(self.object)?;
        let event = Event::from_object(&object, self.action)?;

        let change = match self.action {
            Action::Created => ResourceChange::Created(event),
            Action::Deleted => ResourceChange::Deleted(event),
            Action::Updated => {
                let old = match self.old_object {
                    Some(old) => Event::from_object(&ResourceObject::from_json(old)?, Action::Updated)?,
                    None => event.clone(),
                };
                ResourceChange::Updated { old, new: event }
            }
        };
        Ok(change)
    }
}

/// Parses one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns `CliError::Input` for lines that are not a watch record, or the
/// normalization error for records that are.
pub fn parse_line(line: &str) -> Result<Option<ResourceChange>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let record: WatchRecord =
        serde_json::from_str(line).map_err(|e| CliError::Input(e.to_string()))?;
    record.into_change().map(Some)
}
