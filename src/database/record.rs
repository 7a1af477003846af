use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// A row of any entity with change tracking.
///
/// A record built from request input has no original snapshot and is treated
/// as a create; a record loaded from the store keeps the loaded values so
/// that later edits can be diffed against them.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// State as loaded from the store (None while creating)
    original: Option<Map<String, Value>>,
    /// Current field values
    fields: Map<String, Value>,
    /// Fields touched since load
    modified_fields: BTreeSet<String>,
}

impl Record {
    /// Record for a create, from a request body.
    pub fn from_input(json: Value) -> Result<Self, RecordError> {
        match json {
            Value::Object(fields) => Ok(Self {
                original: None,
                fields,
                modified_fields: BTreeSet::new(),
            }),
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Record for a row that already exists in the store.
    pub fn from_stored(fields: Map<String, Value>) -> Self {
        Self {
            original: Some(fields.clone()),
            fields,
            modified_fields: BTreeSet::new(),
        }
    }

    /// True while the record has never been persisted.
    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Present and not null.
    pub fn has(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(v) if !v.is_null())
    }

    /// Field as text, numbers rendered in decimal.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_to_id)
    }

    /// Value as it was when loaded.
    pub fn previous(&self, key: &str) -> Option<&Value> {
        self.original.as_ref()?.get(key).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }
        self.fields.insert(key, value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if self.original.is_some() {
            self.modified_fields.insert(key.to_string());
        }
        self.fields.remove(key)
    }

    /// Apply a partial update.
    pub fn patch(&mut self, changes: Map<String, Value>) -> &mut Self {
        for (key, value) in changes {
            self.set(key, value);
        }
        self
    }

    /// Check if a specific field has been changed
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true,
            (None, None) => false,
        }
    }

    /// Fields to write: everything for a create, the touched fields that
    /// actually differ for an update.
    pub fn changes(&self) -> Map<String, Value> {
        match &self.original {
            None => self.fields.clone(),
            Some(original) => self
                .modified_fields
                .iter()
                .filter_map(|field| {
                    let current = self.fields.get(field)?;
                    (original.get(field) != Some(current)).then(|| (field.clone(), current.clone()))
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Render an identifier value the way it appears in paths and join rows.
pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
