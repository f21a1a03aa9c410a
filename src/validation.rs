//! # Input Validation
//!
//! The strict decode gate every task passes before user logic sees it, plus the
//! JSON-schema engine activities use to check the shape of their input.

use crate::error::{ActivityError, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Decode a raw task payload.
///
/// Empty, malformed or `null` payloads are rejected with `INPUT_INVALID`. There
/// is no best-effort mode.
pub fn validate_input(raw_input: &str) -> Result<Value> {
    if raw_input.trim().is_empty() {
        return Err(ActivityError::input_invalid("No input provided to activity"));
    }

    let value: Value = serde_json::from_str(raw_input)
        .map_err(|e| ActivityError::input_invalid(format!("JSON input is invalid: {e}")))?;

    if value.is_null() {
        return Err(ActivityError::input_invalid("JSON input decodes to null"));
    }

    Ok(value)
}

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON pointer of the offending property, empty for the document root
    pub path: String,
    pub message: String,
}

/// Failure to load or compile a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema '{schema_ref}' could not be read: {reason}")]
    NotFound { schema_ref: String, reason: String },

    #[error("Schema '{schema_ref}' is invalid: {reason}")]
    Invalid { schema_ref: String, reason: String },
}

/// Document + schema reference → list of violations; empty means valid
pub trait ValidationEngine: Send + Sync {
    fn check(
        &self,
        document: &Value,
        schema_ref: &str,
    ) -> std::result::Result<Vec<ValidationError>, SchemaError>;
}

/// [`ValidationEngine`] backed by `jsonschema`, loading schema documents from a
/// directory. Compiled schemas are cached by reference.
pub struct JsonSchemaValidator {
    schemas_dir: PathBuf,
    compiled: RwLock<HashMap<String, Arc<jsonschema::Validator>>>,
}

impl JsonSchemaValidator {
    pub fn new(schemas_dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas_dir: schemas_dir.into(),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Register an in-memory schema under the given reference
    pub fn register_schema(
        &self,
        schema_ref: &str,
        schema: &Value,
    ) -> std::result::Result<(), SchemaError> {
        let validator = Self::compile(schema_ref, schema)?;
        self.compiled
            .write()
            .insert(schema_ref.to_string(), Arc::new(validator));
        Ok(())
    }

    fn compile(
        schema_ref: &str,
        schema: &Value,
    ) -> std::result::Result<jsonschema::Validator, SchemaError> {
        jsonschema::validator_for(schema).map_err(|e| SchemaError::Invalid {
            schema_ref: schema_ref.to_string(),
            reason: e.to_string(),
        })
    }

    fn load(
        &self,
        schema_ref: &str,
    ) -> std::result::Result<Arc<jsonschema::Validator>, SchemaError> {
        if let Some(validator) = self.compiled.read().get(schema_ref) {
            return Ok(Arc::clone(validator));
        }

        let path = self.schemas_dir.join(schema_ref);
        debug!(schema = %path.display(), "Loading JSON schema");

        let contents = fs::read_to_string(&path).map_err(|e| SchemaError::NotFound {
            schema_ref: schema_ref.to_string(),
            reason: e.to_string(),
        })?;
        let schema: Value = serde_json::from_str(&contents).map_err(|e| SchemaError::Invalid {
            schema_ref: schema_ref.to_string(),
            reason: e.to_string(),
        })?;

        let validator = Arc::new(Self::compile(schema_ref, &schema)?);
        self.compiled
            .write()
            .insert(schema_ref.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}

impl ValidationEngine for JsonSchemaValidator {
    fn check(
        &self,
        document: &Value,
        schema_ref: &str,
    ) -> std::result::Result<Vec<ValidationError>, SchemaError> {
        let validator = self.load(schema_ref)?;

        Ok(validator
            .iter_errors(document)
            .map(|error| ValidationError {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect())
    }
}

/// Render violations as `[path] message` lines
pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}] {}\n", e.path, e.message))
        .collect()
}
