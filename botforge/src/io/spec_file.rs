//! Spec intake for the front ends: schema check, then conversion to [`BotSpec`].

use std::fs;
use std::path::Path;

use jsonschema::Draft;
use serde_json::Value;
use thiserror::Error;

use crate::core::spec::{BotSpec, BotSpecInput, SpecError};

pub const BOT_SPEC_SCHEMA: &str = include_str!("../../schemas/bot_spec.schema.json");

/// Why a submitted spec was not accepted.
#[derive(Debug, Error)]
pub enum SpecInputError {
    #[error("read spec {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("spec is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spec schema validation failed:\n- {}", .0.join("\n- "))]
    Schema(Vec<String>),
    #[error(transparent)]
    Rules(#[from] SpecError),
    #[error("bundled spec schema is invalid: {0}")]
    BadSchema(String),
}

/// Schema violations of `instance`, empty when it conforms.
pub fn schema_errors(instance: &Value) -> Result<Vec<String>, SpecInputError> {
    let schema: Value = serde_json::from_str(BOT_SPEC_SCHEMA)
        .map_err(|e| SpecInputError::BadSchema(e.to_string()))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|e| SpecInputError::BadSchema(e.to_string()))?;
    Ok(compiled
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect())
}

/// Validate and convert an already-parsed JSON value.
pub fn parse_spec_value(value: Value) -> Result<BotSpec, SpecInputError> {
    let errors = schema_errors(&value)?;
    if !errors.is_empty() {
        return Err(SpecInputError::Schema(errors));
    }
    let input: BotSpecInput = serde_json::from_value(value)?;
    Ok(BotSpec::try_from(input)?)
}

pub fn parse_spec_str(raw: &str) -> Result<BotSpec, SpecInputError> {
    parse_spec_value(serde_json::from_str(raw)?)
}

pub fn load_spec_file(path: &Path) -> Result<BotSpec, SpecInputError> {
    let raw = fs::read_to_string(path).map_err(|source| SpecInputError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_spec_str(&raw)
}
