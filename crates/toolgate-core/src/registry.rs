// crates/toolgate-core/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Static tool catalogue with compiled argument validators.
// Purpose: Advertise tools and validate arguments before dispatch.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The registry is built once from a backend's descriptors and is immutable
//! afterwards. Construction fails fast when the descriptors and the typed tool
//! enum disagree, so a catalogue/dispatch mismatch is a startup error rather
//! than a runtime surprise.

use std::collections::BTreeMap;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::error::GatewayError;
use crate::tooling::GatewayTool;
use crate::tooling::ToolDescriptor;

/// Maximum number of validation messages joined into one error.
const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Catalogue construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two descriptors share a name.
    #[error("duplicate tool descriptor: {0}")]
    Duplicate(String),
    /// A descriptor names no typed tool.
    #[error("descriptor has no handler: {0}")]
    UnknownDescriptor(String),
    /// A typed tool has no descriptor.
    #[error("tool has no descriptor: {0}")]
    MissingDescriptor(String),
    /// A descriptor schema failed to compile.
    #[error("invalid input schema for {tool}: {message}")]
    InvalidSchema {
        /// Tool name.
        tool: String,
        /// Compiler message.
        message: String,
    },
}

/// Immutable tool catalogue.
///
/// # Invariants
/// - Every descriptor maps to exactly one typed tool and vice versa.
/// - Descriptor order is preserved for `list_tools`.
pub struct ToolRegistry {
    /// Advertised descriptors in catalogue order.
    descriptors: Vec<ToolDescriptor>,
    /// Compiled argument validators keyed by tool name.
    validators: BTreeMap<String, Validator>,
}

impl ToolRegistry {
    /// Builds a registry for the typed tool set `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when descriptors are duplicated, unmatched,
    /// missing, or carry a schema that does not compile.
    pub fn build<T: GatewayTool>(descriptors: Vec<ToolDescriptor>) -> Result<Self, RegistryError> {
        let mut validators = BTreeMap::new();
        for descriptor in &descriptors {
            let Some(tool) = T::parse(&descriptor.name) else {
                return Err(RegistryError::UnknownDescriptor(descriptor.name.clone()));
            };
            if tool.as_str() != descriptor.name {
                return Err(RegistryError::UnknownDescriptor(descriptor.name.clone()));
            }
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&descriptor.input_schema)
                .map_err(|err| RegistryError::InvalidSchema {
                    tool: descriptor.name.clone(),
                    message: err.to_string(),
                })?;
            if validators.insert(descriptor.name.clone(), validator).is_some() {
                return Err(RegistryError::Duplicate(descriptor.name.clone()));
            }
        }
        for tool in T::all() {
            if !validators.contains_key(tool.as_str()) {
                return Err(RegistryError::MissingDescriptor(tool.as_str().to_string()));
            }
        }
        Ok(Self {
            descriptors,
            validators,
        })
    }

    /// Returns the catalogue in advertised order.
    #[must_use]
    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Returns true when the canonical name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Validates arguments against the tool's input schema.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownTool`] for unregistered names and
    /// [`GatewayError::InvalidArguments`] when validation fails.
    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<(), GatewayError> {
        let validator =
            self.validators.get(name).ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        if validator.is_valid(arguments) {
            return Ok(());
        }
        let messages: Vec<String> = validator
            .iter_errors(arguments)
            .take(MAX_REPORTED_VIOLATIONS)
            .map(|err| err.to_string())
            .collect();
        Err(GatewayError::InvalidArguments(messages.join("; ")))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
