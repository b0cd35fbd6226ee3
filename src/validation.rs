//! Validation System - Required Contract Fields
//!
//! Rules produce structured violations. The validator runs them in a fixed
//! order and stops at the first one.

use serde::{Deserialize, Serialize};

use crate::context::ContractRequest;

/// Required fields, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "cliente_nome_completo",
    "cliente_cpf",
    "data_inicio",
    "valor_total",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: String,
    pub message: String,
}

/// Validation rule trait - produces at most one violation
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, request: &ContractRequest) -> Option<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct RequiredFieldRule {
    field: &'static str,
}

impl RequiredFieldRule {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl ValidationRule for RequiredFieldRule {
    fn name(&self) -> &'static str { "required_field" }

    fn validate(&self, request: &ContractRequest) -> Option<ValidationViolation> {
        if request.has_value(self.field) {
            return None;
        }
        Some(ValidationViolation {
            rule: self.name().to_string(),
            field: self.field.to_string(),
            message: format!("Campo obrigatório: {}", self.field),
        })
    }
}

/// Validator runs the rules in order, failing fast
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: REQUIRED_FIELDS
                .into_iter()
                .map(|field| Box::new(RequiredFieldRule::new(field)) as Box<dyn ValidationRule>)
                .collect(),
        }
    }

    pub fn validate(&self, request: &ContractRequest) -> Result<(), ValidationViolation> {
        match self.rules.iter().find_map(|rule| rule.validate(request)) {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
