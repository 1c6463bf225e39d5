//! Load-time errors.
//!
//! Nothing in the tick path fails. Every reference and numeric precondition
//! is checked while classes and levels are being built.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown {kind} class `{name}`")]
    UnknownClass { kind: &'static str, name: String },

    #[error("duplicate {kind} class `{name}`")]
    DuplicateClass { kind: &'static str, name: String },

    #[error("invalid `{field}` in `{class}`: {reason}")]
    InvalidValue {
        class: String,
        field: &'static str,
        reason: &'static str,
    },

    #[error("loadout `{loadout}` of `{class}` equips slot {slot}, but the class only has {slots} weapon slots")]
    MissingSlot {
        class: String,
        loadout: String,
        slot: usize,
        slots: usize,
    },

    #[error("unknown loadout `{loadout}` for spacecraft class `{class}`")]
    UnknownLoadout { class: String, loadout: String },

    #[error("level references spacecraft #{index}, but only {count} are placed")]
    UnknownSpacecraft { index: usize, count: usize },
}

impl ConfigError {
    pub(crate) fn invalid(class: &str, field: &'static str, reason: &'static str) -> Self {
        ConfigError::InvalidValue {
            class: class.to_string(),
            field,
            reason,
        }
    }
}

/// Reject anything that is not a finite, strictly positive number.
pub(crate) fn require_positive(class: &str, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(class, field, "must be finite and greater than zero"))
    }
}

/// Reject anything that is not a finite, non-negative number.
pub(crate) fn require_non_negative(
    class: &str,
    field: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(class, field, "must be finite and not negative"))
    }
}
