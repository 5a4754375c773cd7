//! Lookup misses, shared by the resolver and the lookup service.

use thiserror::Error;

/// A lookup that found nothing. Carries the key that was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("ZIP code not found: {zip}")]
    UnknownZip { zip: String },

    #[error("plan not found: {plan_id}")]
    UnknownPlan { plan_id: String },

    #[error("county not found: {county}")]
    UnknownCounty { county: String },

    #[error("state not found: {state}")]
    UnknownState { state: String },
}

impl LookupError {
    /// Stable snake_case tag for the kind of miss.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownZip { .. } => "unknown_zip",
            Self::UnknownPlan { .. } => "unknown_plan",
            Self::UnknownCounty { .. } => "unknown_county",
            Self::UnknownState { .. } => "unknown_state",
        }
    }

    /// The key the caller asked for, verbatim.
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownZip { zip } => zip,
            Self::UnknownPlan { plan_id } => plan_id,
            Self::UnknownCounty { county } => county,
            Self::UnknownState { state } => state,
        }
    }
}
