use crate::{
    core::extractor::ExtractionError,
    schemas::{
        validation::{check_itinerary_invariants, check_required_shape, validate_structured_payload},
        CompletionSchema,
    },
    types::{deserialize_structured_response, ItineraryResult},
};
use serde_json::Value;

/// Validation strategies for a parsed completion value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validator {
    /// Required fields only, then typed decoding
    #[default]
    Minimal,
    /// JSON Schema validation, typed decoding and per-field invariants
    Strict,
}

impl Validator {
    /// Validate a parsed value and decode it into an itinerary
    pub fn validate(&self, payload: &Value) -> Result<ItineraryResult, ExtractionError> {
        check_required_shape(payload)?;

        match self {
            Validator::Minimal => deserialize_structured_response(payload),
            Validator::Strict => {
                validate_structured_payload(ItineraryResult::schema(), payload)?;
                let itinerary = deserialize_structured_response(payload)?;
                check_itinerary_invariants(&itinerary)?;
                Ok(itinerary)
            }
        }
    }
}
