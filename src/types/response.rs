use serde_json::Value;

use crate::{core::extractor::ExtractionError, schemas::CompletionSchema};

/// Decode a parsed completion value into its typed form, reporting the failing field path.
pub fn deserialize_structured_response<T>(payload: &Value) -> Result<T, ExtractionError>
where
    T: CompletionSchema,
{
    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        ExtractionError::ShapeMismatch {
            detail: format!(
                "failed to deserialize `{}` at {}: {}",
                T::schema().schema_name(),
                location,
                err.inner()
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItineraryResult;
    use serde_json::json;

    #[test]
    fn reports_nested_path() {
        let payload = json!({
            "title": "Trip",
            "description": "Short",
            "dailyPlans": [
                { "day": 1, "date": "2024-07-15", "activities": [ { "time": "09:00" } ] }
            ]
        });

        let err = deserialize_structured_response::<ItineraryResult>(&payload).unwrap_err();
        let ExtractionError::ShapeMismatch { detail } = err else {
            panic!("expected shape mismatch");
        };
        assert!(detail.contains("dailyPlans[0].activities[0]"), "{}", detail);
        assert!(detail.contains("ItineraryResult"), "{}", detail);
    }
}
