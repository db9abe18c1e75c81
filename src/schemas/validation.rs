use crate::{core::extractor::ExtractionError, schemas::SchemaHandle, types::ItineraryResult};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

const MAX_SCHEMA_ERRORS: usize = 3;

fn mismatch(detail: impl Into<String>) -> ExtractionError {
    ExtractionError::ShapeMismatch {
        detail: detail.into(),
    }
}

/// Check the fields every itinerary must carry before typed decoding is attempted:
/// `title`, `description` and a non-empty `dailyPlans` whose entries have `day` and `date`.
pub(crate) fn check_required_shape(payload: &Value) -> Result<(), ExtractionError> {
    let object = payload
        .as_object()
        .ok_or_else(|| mismatch(format!("expected a JSON object, found {}", kind(payload))))?;

    for field in ["title", "description"] {
        match object.get(field) {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(mismatch(format!(
                    "`{}` must be a string, found {}",
                    field,
                    kind(other)
                )))
            }
            None => return Err(mismatch(format!("missing required field `{}`", field))),
        }
    }

    let plans = match object.get("dailyPlans") {
        Some(Value::Array(plans)) if !plans.is_empty() => plans,
        Some(Value::Array(_)) => return Err(mismatch("`dailyPlans` must not be empty")),
        Some(other) => {
            return Err(mismatch(format!(
                "`dailyPlans` must be an array, found {}",
                kind(other)
            )))
        }
        None => return Err(mismatch("missing required field `dailyPlans`")),
    };

    for (idx, plan) in plans.iter().enumerate() {
        let Some(plan) = plan.as_object() else {
            return Err(mismatch(format!("dailyPlans[{}] must be an object", idx)));
        };
        if !plan.get("day").map(Value::is_number).unwrap_or(false) {
            return Err(mismatch(format!("dailyPlans[{}] is missing a numeric `day`", idx)));
        }
        if !plan.get("date").map(Value::is_string).unwrap_or(false) {
            return Err(mismatch(format!("dailyPlans[{}] is missing a `date` string", idx)));
        }
    }

    Ok(())
}

/// Validate a structured payload against a schema
pub(crate) fn validate_structured_payload(
    schema: &SchemaHandle,
    payload: &Value,
) -> Result<(), ExtractionError> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            mismatch(format!(
                "failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            ))
        })?;

    if let Err(errors) = validator.validate(payload) {
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx < MAX_SCHEMA_ERRORS {
                let mut path = error.instance_path.to_string();
                if path.is_empty() {
                    path = "<root>".to_string();
                }
                details.push(format!("{}: {}", path, error));
            } else {
                truncated = true;
                break;
            }
        }

        let mut detail_str = if details.is_empty() {
            "payload failed schema validation".to_string()
        } else {
            details.join("; ")
        };

        if truncated {
            detail_str.push_str("; additional errors truncated");
        }

        return Err(mismatch(format!(
            "payload does not match `{}` schema: {}",
            schema.schema_name(),
            detail_str
        )));
    }

    Ok(())
}

/// Per-field invariants the schema cannot express: days run 1..N in order and no cost is negative.
pub(crate) fn check_itinerary_invariants(itinerary: &ItineraryResult) -> Result<(), ExtractionError> {
    for (idx, plan) in itinerary.daily_plans.iter().enumerate() {
        let expected = idx as u32 + 1;
        if plan.day != expected {
            return Err(mismatch(format!(
                "dailyPlans[{}] has day {} where day {} was expected",
                idx, plan.day, expected
            )));
        }

        for (a_idx, activity) in plan.activities.iter().enumerate() {
            if let Some(cost) = activity.cost {
                ensure_non_negative(cost, || {
                    format!("dailyPlans[{}].activities[{}].cost", idx, a_idx)
                })?;
            }
        }

        for (m_idx, meal) in plan.meals.iter().enumerate() {
            if let Some(cost) = meal.cost {
                ensure_non_negative(cost, || format!("dailyPlans[{}].meals[{}].cost", idx, m_idx))?;
            }
        }
    }

    if let Some(total) = itinerary.total_cost_estimate {
        ensure_non_negative(total, || "totalCostEstimate".to_string())?;
    }

    Ok(())
}

fn ensure_non_negative(value: f64, path: impl FnOnce() -> String) -> Result<(), ExtractionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(mismatch(format!(
            "{} must be a non-negative amount, found {}",
            path(),
            value
        )))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
